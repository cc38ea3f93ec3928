use crate::error::Error;
use pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::ring::{default_provider, DEFAULT_CIPHER_SUITES};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore};
use std::path::Path;
use std::sync::Arc;

/// Accepts any server certificate while still checking handshake signatures.
#[derive(Debug)]
pub struct NoCertificateVerification(Arc<CryptoProvider>);

impl NoCertificateVerification {
    pub fn new(provider: Arc<CryptoProvider>) -> Self {
        Self(provider)
    }
}

impl ServerCertVerifier for NoCertificateVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

fn root_store(ca_file: Option<&Path>) -> Result<RootCertStore, Error> {
    let mut root_store = RootCertStore::empty();
    let Some(file_path) = ca_file else {
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        return Ok(root_store);
    };

    let f = std::fs::File::open(file_path)
        .map_err(|e| Error::TlsConfig(format!("{}: {}", file_path.display(), e)))?;
    let mut rd = std::io::BufReader::new(f);
    for cert in rustls_pemfile::certs(&mut rd) {
        let cert = cert.map_err(|e| Error::TlsConfig(format!("{}: {}", file_path.display(), e)))?;
        root_store.add(cert)?;
    }
    if root_store.is_empty() {
        return Err(Error::TlsConfig(format!(
            "no certificates found in {}",
            file_path.display()
        )));
    }
    Ok(root_store)
}

/// Builds the rustls client config for one request. Only http/1.1 is
/// offered over ALPN since the exchange runs on a hyper http1 connection.
pub fn client_config(insecure: bool, ca_file: Option<&Path>) -> Result<ClientConfig, Error> {
    let provider = Arc::new(CryptoProvider {
        cipher_suites: DEFAULT_CIPHER_SUITES.to_vec(),
        ..default_provider()
    });

    let mut config = ClientConfig::builder_with_provider(provider.clone())
        .with_protocol_versions(rustls::DEFAULT_VERSIONS)?
        .with_root_certificates(root_store(ca_file)?)
        .with_no_client_auth();
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    if insecure {
        debug!("certificate verification disabled");
        config
            .dangerous()
            .set_certificate_verifier(Arc::new(NoCertificateVerification::new(provider)));
    }
    Ok(config)
}
