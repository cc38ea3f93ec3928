#![allow(dead_code)]

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use https_timer::{Callback, Error, TimedResponse};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use rustls::pki_types::{CertificateDer, PrivatePkcs8KeyDer};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_rustls::TlsAcceptor;

/// Local HTTP/1 server with a handful of fixed routes:
/// `/500` answers 500, `/slow` waits two seconds, `/echo` returns the
/// request body and `x-echo` header, anything else answers 200.
pub struct MockServer {
    pub addr: SocketAddr,
    scheme: &'static str,
    hits: Arc<AtomicUsize>,
}

impl MockServer {
    pub async fn start() -> MockServer {
        Self::bind(None).await
    }

    /// Same routes behind TLS with a fresh self-signed certificate for
    /// `localhost`. Returns the certificate as PEM.
    pub async fn start_tls() -> (MockServer, String) {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let key = PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der());
        let cert = CertificateDer::from(certified.cert.der().to_vec());

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let mut config = rustls::ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(vec![cert], key.into())
            .unwrap();
        config.alpn_protocols = vec![b"http/1.1".to_vec()];

        let server = Self::bind(Some(TlsAcceptor::from(Arc::new(config)))).await;
        (server, certified.cert.pem())
    }

    async fn bind(acceptor: Option<TlsAcceptor>) -> MockServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let scheme = if acceptor.is_some() { "https" } else { "http" };

        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    match acceptor {
                        Some(acceptor) => {
                            if let Ok(stream) = acceptor.accept(stream).await {
                                serve(stream).await;
                            }
                        }
                        None => serve(stream).await,
                    }
                });
            }
        });
        MockServer { addr, scheme, hits }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.addr, path)
    }

    /// Connections accepted so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Waits up to `limit` for the accepted connection count to reach
    /// `expected`, returning the last count seen.
    pub async fn wait_for_hits(&self, expected: usize, limit: Duration) -> usize {
        let deadline = tokio::time::Instant::now() + limit;
        while self.hits() < expected && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.hits()
    }
}

async fn serve<S>(stream: S)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let _ = http1::Builder::new()
        .serve_connection(TokioIo::new(stream), service_fn(route))
        .await;
}

async fn route(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let echo = req
        .headers()
        .get("x-echo")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let (status, body) = match path.as_str() {
        "/500" => (StatusCode::INTERNAL_SERVER_ERROR, Bytes::from("boom")),
        "/slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            (StatusCode::OK, Bytes::from("late"))
        }
        "/echo" => {
            let received = req.into_body().collect().await.unwrap().to_bytes();
            let mut body = format!("{echo}|").into_bytes();
            body.extend_from_slice(&received);
            (StatusCode::OK, Bytes::from(body))
        }
        _ => (StatusCode::OK, Bytes::from(format!("{method} {path}"))),
    };

    Ok(Response::builder()
        .status(status)
        .header("content-type", "text/plain")
        .body(Full::new(body))
        .unwrap())
}

/// A URL on a local port nothing listens on.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

pub type Outcome = (Option<Error>, Option<TimedResponse>);

/// A callback that forwards its arguments, and the receiver to await them on.
pub fn capture() -> (Callback, oneshot::Receiver<Outcome>) {
    let (tx, rx) = oneshot::channel();
    let callback: Callback = Box::new(move |error, response| {
        let _ = tx.send((error, response));
    });
    (callback, rx)
}
