use crate::error::Error;
use crate::http::dns_resolver::resolve;
use crate::request::descriptor::RequestDescriptor;
use crate::timing::{LifecycleObserver, Signal};
use crate::tls::client_config::client_config;
use bytes::{Bytes, BytesMut};
use http::header::{HeaderMap, HeaderValue, ACCEPT, HOST, USER_AGENT};
use http::{Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use pki_types::ServerName;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::Instrument;

/// A fully buffered response as the transport delivers it.
#[derive(Debug)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Runs one request over a dedicated connection, reporting each lifecycle
/// step to `observer` as it happens.
pub async fn execute<O>(
    descriptor: &RequestDescriptor,
    observer: &mut O,
) -> Result<TransportResponse, Error>
where
    O: LifecycleObserver + Send,
{
    match descriptor.timeout {
        Some(limit) => timeout(limit, exchange(descriptor, observer))
            .await
            .map_err(|_| Error::Timeout(limit))?,
        None => exchange(descriptor, observer).await,
    }
}

async fn exchange<O>(
    descriptor: &RequestDescriptor,
    observer: &mut O,
) -> Result<TransportResponse, Error>
where
    O: LifecycleObserver + Send,
{
    let request = build_request(descriptor)?;
    let tls = if descriptor.is_https() {
        let config = client_config(descriptor.insecure, descriptor.ca_file.as_deref())?;
        Some(TlsConnector::from(Arc::new(config)))
    } else {
        None
    };

    observer.on_signal(Signal::Socket);
    let addresses = resolve(descriptor.host(), descriptor.port()).await?;
    observer.on_signal(Signal::DnsResolved);
    let stream = connect(&addresses).await?;
    observer.on_signal(Signal::Connected);

    match tls {
        Some(connector) => {
            let host = descriptor
                .host()
                .trim_start_matches('[')
                .trim_end_matches(']');
            let domain = ServerName::try_from(host)
                .map_err(|_| Error::InvalidServerName(host.to_string()))?
                .to_owned();
            let tls_stream = connector.connect(domain, stream).await.map_err(Error::Tls)?;
            observer.on_signal(Signal::SecureConnected);
            send(tls_stream, request, observer).await
        }
        None => send(stream, request, observer).await,
    }
}

async fn connect(addresses: &[SocketAddr]) -> Result<TcpStream, Error> {
    let mut last_error = None;
    for addr in addresses {
        match TcpStream::connect(*addr).await {
            Ok(stream) => {
                if let Err(e) = stream.set_nodelay(true) {
                    trace!("set_nodelay failed: {}", e);
                }
                debug!("Connected to {}", addr);
                return Ok(stream);
            }
            Err(source) => {
                debug!("Connect to {} failed: {}", addr, source);
                last_error = Some(Error::Connect {
                    addr: addr.to_string(),
                    source,
                });
            }
        }
    }
    Err(last_error.unwrap_or_else(|| Error::NoAddress(String::new())))
}

async fn send<S, O>(
    stream: S,
    request: Request<Full<Bytes>>,
    observer: &mut O,
) -> Result<TransportResponse, Error>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    O: LifecycleObserver + Send,
{
    let (mut sender, conn) = http1::handshake(TokioIo::new(stream)).await?;
    tokio::spawn(
        async move {
            if let Err(err) = conn.await {
                debug!("Connection failed: {:?}", err);
            }
        }
        .in_current_span(),
    );

    let response = sender.send_request(request).await?;
    observer.on_signal(Signal::HeadersReceived);
    debug!("< {:?} {}", response.version(), response.status());
    for (key, value) in response.headers().iter() {
        debug!("< {}: {}", key, value.to_str().unwrap_or("<binary>"));
    }

    let (parts, mut incoming) = response.into_parts();
    let mut body = BytesMut::new();
    while let Some(frame) = incoming.frame().await {
        if let Ok(chunk) = frame?.into_data() {
            observer.on_signal(Signal::Data(chunk.len()));
            body.extend_from_slice(&chunk);
        }
    }
    observer.on_signal(Signal::End);

    Ok(TransportResponse {
        status: parts.status,
        headers: parts.headers,
        body: body.freeze(),
    })
}

/// Origin-form request with `Host`, `User-Agent` and `Accept` defaults.
/// Caller headers replace defaults of the same name.
fn build_request(descriptor: &RequestDescriptor) -> Result<Request<Full<Bytes>>, Error> {
    let url = &descriptor.url;
    let path = match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    };
    let host = match url.port_u16() {
        Some(port) => format!("{}:{}", descriptor.host(), port),
        None => descriptor.host().to_string(),
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        HOST,
        HeaderValue::from_str(&host).map_err(|_| Error::InvalidHeader(format!("host: {host}")))?,
    );
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("https-timer/", env!("CARGO_PKG_VERSION"))),
    );
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.extend(descriptor.headers.clone());

    let mut request = Request::builder()
        .method(descriptor.method.clone())
        .uri(path.as_str())
        .body(Full::new(descriptor.body.clone()))
        .map_err(|e| Error::invalid_target(url.to_string(), e))?;
    *request.headers_mut() = headers;

    debug!("> {} {} {:?}", request.method(), path, request.version());
    for (key, value) in request.headers().iter() {
        debug!("> {}: {}", key, value.to_str().unwrap_or("<binary>"));
    }
    Ok(request)
}
