use crate::error::Error;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, Uri};
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Verbs exposed as operations.
pub const SUPPORTED_METHODS: [Method; 8] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::OPTIONS,
    Method::TRACE,
];

/// Per-request options. Everything except `url` is handed to the transport
/// untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    pub url: String,
    /// Extra request headers; these override the defaults.
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// Upper bound for the whole exchange, in seconds when deserialized.
    #[serde(with = "secs_option")]
    pub timeout: Option<Duration>,
    /// Skip server certificate verification.
    pub insecure: bool,
    /// PEM bundle to trust instead of the bundled roots.
    pub ca_file: Option<PathBuf>,
}

impl RequestOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn ca_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_file = Some(path.into());
        self
    }
}

mod secs_option {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<f64>::deserialize(deserializer)? {
            Some(secs) if !secs.is_finite() || secs < 0.0 => Err(D::Error::custom(format!(
                "timeout must be a non-negative number of seconds, got {secs}"
            ))),
            secs => Ok(secs.map(Duration::from_secs_f64)),
        }
    }
}

/// What a caller may pass to an operation: a bare URL or options carrying one.
#[derive(Debug, Clone)]
pub enum Target {
    Url(String),
    Options(RequestOptions),
}

impl From<&str> for Target {
    fn from(url: &str) -> Self {
        Target::Url(url.to_string())
    }
}

impl From<String> for Target {
    fn from(url: String) -> Self {
        Target::Url(url)
    }
}

impl From<&String> for Target {
    fn from(url: &String) -> Self {
        Target::Url(url.clone())
    }
}

impl From<RequestOptions> for Target {
    fn from(options: RequestOptions) -> Self {
        Target::Options(options)
    }
}

impl Target {
    pub fn url(&self) -> &str {
        match self {
            Target::Url(url) => url,
            Target::Options(options) => &options.url,
        }
    }

    fn into_options(self) -> RequestOptions {
        match self {
            Target::Url(url) => RequestOptions::new(url),
            Target::Options(options) => options,
        }
    }
}

/// Canonical request shape every downstream component works with.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub timeout: Option<Duration>,
    pub insecure: bool,
    pub ca_file: Option<PathBuf>,
}

impl RequestDescriptor {
    pub fn new(method: Method, target: impl Into<Target>) -> Result<Self, Error> {
        if !SUPPORTED_METHODS.contains(&method) {
            return Err(Error::UnsupportedMethod(method.to_string()));
        }
        let options = target.into().into_options();
        let raw = options.url.trim();
        if raw.is_empty() {
            return Err(Error::invalid_target(raw, "url is empty"));
        }

        let url = Uri::from_str(raw).map_err(|e| Error::invalid_target(raw, e))?;
        match url.scheme_str() {
            Some("http") | Some("https") => {}
            Some(other) => {
                return Err(Error::invalid_target(
                    raw,
                    format!("unsupported scheme `{other}`"),
                ))
            }
            None => return Err(Error::invalid_target(raw, "missing scheme")),
        }
        if url.host().map_or(true, str::is_empty) {
            return Err(Error::invalid_target(raw, "missing host"));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            let name = HeaderName::from_str(name.trim())
                .map_err(|_| Error::InvalidHeader(name.clone()))?;
            let value = HeaderValue::from_str(value.trim())
                .map_err(|_| Error::InvalidHeader(format!("{name}: {value}")))?;
            headers.append(name, value);
        }

        Ok(Self {
            method,
            url,
            headers,
            body: options.body.map(Bytes::from).unwrap_or_default(),
            timeout: options.timeout,
            insecure: options.insecure,
            ca_file: options.ca_file,
        })
    }

    pub fn is_https(&self) -> bool {
        self.url.scheme_str() == Some("https")
    }

    pub fn host(&self) -> &str {
        self.url.host().unwrap_or_default()
    }

    pub fn port(&self) -> u16 {
        self.url
            .port_u16()
            .unwrap_or(if self.is_https() { 443 } else { 80 })
    }
}
