use std::time::Duration;

/// Everything that can stop a request from producing a response.
///
/// Non-2xx statuses are not errors: a 500 is a completed request and comes
/// back as a normal [`TimedResponse`](crate::TimedResponse).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid target `{url}`: {reason}")]
    InvalidTarget { url: String, reason: String },
    #[error("unsupported http method `{0}`")]
    UnsupportedMethod(String),
    #[error("invalid header `{0}`")]
    InvalidHeader(String),

    #[error("dns lookup failed for {host}: {source}")]
    Dns {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no ip addresses found for host {0}")]
    NoAddress(String),
    #[error("tcp connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid tls server name `{0}`")]
    InvalidServerName(String),
    #[error("tls configuration error: {0}")]
    TlsConfig(String),
    #[error("tls handshake failed: {0}")]
    Tls(#[source] std::io::Error),
    #[error(transparent)]
    Http(#[from] hyper::Error),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("could not start a worker for the request: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("request finished without a response")]
    MissingResponse,
}

impl Error {
    pub(crate) fn invalid_target(url: impl Into<String>, reason: impl ToString) -> Self {
        Error::InvalidTarget {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures detected before any network activity.
    pub fn is_descriptor_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidTarget { .. } | Error::UnsupportedMethod(_) | Error::InvalidHeader(_)
        )
    }
}

impl From<rustls::Error> for Error {
    fn from(error: rustls::Error) -> Error {
        Error::TlsConfig(error.to_string())
    }
}
