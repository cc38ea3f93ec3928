use crate::error::Error;
use crate::http::handler::TransportResponse;
use crate::response::res::{TimedResponse, Timing};
use crate::timing::Durations;

/// Error-first outcome of one request. Exactly one side is set; the fields
/// are private so only [`assemble`] can build one.
#[derive(Debug)]
pub struct Completion {
    error: Option<Error>,
    response: Option<TimedResponse>,
}

impl Completion {
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn response(&self) -> Option<&TimedResponse> {
        self.response.as_ref()
    }

    pub fn into_parts(self) -> (Option<Error>, Option<TimedResponse>) {
        (self.error, self.response)
    }

    pub fn into_result(self) -> Result<TimedResponse, Error> {
        match (self.error, self.response) {
            (None, Some(response)) => Ok(response),
            (Some(error), _) => Err(error),
            (None, None) => Err(Error::MissingResponse),
        }
    }
}

/// Merges the transport outcome with the collected durations.
///
/// An error always wins and drops any response. A response without an error
/// becomes a [`TimedResponse`]; missing durations are reported as zeros.
/// With neither, the outcome is [`Error::MissingResponse`].
pub fn assemble(
    response: Option<TransportResponse>,
    durations: Option<Durations>,
    error: Option<Error>,
) -> Completion {
    if let Some(error) = error {
        return Completion {
            error: Some(error),
            response: None,
        };
    }
    let Some(response) = response else {
        return Completion {
            error: Some(Error::MissingResponse),
            response: None,
        };
    };

    Completion {
        error: None,
        response: Some(TimedResponse {
            status_code: response.status.as_u16(),
            headers: response.headers,
            body: response.body,
            timing: Timing {
                durations: durations.unwrap_or_default(),
            },
        }),
    }
}
