use crate::error::Error;
use crate::response::assembler::Completion;
use crate::response::res::TimedResponse;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Error-first completion callback. Called at most once.
pub type Callback = Box<dyn FnOnce(Option<Error>, Option<TimedResponse>) + Send + 'static>;

/// Hands the outcome to `callback`, or drops it when there is none.
/// A panic inside the callback is caught and logged.
pub fn notify(callback: Option<Callback>, completion: Completion) {
    let (error, response) = completion.into_parts();
    let Some(callback) = callback else {
        match error {
            Some(error) => debug!("request failed with no callback: {}", error),
            None => debug!("request completed with no callback"),
        }
        return;
    };

    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || callback(error, response)))
    {
        error!("completion callback panicked: {}", panic_message(payload.as_ref()));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}
