//! HTTP(S) requests that come back with a per-phase timing breakdown.
//!
//! Every verb has an operation taking a URL (or [`RequestOptions`]) and an
//! optional error-first callback:
//!
//! ```no_run
//! https_timer::get(
//!     "https://example.com",
//!     Some(Box::new(|error, response| match (error, response) {
//!         (None, Some(response)) => println!("{}", response.timing.durations),
//!         (Some(error), _) => eprintln!("{error}"),
//!         _ => {}
//!     })),
//! );
//! ```
//!
//! Async callers can await [`request`] instead.
#[macro_use]
extern crate tracing;

mod error;
mod http;
mod request;
mod response;
mod timing;
mod tls;

pub use crate::error::Error;
pub use crate::http::handler::{execute, TransportResponse};
pub use crate::request::descriptor::{
    RequestDescriptor, RequestOptions, Target, SUPPORTED_METHODS,
};
pub use crate::request::dispatcher::{
    delete, dispatch, get, head, options, patch, post, put, request, trace,
};
pub use crate::response::assembler::{assemble, Completion};
pub use crate::response::notifier::{notify, Callback};
pub use crate::response::res::{TimedResponse, Timing};
pub use crate::timing::{
    Durations, LifecycleObserver, Phase, Signal, TimingCollector, DURATION_KEYS,
};
pub use ::http::{HeaderMap, Method};
