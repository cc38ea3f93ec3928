use crate::error::Error;
use crate::http::handler::execute;
use crate::request::descriptor::{RequestDescriptor, Target};
use crate::response::assembler::{assemble, Completion};
use crate::response::notifier::{notify, Callback};
use crate::response::res::TimedResponse;
use crate::timing::TimingCollector;
use http::Method;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tokio::runtime::{Builder, Handle};
use tracing::{Instrument, Span};

/// Normalizes the target, runs the exchange and assembles the outcome.
/// Every failure ends up in the returned [`Completion`].
async fn run(method: Method, target: Target, mut collector: TimingCollector) -> Completion {
    let descriptor = match RequestDescriptor::new(method, target) {
        Ok(descriptor) => descriptor,
        Err(error) => {
            debug!("Rejected target: {}", error);
            return assemble(None, None, Some(error));
        }
    };

    match execute(&descriptor, &mut collector).await {
        Ok(response) => {
            let durations = collector.finish();
            debug!(
                status = response.status.as_u16(),
                total_ms = durations.total,
                "request completed"
            );
            assemble(Some(response), Some(durations), None)
        }
        Err(error) => {
            let observed = collector.fail();
            debug!("Request failed after phases {:?}: {}", observed, error);
            assemble(None, None, Some(error))
        }
    }
}

fn request_span(method: &Method, target: &Target) -> Span {
    info_span!("request", method = %method, url = %target.url())
}

/// Awaits one instrumented request. Same pipeline as [`dispatch`] without
/// the callback.
///
/// Must be polled inside a tokio runtime with the I/O and time drivers
/// enabled: resolution, the connection driver and the timeout all run on it.
pub async fn request(method: Method, target: impl Into<Target>) -> Result<TimedResponse, Error> {
    let collector = TimingCollector::start();
    let target = target.into();
    let span = request_span(&method, &target);
    run(method, target, collector)
        .instrument(span)
        .await
        .into_result()
}

/// Starts one request and returns immediately. The outcome is delivered to
/// `callback` exactly once, or dropped when `callback` is `None`.
///
/// Runs on the current tokio runtime when there is one, otherwise on a
/// dedicated thread with its own current-thread runtime. Never panics.
pub fn dispatch(method: Method, target: impl Into<Target>, callback: Option<Callback>) {
    let collector = TimingCollector::start();
    let target = target.into();
    let span = request_span(&method, &target);

    match Handle::try_current() {
        Ok(handle) => {
            handle.spawn(
                async move {
                    let completion = run(method, target, collector).await;
                    notify(callback, completion);
                }
                .instrument(span),
            );
        }
        Err(_) => spawn_worker(method, target, collector, callback, span),
    }
}

fn spawn_worker(
    method: Method,
    target: Target,
    collector: TimingCollector,
    callback: Option<Callback>,
    span: Span,
) {
    // the callback stays reachable here if the thread never starts
    let slot = Arc::new(Mutex::new(callback));
    let worker_slot = slot.clone();

    let spawned = thread::Builder::new()
        .name("https-timer".to_string())
        .spawn(move || {
            let callback = take(&worker_slot);
            match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime.block_on(
                    async move {
                        let completion = run(method, target, collector).await;
                        notify(callback, completion);
                    }
                    .instrument(span),
                ),
                Err(e) => {
                    error!("Failed to build a runtime for the request: {}", e);
                    notify(callback, assemble(None, None, Some(Error::Runtime(e))));
                }
            }
        });

    if let Err(e) = spawned {
        error!("Failed to spawn a request worker: {}", e);
        notify(take(&slot), assemble(None, None, Some(Error::Runtime(e))));
    }
}

fn take(slot: &Mutex<Option<Callback>>) -> Option<Callback> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

macro_rules! verbs {
    ($($name:ident => $method:ident,)+) => {
        $(
            #[doc = concat!("Issues a `", stringify!($method), "` request. See [`dispatch`].")]
            pub fn $name(target: impl Into<Target>, callback: Option<Callback>) {
                dispatch(Method::$method, target, callback)
            }
        )+
    };
}

verbs! {
    get => GET,
    head => HEAD,
    post => POST,
    put => PUT,
    delete => DELETE,
    patch => PATCH,
    options => OPTIONS,
    trace => TRACE,
}
