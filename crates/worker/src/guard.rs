//! Exception guard: the last line of defence against silent worker death.
//!
//! Handlers and background tasks return `Result`s; the guard only deals with
//! what escapes that, i.e. panics. [`install`] replaces the process panic hook
//! with one that logs through `tracing`, and [`catch_panic`] /
//! [`catch_panic_sync`] convert an unwinding panic into an error message at the
//! dispatch and task boundaries so the worker keeps serving.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use futures::FutureExt;
use tracing::error;

static INSTALL: Once = Once::new();

/// Installs the process-wide panic hook. Idempotent.
pub fn install() {
    INSTALL.call_once(|| {
        panic::set_hook(Box::new(|info| {
            let location = info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                .unwrap_or_else(|| "<unknown>".to_string());
            error!(
                location = %location,
                message = %panic_message(info.payload()),
                "Unhandled panic caught by exception guard"
            );
        }));
    });
}

/// Extracts a readable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Runs `fut`, converting a panic into `Err(message)`.
pub async fn catch_panic<F>(fut: F) -> Result<F::Output, String>
where
    F: Future,
{
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .map_err(|payload| panic_message(payload.as_ref()))
}

/// Runs `f`, converting a panic into `Err(message)`.
pub fn catch_panic_sync<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}
