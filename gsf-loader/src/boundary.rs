use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use gsf_hosting::{or_neutral, HostError, ManagedMethod, Neutral, RuntimeBridge};
use tracing::error;

/// Runs one forward against the process-wide bridge without letting a panic
/// escape into the engine.
pub(crate) fn relay<R>(
    method: &ManagedMethod,
    forward: impl FnOnce(&RuntimeBridge) -> Result<R, HostError>,
) -> Result<R, HostError> {
    contain(method, || forward(RuntimeBridge::global()))
}

fn contain<R>(
    method: &ManagedMethod,
    call: impl FnOnce() -> Result<R, HostError>,
) -> Result<R, HostError> {
    panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
        let message = panic_message(payload.as_ref());
        error!("Forward to {} panicked: {}", method, message);
        Err(HostError::Panicked(message))
    })
}

/// `relay`, with failures replaced by the export's neutral return value.
pub(crate) fn relay_or_neutral<R: Neutral>(
    method: &ManagedMethod,
    forward: impl FnOnce(&RuntimeBridge) -> Result<R, HostError>,
) -> R {
    or_neutral(method, relay(method, forward))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
