//! One-shot hook for the private-data allocator subsystem.
//!
//! The subsystem lives outside this crate. Its initializer runs once per
//! process, right after the engine's function table has been handed to the
//! managed side.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Once, OnceLock};

use tracing::{info, warn};

static INITIALIZER: OnceLock<fn()> = OnceLock::new();
static RUN: Once = Once::new();
static MISSING_REPORTED: AtomicBool = AtomicBool::new(false);

#[cfg(feature = "external-allocators")]
extern "C" {
    fn InitializePrivateDataAllocators();
}

/// Registers the subsystem's initializer. Only the first registration is
/// kept; returns whether this one was.
pub fn register_initializer(initializer: fn()) -> bool {
    INITIALIZER.set(initializer).is_ok()
}

/// Whether the initializer has run.
pub fn is_initialized() -> bool {
    RUN.is_completed()
}

#[cfg(feature = "external-allocators")]
fn initializer() -> Option<fn()> {
    fn external() {
        unsafe { InitializePrivateDataAllocators() }
    }
    Some(INITIALIZER.get().copied().unwrap_or(external))
}

#[cfg(not(feature = "external-allocators"))]
fn initializer() -> Option<fn()> {
    INITIALIZER.get().copied()
}

/// Runs the initializer unless it already ran. Callers must only invoke this
/// after a successful `GiveFnptrsToDll` forward.
pub(crate) fn initialize_once() {
    let Some(initializer) = initializer() else {
        report_missing_initializer();
        return;
    };

    RUN.call_once(|| {
        initializer();
        info!("Private data allocators initialized");
    });
}

/// Warns the first time the hook fires with nothing registered. Returns
/// whether this call emitted the warning.
fn report_missing_initializer() -> bool {
    if MISSING_REPORTED.swap(true, Ordering::Relaxed) {
        return false;
    }
    warn!("No private data allocator initializer registered; allocators stay uninitialized");
    true
}
