//! Native GoldSrc server module backed by GoldsrcFramework.
//!
//! Every engine-facing export relays to a static method of the managed
//! assembly next to this module. The .NET runtime is started on the first
//! export call and lives until `GsfShutdown` or process exit.

pub mod allocator;
mod boundary;
pub mod diagnostics;
pub mod server;

pub use diagnostics::{Test, F};
pub use server::{
    GetEntityAPI, GetEntityAPI2, GetNewDLLFunctions, GetPrivateDataAllocator, GiveFnptrsToDll,
};

/// Closes the managed runtime. Optional; later exports return their neutral
/// values.
#[no_mangle]
pub extern "C" fn GsfShutdown() {
    let _ = std::panic::catch_unwind(gsf_hosting::shutdown);
}
