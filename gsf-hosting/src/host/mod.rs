//! Access to the .NET host launcher (hostfxr).
//!
//! ## Hosting ABI
//!
//! The bridge needs three root exports from the launcher library:
//!
//! ```c
//! int hostfxr_initialize_for_runtime_config(const char_t* config,
//!     const hostfxr_initialize_parameters* params, hostfxr_handle* handle);
//! int hostfxr_get_runtime_delegate(const hostfxr_handle handle,
//!     enum hostfxr_delegate_type type, void** delegate);
//! int hostfxr_close(const hostfxr_handle handle);
//! ```
//!
//! `HostProvider` is the seam between the runtime bridge and the machine:
//! `SystemHost` searches for and loads the real library, `mock::MockHost` supplies
//! in-process fakes with the same raw signatures.

pub mod fxr;
pub mod launcher;
pub mod locator;
pub mod mock;

use std::path::{Path, PathBuf};

use crate::error::HostError;
use crate::settings::HostSettings;

pub use launcher::{HostFxr, HostFxrExports, RuntimeContext};
pub use locator::HostLocator;

/// Finds and loads a host launcher library.
pub trait HostProvider: Send + Sync {
    /// Path of the launcher library for this process.
    fn locate(&self) -> Result<PathBuf, HostError>;

    /// Loads the launcher at `path` and resolves its root exports.
    fn load(&self, path: &Path) -> Result<HostFxr, HostError>;
}

/// The installed .NET host of this machine.
#[derive(Debug, Clone)]
pub struct SystemHost {
    locator: HostLocator,
}

impl SystemHost {
    pub fn new(settings: &HostSettings) -> Self {
        Self {
            locator: HostLocator::from_settings(settings),
        }
    }

    pub fn with_locator(locator: HostLocator) -> Self {
        Self { locator }
    }
}

impl HostProvider for SystemHost {
    fn locate(&self) -> Result<PathBuf, HostError> {
        self.locator.search()
    }

    fn load(&self, path: &Path) -> Result<HostFxr, HostError> {
        HostFxr::load(path)
    }
}
