//! Host launcher loading using libloading.

use std::ffi::c_void;
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr;

use libloading::Library;
use tracing::debug;

use super::fxr::{
    hostfxr_handle, status, CloseFn, GetRuntimeDelegateFn, HostString,
    InitializeForRuntimeConfigFn, LoadAssemblyAndGetFunctionPointerFn, CLOSE_SYMBOL,
    GET_RUNTIME_DELEGATE_SYMBOL, HDT_LOAD_ASSEMBLY_AND_GET_FUNCTION_POINTER,
    INITIALIZE_FOR_RUNTIME_CONFIG_SYMBOL,
};
use crate::error::{CallResult, HostError};

/// The three root entry points of a hostfxr library.
#[derive(Clone, Copy)]
pub struct HostFxrExports {
    pub initialize_for_runtime_config: InitializeForRuntimeConfigFn,
    pub get_runtime_delegate: GetRuntimeDelegateFn,
    pub close: CloseFn,
}

/// A loaded hostfxr library. Dropping it unloads the library, so any context
/// opened through it has to be closed first.
pub struct HostFxr {
    exports: HostFxrExports,
    origin: PathBuf,
    _library: Option<Library>,
}

impl HostFxr {
    /// Loads hostfxr and resolves its entry points, all or nothing. Loading
    /// runs the library's initialisers.
    pub fn load(path: &Path) -> Result<Self, HostError> {
        debug!("Loading hostfxr from {:?}", path);

        let library = unsafe { Library::new(path) }.map_err(|source| HostError::LibraryLoad {
            path: path.to_path_buf(),
            source,
        })?;

        // `library` is dropped (and unloaded) on every early return below.
        let exports = unsafe {
            HostFxrExports {
                initialize_for_runtime_config: symbol(
                    &library,
                    path,
                    INITIALIZE_FOR_RUNTIME_CONFIG_SYMBOL,
                )?,
                get_runtime_delegate: symbol(&library, path, GET_RUNTIME_DELEGATE_SYMBOL)?,
                close: symbol(&library, path, CLOSE_SYMBOL)?,
            }
        };

        debug!("Resolved hostfxr exports from {:?}", path);
        Ok(Self {
            exports,
            origin: path.to_path_buf(),
            _library: Some(library),
        })
    }

    /// A launcher backed by entry points that already live in this process.
    pub fn from_exports(exports: HostFxrExports, origin: impl Into<PathBuf>) -> Self {
        Self {
            exports,
            origin: origin.into(),
            _library: None,
        }
    }

    pub fn origin(&self) -> &Path {
        &self.origin
    }

    pub fn exports(&self) -> &HostFxrExports {
        &self.exports
    }

    /// Starts a runtime from `config` and returns the owning context.
    pub fn initialize_for_runtime_config(&self, config: &Path) -> Result<RuntimeContext, HostError> {
        let config_str = HostString::from_path(config, CallResult::RuntimeInitFailed)?;
        let mut handle: hostfxr_handle = ptr::null_mut();

        let rc = unsafe {
            (self.exports.initialize_for_runtime_config)(config_str.as_ptr(), ptr::null(), &mut handle)
        };

        // Own whatever handle came back so a failed start still gets closed.
        let context = RuntimeContext::adopt(handle, self.exports.close);
        match context {
            Some(context) if status::is_success(rc) => {
                debug!("Runtime context opened (status {:#x})", rc);
                Ok(context)
            }
            _ => Err(HostError::RuntimeInit {
                config: config.to_path_buf(),
                status: rc,
            }),
        }
    }
}

impl fmt::Debug for HostFxr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFxr")
            .field("origin", &self.origin)
            .field("loaded", &self._library.is_some())
            .finish()
    }
}

unsafe fn symbol<T: Copy>(
    library: &Library,
    path: &Path,
    name: &'static str,
) -> Result<T, HostError> {
    library
        .get::<T>(name.as_bytes())
        .map(|s| *s)
        .map_err(|_| HostError::MissingExport {
            path: path.to_path_buf(),
            symbol: name,
        })
}

/// One live runtime context (`hostfxr_handle`). Closed exactly once, when
/// dropped.
pub struct RuntimeContext {
    handle: hostfxr_handle,
    close: CloseFn,
}

impl RuntimeContext {
    fn adopt(handle: hostfxr_handle, close: CloseFn) -> Option<Self> {
        (!handle.is_null()).then_some(Self { handle, close })
    }

    /// Fetches the `load_assembly_and_get_function_pointer` routine.
    pub fn load_assembly_delegate(
        &self,
        get_runtime_delegate: GetRuntimeDelegateFn,
    ) -> Result<LoadAssemblyAndGetFunctionPointerFn, HostError> {
        let mut delegate: *mut c_void = ptr::null_mut();
        let rc = unsafe {
            get_runtime_delegate(
                self.handle,
                HDT_LOAD_ASSEMBLY_AND_GET_FUNCTION_POINTER,
                &mut delegate,
            )
        };

        if !status::is_success(rc) || delegate.is_null() {
            return Err(HostError::DelegateUnavailable { status: rc });
        }

        Ok(unsafe { std::mem::transmute::<*mut c_void, LoadAssemblyAndGetFunctionPointerFn>(delegate) })
    }
}

impl Drop for RuntimeContext {
    fn drop(&mut self) {
        let rc = unsafe { (self.close)(self.handle) };
        debug!("Runtime context closed (status {:#x})", rc);
    }
}

// The handle is only ever used behind the bridge's lifecycle lock or as a
// read-only token once the runtime is ready.
unsafe impl Send for RuntimeContext {}
unsafe impl Sync for RuntimeContext {}
