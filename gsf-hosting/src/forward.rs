//! Typed forwarding of native calls to managed methods.
//!
//! Each adapter matches one export signature: it resolves the target, casts
//! it to the exact unmanaged signature and calls it. Failures come back as
//! `HostError`; `or_neutral` turns them into the neutral value the engine
//! expects from an export.

use std::ffi::{c_int, c_void};
use std::ptr;

use tracing::debug;

use crate::error::HostError;
use crate::resolver::ManagedMethod;
use crate::runtime::RuntimeBridge;

/// `void (void*)`
pub type PtrFn = unsafe extern "C" fn(*mut c_void);
/// `int (void*)`
pub type PtrToIntFn = unsafe extern "C" fn(*mut c_void) -> c_int;
/// `void (void*, void*)`
pub type PtrPairFn = unsafe extern "C" fn(*mut c_void, *mut c_void);
/// `int (void*, int)`
pub type TableVersionFn = unsafe extern "C" fn(*mut c_void, c_int) -> c_int;
/// `int (void*, int*)`
pub type TableVersionPtrFn = unsafe extern "C" fn(*mut c_void, *mut c_int) -> c_int;
/// `void* (void*)`
pub type PtrToPtrFn = unsafe extern "C" fn(*mut c_void) -> *mut c_void;

/// Value an export returns when its managed target could not be reached.
pub trait Neutral {
    fn neutral() -> Self;
}

impl Neutral for () {
    fn neutral() {}
}

impl Neutral for c_int {
    fn neutral() -> Self {
        0
    }
}

impl<T> Neutral for *mut T {
    fn neutral() -> Self {
        ptr::null_mut()
    }
}

impl<T> Neutral for *const T {
    fn neutral() -> Self {
        ptr::null()
    }
}

/// Unwraps a forward, substituting the neutral value on failure.
pub fn or_neutral<R: Neutral>(method: &ManagedMethod, result: Result<R, HostError>) -> R {
    match result {
        Ok(value) => value,
        Err(e) => {
            debug!("{} not forwarded: {} [{}]", method, e, e.call_result());
            R::neutral()
        }
    }
}

// All adapters share the same contract: arguments are passed through
// untouched, so they carry whatever validity requirements the managed target
// places on them.
impl RuntimeBridge {
    /// # Safety
    ///
    /// `method` must be an `[UnmanagedCallersOnly]` method with the signature
    /// `void (void*)`, and `arg` must satisfy its requirements.
    pub unsafe fn forward_ptr(&self, method: &ManagedMethod, arg: *mut c_void) -> Result<(), HostError> {
        let target: PtrFn = self.resolve_method(method)?.cast();
        target(arg);
        Ok(())
    }

    /// # Safety
    ///
    /// `method` must have the signature `int (void*)`.
    pub unsafe fn forward_ptr_to_int(
        &self,
        method: &ManagedMethod,
        arg: *mut c_void,
    ) -> Result<c_int, HostError> {
        let target: PtrToIntFn = self.resolve_method(method)?.cast();
        Ok(target(arg))
    }

    /// # Safety
    ///
    /// `method` must have the signature `void (void*, void*)`.
    pub unsafe fn forward_ptr_pair(
        &self,
        method: &ManagedMethod,
        first: *mut c_void,
        second: *mut c_void,
    ) -> Result<(), HostError> {
        let target: PtrPairFn = self.resolve_method(method)?.cast();
        target(first, second);
        Ok(())
    }

    /// # Safety
    ///
    /// `method` must have the signature `int (void*, int)`.
    pub unsafe fn forward_table_version(
        &self,
        method: &ManagedMethod,
        table: *mut c_void,
        version: c_int,
    ) -> Result<c_int, HostError> {
        let target: TableVersionFn = self.resolve_method(method)?.cast();
        Ok(target(table, version))
    }

    /// # Safety
    ///
    /// `method` must have the signature `int (void*, int*)`.
    pub unsafe fn forward_table_version_ptr(
        &self,
        method: &ManagedMethod,
        table: *mut c_void,
        version: *mut c_int,
    ) -> Result<c_int, HostError> {
        let target: TableVersionPtrFn = self.resolve_method(method)?.cast();
        Ok(target(table, version))
    }

    /// # Safety
    ///
    /// `method` must have the signature `void* (void*)`.
    pub unsafe fn forward_ptr_to_ptr(
        &self,
        method: &ManagedMethod,
        arg: *mut c_void,
    ) -> Result<*mut c_void, HostError> {
        let target: PtrToPtrFn = self.resolve_method(method)?.cast();
        Ok(target(arg))
    }
}
