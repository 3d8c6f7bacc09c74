//! Raw ABI of the .NET hosting layer (`hostfxr.h` / `coreclr_delegates.h`).
//!
//! Strings are `char_t`: UTF-16 on Windows, narrow bytes everywhere else.

#![allow(non_camel_case_types)]

use std::ffi::c_void;
use std::path::Path;

use crate::error::{CallResult, HostError};

#[cfg(windows)]
pub type char_t = u16;
#[cfg(not(windows))]
pub type char_t = std::ffi::c_char;

/// Opaque `hostfxr_handle`.
pub type hostfxr_handle = *mut c_void;

pub type InitializeForRuntimeConfigFn = unsafe extern "C" fn(
    runtime_config_path: *const char_t,
    parameters: *const c_void,
    host_context_handle: *mut hostfxr_handle,
) -> i32;

pub type GetRuntimeDelegateFn = unsafe extern "C" fn(
    host_context_handle: hostfxr_handle,
    delegate_type: i32,
    delegate: *mut *mut c_void,
) -> i32;

pub type CloseFn = unsafe extern "C" fn(host_context_handle: hostfxr_handle) -> i32;

/// `load_assembly_and_get_function_pointer_fn`; uses the CoreCLR delegate
/// calling convention, which is stdcall on 32-bit Windows.
pub type LoadAssemblyAndGetFunctionPointerFn = unsafe extern "system" fn(
    assembly_path: *const char_t,
    type_name: *const char_t,
    method_name: *const char_t,
    delegate_type_name: *const char_t,
    reserved: *mut c_void,
    delegate: *mut *mut c_void,
) -> i32;

pub const INITIALIZE_FOR_RUNTIME_CONFIG_SYMBOL: &str = "hostfxr_initialize_for_runtime_config";
pub const GET_RUNTIME_DELEGATE_SYMBOL: &str = "hostfxr_get_runtime_delegate";
pub const CLOSE_SYMBOL: &str = "hostfxr_close";

/// `hostfxr_delegate_type::hdt_load_assembly_and_get_function_pointer`
pub const HDT_LOAD_ASSEMBLY_AND_GET_FUNCTION_POINTER: i32 = 5;

/// `UNMANAGEDCALLERSONLY_METHOD`: the target is marked `[UnmanagedCallersOnly]`
/// and has no delegate type.
pub const UNMANAGEDCALLERSONLY_METHOD: *const char_t = usize::MAX as *const char_t;

pub mod status {
    pub const SUCCESS: i32 = 0;
    pub const SUCCESS_HOST_ALREADY_INITIALIZED: i32 = 1;
    pub const SUCCESS_DIFFERENT_RUNTIME_PROPERTIES: i32 = 2;
    pub const INVALID_ARG_FAILURE: i32 = 0x8000_8081_u32 as i32;
    pub const INVALID_CONFIG_FILE: i32 = 0x8000_8093_u32 as i32;
    pub const HOST_INVALID_STATE: i32 = 0x8000_80a3_u32 as i32;
    /// `COR_E_MISSINGMETHOD`, reported by the loader routine for unknown targets.
    pub const MISSING_METHOD: i32 = 0x8013_1513_u32 as i32;
    /// `HRESULT_FROM_WIN32(ERROR_FILE_NOT_FOUND)`, reported for a missing assembly.
    pub const FILE_NOT_FOUND: i32 = 0x8007_0002_u32 as i32;

    /// hostfxr reports every success flavour with a non-negative code.
    pub fn is_success(code: i32) -> bool {
        code >= 0
    }
}

/// A NUL-terminated string in the host's `char_t` encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostString {
    units: Vec<char_t>,
}

impl HostString {
    /// Encode `value`; `stage` is the pipeline stage blamed if it carries an
    /// interior NUL.
    pub fn new(value: &str, stage: CallResult) -> Result<Self, HostError> {
        #[cfg(windows)]
        let units: Vec<char_t> = value.encode_utf16().collect();
        #[cfg(not(windows))]
        let units: Vec<char_t> = value.bytes().map(|b| b as char_t).collect();

        Self::terminate(units, || value.to_string(), stage)
    }

    pub fn from_path(path: &Path, stage: CallResult) -> Result<Self, HostError> {
        #[cfg(windows)]
        let units: Vec<char_t> = {
            use std::os::windows::ffi::OsStrExt;
            path.as_os_str().encode_wide().collect()
        };
        #[cfg(not(windows))]
        let units: Vec<char_t> = {
            use std::os::unix::ffi::OsStrExt;
            path.as_os_str()
                .as_bytes()
                .iter()
                .map(|b| *b as char_t)
                .collect()
        };

        Self::terminate(units, || path.display().to_string(), stage)
    }

    fn terminate(
        mut units: Vec<char_t>,
        describe: impl FnOnce() -> String,
        stage: CallResult,
    ) -> Result<Self, HostError> {
        if units.contains(&0) {
            return Err(HostError::InvalidString {
                value: describe(),
                stage,
            });
        }
        units.push(0);
        Ok(Self { units })
    }

    pub fn as_ptr(&self) -> *const char_t {
        self.units.as_ptr()
    }
}

/// Decode a NUL-terminated `char_t` string. Invalid sequences are replaced.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated `char_t` string.
pub unsafe fn read_host_string(ptr: *const char_t) -> Option<String> {
    if ptr.is_null() {
        return None;
    }

    let mut len = 0usize;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    let units = std::slice::from_raw_parts(ptr, len);

    #[cfg(windows)]
    let decoded = String::from_utf16_lossy(units);
    #[cfg(not(windows))]
    let decoded = {
        let bytes: Vec<u8> = units.iter().map(|c| *c as u8).collect();
        String::from_utf8_lossy(&bytes).into_owned()
    };

    Some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_string_round_trips() {
        let value = "GoldsrcFramework.FrameworkInterop, GoldsrcFramework";
        let encoded = HostString::new(value, CallResult::FunctionLoadFailed).unwrap();

        let decoded = unsafe { read_host_string(encoded.as_ptr()) };
        assert_eq!(decoded.as_deref(), Some(value));
    }

    #[test]
    fn test_host_string_rejects_interior_nul() {
        let err = HostString::new("Get\0EntityAPI", CallResult::FunctionLoadFailed).unwrap_err();
        assert_eq!(err.call_result(), CallResult::FunctionLoadFailed);
    }

    #[test]
    fn test_path_encoding_keeps_separators() {
        let path = Path::new("dlls").join("GoldsrcFramework.dll");
        let encoded = HostString::from_path(&path, CallResult::RuntimeInitFailed).unwrap();

        let decoded = unsafe { read_host_string(encoded.as_ptr()) }.unwrap();
        assert_eq!(Path::new(&decoded), path.as_path());
    }

    #[test]
    fn test_null_pointer_reads_as_none() {
        assert_eq!(unsafe { read_host_string(std::ptr::null()) }, None);
    }

    #[test]
    fn test_success_codes() {
        assert!(status::is_success(status::SUCCESS));
        assert!(status::is_success(status::SUCCESS_HOST_ALREADY_INITIALIZED));
        assert!(status::is_success(status::SUCCESS_DIFFERENT_RUNTIME_PROPERTIES));
        assert!(!status::is_success(status::INVALID_CONFIG_FILE));
    }
}
