//! Resolution of managed `[UnmanagedCallersOnly]` methods to native addresses.

use std::ffi::c_void;
use std::fmt;
use std::ptr::{self, NonNull};

use tracing::debug;

use crate::error::{CallResult, HostError};
use crate::host::fxr::{status, HostString, UNMANAGEDCALLERSONLY_METHOD};
use crate::runtime::RuntimeBridge;

/// An export target: assembly-qualified type name plus static method name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManagedMethod {
    pub type_name: &'static str,
    pub method_name: &'static str,
}

impl ManagedMethod {
    pub const fn new(type_name: &'static str, method_name: &'static str) -> Self {
        Self {
            type_name,
            method_name,
        }
    }
}

impl fmt::Display for ManagedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.type_name, self.method_name)
    }
}

/// Native entry address of a managed method. Only callable while the runtime
/// that produced it is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMethod(NonNull<c_void>);

impl ResolvedMethod {
    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }

    /// Reinterprets the address as a function pointer type.
    ///
    /// # Safety
    ///
    /// `F` must be a function pointer type matching the managed method's
    /// unmanaged signature.
    pub unsafe fn cast<F: Copy>(self) -> F {
        debug_assert_eq!(
            std::mem::size_of::<F>(),
            std::mem::size_of::<*mut c_void>()
        );
        std::mem::transmute_copy::<*mut c_void, F>(&self.0.as_ptr())
    }
}

impl RuntimeBridge {
    /// Resolves `type_name::method_name` from the managed assembly, starting
    /// the runtime if needed. Nothing is cached; every call goes through the
    /// runtime's loader routine.
    pub fn resolve(&self, type_name: &str, method_name: &str) -> Result<ResolvedMethod, HostError> {
        let type_str = HostString::new(type_name, CallResult::FunctionLoadFailed)?;
        let method_str = HostString::new(method_name, CallResult::FunctionLoadFailed)?;

        let (rc, address) = self.with_ready(|ready| {
            let mut address: *mut c_void = ptr::null_mut();
            let rc = unsafe {
                (ready.load_assembly)(
                    ready.assembly.as_ptr(),
                    type_str.as_ptr(),
                    method_str.as_ptr(),
                    UNMANAGEDCALLERSONLY_METHOD,
                    ptr::null_mut(),
                    &mut address,
                )
            };
            (rc, address)
        })?;

        match NonNull::new(address) {
            Some(address) if rc == status::SUCCESS => {
                debug!("Resolved {}::{} at {:p}", type_name, method_name, address);
                Ok(ResolvedMethod(address))
            }
            _ => {
                debug!(
                    "Failed to resolve {}::{} (status {:#010x})",
                    type_name, method_name, rc
                );
                Err(HostError::FunctionLoad {
                    type_name: type_name.to_string(),
                    method_name: method_name.to_string(),
                    status: rc,
                })
            }
        }
    }

    pub fn resolve_method(&self, method: &ManagedMethod) -> Result<ResolvedMethod, HostError> {
        self.resolve(method.type_name, method.method_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::{MockBehavior, MockHost};
    use crate::runtime::RuntimeState;

    const ENTRY: ManagedMethod =
        ManagedMethod::new("GoldsrcFramework.HostingTest, GoldsrcFramework", "Test");

    unsafe extern "C" fn managed_test(value: i32) -> i32 {
        value + 1
    }

    #[test]
    fn test_resolve_starts_runtime_on_demand() {
        let mock = MockHost::new(MockBehavior::Success);
        mock.register_method(ENTRY.type_name, ENTRY.method_name, managed_test as *const c_void);
        let bridge = mock.bridge();

        let resolved = bridge.resolve_method(&ENTRY).unwrap();

        assert_eq!(bridge.state(), RuntimeState::Ready);
        assert_eq!(resolved.as_ptr(), managed_test as *mut c_void);
        let target: unsafe extern "C" fn(i32) -> i32 = unsafe { resolved.cast() };
        assert_eq!(unsafe { target(41) }, 42);
    }

    #[test]
    fn test_resolve_is_not_cached() {
        let mock = MockHost::new(MockBehavior::Success);
        mock.register_method(ENTRY.type_name, ENTRY.method_name, managed_test as *const c_void);
        let bridge = mock.bridge();

        for _ in 0..3 {
            bridge.resolve_method(&ENTRY).unwrap();
        }

        let stats = mock.stats();
        assert_eq!(stats.resolve_calls, 3);
        assert_eq!(stats.init_calls, 1);
    }

    #[test]
    fn test_unknown_method_is_function_load_failure() {
        let mock = MockHost::new(MockBehavior::Success);
        let bridge = mock.bridge();

        let err = bridge
            .resolve("GoldsrcFramework.Nope, GoldsrcFramework", "Missing")
            .unwrap_err();

        assert_eq!(err.call_result(), CallResult::FunctionLoadFailed);
        assert!(matches!(
            err,
            HostError::FunctionLoad { status: code, .. } if code == status::MISSING_METHOD
        ));
        assert_eq!(mock.stats().resolve_calls, 1);
    }

    #[test]
    fn test_missing_assembly_is_function_load_failure() {
        let mock = MockHost::new(MockBehavior::AssemblyMissing);
        let bridge = mock.bridge();

        let err = bridge.resolve_method(&ENTRY).unwrap_err();
        assert_eq!(err.call_result(), CallResult::FunctionLoadFailed);
    }

    #[test]
    fn test_init_failure_propagates_stage() {
        let mock = MockHost::new(MockBehavior::HostMissing);
        let bridge = mock.bridge();

        let err = bridge.resolve_method(&ENTRY).unwrap_err();
        assert_eq!(err.call_result(), CallResult::HostLoadFailed);
        assert_eq!(mock.stats().resolve_calls, 0);
    }

    #[test]
    fn test_interior_nul_never_reaches_runtime() {
        let mock = MockHost::new(MockBehavior::Success);
        let bridge = mock.bridge();

        let err = bridge.resolve("Bad\0Type", "Test").unwrap_err();
        assert_eq!(err.call_result(), CallResult::FunctionLoadFailed);
        assert_eq!(mock.stats().init_calls, 0);
    }

    #[test]
    fn test_resolve_after_close_fails() {
        let mock = MockHost::new(MockBehavior::Success);
        mock.register_method(ENTRY.type_name, ENTRY.method_name, managed_test as *const c_void);
        let bridge = mock.bridge();
        bridge.resolve_method(&ENTRY).unwrap();

        bridge.close();

        let err = bridge.resolve_method(&ENTRY).unwrap_err();
        assert_eq!(err.call_result(), CallResult::RuntimeInitFailed);
        assert_eq!(mock.stats().resolve_calls, 1);
    }
}
