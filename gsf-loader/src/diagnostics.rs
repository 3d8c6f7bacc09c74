//! Smoke-test exports used to check resolution and argument pass-through
//! without a running engine.

#![allow(non_snake_case)]

use std::ffi::{c_int, c_void};

use gsf_hosting::ManagedMethod;

use crate::boundary::relay_or_neutral;

pub const F_METHOD: ManagedMethod = ManagedMethod::new("GoldsrcFramework.F, GoldsrcFramework", "F");
pub const TEST_METHOD: ManagedMethod =
    ManagedMethod::new("GoldsrcFramework.HostingTest, GoldsrcFramework", "Test");

/// # Safety
///
/// `pv` is passed to the managed side untouched.
#[no_mangle]
pub unsafe extern "C" fn F(pv: *mut c_void) {
    relay_or_neutral(&F_METHOD, |bridge| bridge.forward_ptr(&F_METHOD, pv))
}

/// # Safety
///
/// `p_int` must satisfy whatever the managed `Test` reads through it.
#[no_mangle]
pub unsafe extern "C" fn Test(p_int: *mut c_void) -> c_int {
    relay_or_neutral(&TEST_METHOD, |bridge| bridge.forward_ptr_to_int(&TEST_METHOD, p_int))
}
