//! GoldSrc game-server exports.
//!
//! The engine looks these up by name after loading the module. Each one
//! relays to its static counterpart on `FrameworkInterop`; signatures follow
//! the engine's `eiface.h`.

#![allow(non_snake_case)]

use std::ffi::{c_char, c_int, c_void};

use gsf_hosting::ManagedMethod;

use crate::allocator;
use crate::boundary::relay_or_neutral;

pub const FRAMEWORK_INTEROP: &str = "GoldsrcFramework.FrameworkInterop, GoldsrcFramework";

pub const GIVE_FNPTRS_TO_DLL: ManagedMethod =
    ManagedMethod::new(FRAMEWORK_INTEROP, "GiveFnptrsToDll");
pub const GET_ENTITY_API: ManagedMethod = ManagedMethod::new(FRAMEWORK_INTEROP, "GetEntityAPI");
pub const GET_ENTITY_API2: ManagedMethod = ManagedMethod::new(FRAMEWORK_INTEROP, "GetEntityAPI2");
pub const GET_NEW_DLL_FUNCTIONS: ManagedMethod =
    ManagedMethod::new(FRAMEWORK_INTEROP, "GetNewDLLFunctions");
pub const GET_PRIVATE_DATA_ALLOCATOR: ManagedMethod =
    ManagedMethod::new(FRAMEWORK_INTEROP, "GetPrivateDataAllocator");

/// `void GiveFnptrsToDll(enginefuncs_t*, globalvars_t*)`
///
/// # Safety
///
/// Called by the engine with its function table and globals.
#[no_mangle]
pub unsafe extern "C" fn GiveFnptrsToDll(engfuncs: *mut c_void, globals: *mut c_void) {
    relay_or_neutral(&GIVE_FNPTRS_TO_DLL, |bridge| {
        bridge.forward_ptr_pair(&GIVE_FNPTRS_TO_DLL, engfuncs, globals)?;
        // The managed side holds the engine table from here on.
        allocator::initialize_once();
        Ok(())
    })
}

/// `int GetEntityAPI(DLL_FUNCTIONS*, int)`
///
/// # Safety
///
/// `table` must point to a `DLL_FUNCTIONS` the managed side may fill.
#[no_mangle]
pub unsafe extern "C" fn GetEntityAPI(table: *mut c_void, version: c_int) -> c_int {
    relay_or_neutral(&GET_ENTITY_API, |bridge| {
        bridge.forward_table_version(&GET_ENTITY_API, table, version)
    })
}

/// `int GetEntityAPI2(DLL_FUNCTIONS*, int*)`
///
/// # Safety
///
/// `table` and `version` must be valid for the managed side to read and write.
#[no_mangle]
pub unsafe extern "C" fn GetEntityAPI2(table: *mut c_void, version: *mut c_int) -> c_int {
    relay_or_neutral(&GET_ENTITY_API2, |bridge| {
        bridge.forward_table_version_ptr(&GET_ENTITY_API2, table, version)
    })
}

/// `int GetNewDLLFunctions(NEW_DLL_FUNCTIONS*, int*)`
///
/// # Safety
///
/// `table` and `version` must be valid for the managed side to read and write.
#[no_mangle]
pub unsafe extern "C" fn GetNewDLLFunctions(table: *mut c_void, version: *mut c_int) -> c_int {
    relay_or_neutral(&GET_NEW_DLL_FUNCTIONS, |bridge| {
        bridge.forward_table_version_ptr(&GET_NEW_DLL_FUNCTIONS, table, version)
    })
}

/// `void* GetPrivateDataAllocator(const char*)`
///
/// # Safety
///
/// `class_name` must be null or a NUL-terminated entity class name.
#[no_mangle]
pub unsafe extern "C" fn GetPrivateDataAllocator(class_name: *const c_char) -> *mut c_void {
    relay_or_neutral(&GET_PRIVATE_DATA_ALLOCATOR, |bridge| {
        bridge.forward_ptr_to_ptr(&GET_PRIVATE_DATA_ALLOCATOR, class_name as *mut c_void)
    })
}
