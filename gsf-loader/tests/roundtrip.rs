mod fixture;

use std::ffi::{c_char, c_int, c_void};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

use fixture::MockBehavior;
use gsf_hosting::forward::{PtrFn, PtrToIntFn, PtrToPtrFn, TableVersionFn, TableVersionPtrFn};
use gsfloader::diagnostics::{F_METHOD, TEST_METHOD};
use gsfloader::server::FRAMEWORK_INTEROP;

const INTERFACE_VERSION: c_int = 138;

static F_ARG: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn managed_test(p_int: *mut c_void) -> c_int {
    *(p_int as *const c_int)
}

unsafe extern "C" fn managed_f(pv: *mut c_void) {
    F_ARG.store(pv as usize, Ordering::SeqCst);
}

unsafe extern "C" fn managed_get_entity_api(table: *mut c_void, version: c_int) -> c_int {
    (!table.is_null() && version == INTERFACE_VERSION) as c_int
}

unsafe extern "C" fn managed_get_entity_api2(table: *mut c_void, version: *mut c_int) -> c_int {
    if table.is_null() || *version != INTERFACE_VERSION {
        *version = INTERFACE_VERSION;
        return 0;
    }
    1
}

unsafe extern "C" fn managed_allocator(class_name: *mut c_void) -> *mut c_void {
    // Echo the class name back as the "allocator" handle.
    class_name
}

fn register_all() {
    let mock = fixture::global_mock(MockBehavior::Success);
    mock.register_method(
        TEST_METHOD.type_name,
        TEST_METHOD.method_name,
        managed_test as PtrToIntFn as *const c_void,
    );
    mock.register_method(
        F_METHOD.type_name,
        F_METHOD.method_name,
        managed_f as PtrFn as *const c_void,
    );
    mock.register_method(
        FRAMEWORK_INTEROP,
        "GetEntityAPI",
        managed_get_entity_api as TableVersionFn as *const c_void,
    );
    mock.register_method(
        FRAMEWORK_INTEROP,
        "GetEntityAPI2",
        managed_get_entity_api2 as TableVersionPtrFn as *const c_void,
    );
    mock.register_method(
        FRAMEWORK_INTEROP,
        "GetPrivateDataAllocator",
        managed_allocator as PtrToPtrFn as *const c_void,
    );
}

#[test]
fn test_export_returns_dereferenced_value() {
    register_all();

    let mut value = 0xAABB_FFDD_u32 as c_int;
    let result = unsafe { gsfloader::Test(&mut value as *mut c_int as *mut c_void) };

    assert_eq!(result as u32, 0xAABB_FFDD);
}

#[test]
fn test_void_export_passes_pointer_through() {
    register_all();

    let mut payload = [0u8; 4];
    let pv = payload.as_mut_ptr() as *mut c_void;
    unsafe { gsfloader::F(pv) };

    assert_eq!(F_ARG.load(Ordering::SeqCst), pv as usize);
}

#[test]
fn test_entity_api_versions() {
    register_all();
    let mut table = [0usize; 64];
    let table_ptr = table.as_mut_ptr() as *mut c_void;

    assert_eq!(unsafe { gsfloader::GetEntityAPI(table_ptr, INTERFACE_VERSION) }, 1);
    assert_eq!(unsafe { gsfloader::GetEntityAPI(table_ptr, 1) }, 0);

    let mut version = INTERFACE_VERSION;
    assert_eq!(unsafe { gsfloader::GetEntityAPI2(table_ptr, &mut version) }, 1);

    // A version mismatch is reported back through the out-parameter.
    let mut version = 1;
    assert_eq!(unsafe { gsfloader::GetEntityAPI2(table_ptr, &mut version) }, 0);
    assert_eq!(version, INTERFACE_VERSION);
}

#[test]
fn test_pointer_export_returns_managed_pointer() {
    register_all();
    let class_name = b"player\0";

    let handle =
        unsafe { gsfloader::GetPrivateDataAllocator(class_name.as_ptr() as *const c_char) };
    assert_eq!(handle as usize, class_name.as_ptr() as usize);
}

#[test]
fn test_unregistered_export_is_inert() {
    register_all();
    let mut version = INTERFACE_VERSION;

    let result = unsafe { gsfloader::GetNewDLLFunctions(ptr::null_mut(), &mut version) };

    assert_eq!(result, 0);
    assert_eq!(version, INTERFACE_VERSION);
}
