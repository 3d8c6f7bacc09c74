mod fixture;

use std::ffi::{c_int, c_void};

use fixture::MockBehavior;

#[test]
fn test_exports_are_inert_without_assembly() {
    let mock = fixture::global_mock(MockBehavior::AssemblyMissing);
    let mut table = [0usize; 64];
    let table_ptr = table.as_mut_ptr() as *mut c_void;

    assert_eq!(unsafe { gsfloader::GetEntityAPI(table_ptr, 138) }, 0);

    let mut version: c_int = 138;
    assert_eq!(unsafe { gsfloader::GetEntityAPI2(table_ptr, &mut version) }, 0);
    assert_eq!(version, 138);

    // Still running: a missing assembly fails each resolution, not the runtime.
    assert_eq!(unsafe { gsfloader::GetEntityAPI(table_ptr, 138) }, 0);
    let stats = mock.stats();
    assert_eq!(stats.init_calls, 1);
    assert_eq!(stats.resolve_calls, 3);
}
