//! In-process stand-in for hostfxr.
//!
//! `MockHost` hands the bridge real `extern` function pointers, so the whole
//! raw calling path (string encoding, out-parameters, handle ownership) runs
//! under test without a .NET installation. The fakes find their state through
//! a registry keyed by the mock's root directory name, which appears in every
//! path the bridge passes back in.

use std::collections::HashMap;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use std::time::Duration;

use super::fxr::{
    char_t, hostfxr_handle, read_host_string, status, LoadAssemblyAndGetFunctionPointerFn,
    CLOSE_SYMBOL, HDT_LOAD_ASSEMBLY_AND_GET_FUNCTION_POINTER, UNMANAGEDCALLERSONLY_METHOD,
};
use super::{HostFxr, HostFxrExports, HostProvider};
use crate::error::HostError;
use crate::paths::HostPaths;
use crate::runtime::RuntimeBridge;
use crate::settings::RuntimeSettings;

/// Which stage of the hosting pipeline the mock should fail at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MockBehavior {
    #[default]
    Success,
    /// `locate` finds no launcher.
    HostMissing,
    /// The launcher is found but lacks a root export.
    LoadFails,
    /// `hostfxr_initialize_for_runtime_config` fails without a handle.
    InitFails,
    /// Initialization fails but still hands out a handle that must be closed.
    InitFailsWithHandle,
    /// The runtime starts but refuses the loader delegate.
    DelegateUnavailable,
    /// Every resolution reports the managed assembly as missing.
    AssemblyMissing,
}

/// Snapshot of how often each fake was entered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockStats {
    pub locate_calls: usize,
    pub load_calls: usize,
    pub init_calls: usize,
    pub delegate_calls: usize,
    pub resolve_calls: usize,
    pub close_calls: usize,
    pub open_contexts: usize,
}

struct MockState {
    key: String,
    behavior: Mutex<MockBehavior>,
    init_delay: Mutex<Duration>,
    methods: Mutex<HashMap<(String, String), usize>>,
    locate_calls: AtomicUsize,
    load_calls: AtomicUsize,
    init_calls: AtomicUsize,
    delegate_calls: AtomicUsize,
    resolve_calls: AtomicUsize,
    close_calls: AtomicUsize,
    open_contexts: AtomicUsize,
}

impl Drop for MockState {
    fn drop(&mut self) {
        lock(registry()).remove(&self.key);
    }
}

/// Fake launcher provider for tests.
#[derive(Clone)]
pub struct MockHost {
    state: Arc<MockState>,
}

impl MockHost {
    pub fn new(behavior: MockBehavior) -> Self {
        static NEXT_ID: AtomicUsize = AtomicUsize::new(0);
        let key = format!(
            "mock-host-{}-{}",
            std::process::id(),
            NEXT_ID.fetch_add(1, Ordering::Relaxed)
        );

        let state = Arc::new(MockState {
            key: key.clone(),
            behavior: Mutex::new(behavior),
            init_delay: Mutex::new(Duration::ZERO),
            methods: Mutex::new(HashMap::new()),
            locate_calls: AtomicUsize::new(0),
            load_calls: AtomicUsize::new(0),
            init_calls: AtomicUsize::new(0),
            delegate_calls: AtomicUsize::new(0),
            resolve_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            open_contexts: AtomicUsize::new(0),
        });
        lock(registry()).insert(key, Arc::downgrade(&state));

        Self { state }
    }

    /// Module directory the mock pretends to live in. Nothing is created on
    /// disk.
    pub fn root(&self) -> PathBuf {
        std::env::temp_dir().join("gsf-mock").join(&self.state.key)
    }

    pub fn paths(&self) -> HostPaths {
        HostPaths::new(self.root(), &RuntimeSettings::default())
    }

    /// A bridge wired to this mock.
    pub fn bridge(&self) -> RuntimeBridge {
        RuntimeBridge::new(self.paths(), Box::new(self.clone()))
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        *lock(&self.state.behavior) = behavior;
    }

    /// Makes every runtime initialization block for `delay`.
    pub fn set_init_delay(&self, delay: Duration) {
        *lock(&self.state.init_delay) = delay;
    }

    /// Makes `type_name::method_name` resolve to `target`.
    pub fn register_method(&self, type_name: &str, method_name: &str, target: *const c_void) {
        lock(&self.state.methods).insert(
            (type_name.to_string(), method_name.to_string()),
            target as usize,
        );
    }

    pub fn stats(&self) -> MockStats {
        let state = &self.state;
        MockStats {
            locate_calls: state.locate_calls.load(Ordering::SeqCst),
            load_calls: state.load_calls.load(Ordering::SeqCst),
            init_calls: state.init_calls.load(Ordering::SeqCst),
            delegate_calls: state.delegate_calls.load(Ordering::SeqCst),
            resolve_calls: state.resolve_calls.load(Ordering::SeqCst),
            close_calls: state.close_calls.load(Ordering::SeqCst),
            open_contexts: state.open_contexts.load(Ordering::SeqCst),
        }
    }

    fn behavior(&self) -> MockBehavior {
        self.state.behavior()
    }
}

impl HostProvider for MockHost {
    fn locate(&self) -> Result<PathBuf, HostError> {
        self.state.locate_calls.fetch_add(1, Ordering::SeqCst);
        if self.behavior() == MockBehavior::HostMissing {
            return Err(HostError::HostNotFound {
                searched: self.root().display().to_string(),
            });
        }
        Ok(self.root().join("libhostfxr-mock"))
    }

    fn load(&self, path: &Path) -> Result<HostFxr, HostError> {
        self.state.load_calls.fetch_add(1, Ordering::SeqCst);
        if self.behavior() == MockBehavior::LoadFails {
            return Err(HostError::MissingExport {
                path: path.to_path_buf(),
                symbol: CLOSE_SYMBOL,
            });
        }

        let exports = HostFxrExports {
            initialize_for_runtime_config: mock_initialize_for_runtime_config,
            get_runtime_delegate: mock_get_runtime_delegate,
            close: mock_close,
        };
        Ok(HostFxr::from_exports(exports, path))
    }
}

impl MockState {
    fn behavior(&self) -> MockBehavior {
        lock(&self.behavior).clone()
    }
}

fn registry() -> &'static Mutex<HashMap<String, Weak<MockState>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, Weak<MockState>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

// The fakes run on the far side of an FFI boundary and must not panic.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State of the mock whose root directory contains `path`.
unsafe fn state_for(path: *const char_t) -> Option<Arc<MockState>> {
    let path = read_host_string(path)?;
    let key = Path::new(&path).parent()?.file_name()?.to_str()?.to_string();
    let registry = lock(registry());
    registry.get(&key)?.upgrade()
}

fn open_context(state: Arc<MockState>) -> hostfxr_handle {
    state.open_contexts.fetch_add(1, Ordering::SeqCst);
    Arc::into_raw(state) as hostfxr_handle
}

unsafe extern "C" fn mock_initialize_for_runtime_config(
    runtime_config_path: *const char_t,
    _parameters: *const c_void,
    host_context_handle: *mut hostfxr_handle,
) -> i32 {
    let Some(state) = state_for(runtime_config_path) else {
        return status::INVALID_ARG_FAILURE;
    };
    state.init_calls.fetch_add(1, Ordering::SeqCst);

    let delay = *lock(&state.init_delay);
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }

    match state.behavior() {
        MockBehavior::InitFails => status::INVALID_CONFIG_FILE,
        MockBehavior::InitFailsWithHandle => {
            *host_context_handle = open_context(state);
            status::INVALID_CONFIG_FILE
        }
        _ => {
            *host_context_handle = open_context(state);
            status::SUCCESS
        }
    }
}

unsafe extern "C" fn mock_get_runtime_delegate(
    host_context_handle: hostfxr_handle,
    delegate_type: i32,
    delegate: *mut *mut c_void,
) -> i32 {
    if host_context_handle.is_null() {
        return status::HOST_INVALID_STATE;
    }
    let state = &*(host_context_handle as *const MockState);
    state.delegate_calls.fetch_add(1, Ordering::SeqCst);

    if delegate_type != HDT_LOAD_ASSEMBLY_AND_GET_FUNCTION_POINTER {
        return status::INVALID_ARG_FAILURE;
    }
    if state.behavior() == MockBehavior::DelegateUnavailable {
        return status::HOST_INVALID_STATE;
    }

    *delegate = mock_load_assembly_and_get_function_pointer as LoadAssemblyAndGetFunctionPointerFn
        as *mut c_void;
    status::SUCCESS
}

unsafe extern "C" fn mock_close(host_context_handle: hostfxr_handle) -> i32 {
    if host_context_handle.is_null() {
        return status::INVALID_ARG_FAILURE;
    }
    let state = Arc::from_raw(host_context_handle as *const MockState);
    state.close_calls.fetch_add(1, Ordering::SeqCst);
    state.open_contexts.fetch_sub(1, Ordering::SeqCst);
    status::SUCCESS
}

unsafe extern "system" fn mock_load_assembly_and_get_function_pointer(
    assembly_path: *const char_t,
    type_name: *const char_t,
    method_name: *const char_t,
    delegate_type_name: *const char_t,
    _reserved: *mut c_void,
    delegate: *mut *mut c_void,
) -> i32 {
    let Some(state) = state_for(assembly_path) else {
        return status::FILE_NOT_FOUND;
    };
    state.resolve_calls.fetch_add(1, Ordering::SeqCst);

    if state.behavior() == MockBehavior::AssemblyMissing {
        return status::FILE_NOT_FOUND;
    }
    if delegate_type_name != UNMANAGEDCALLERSONLY_METHOD {
        return status::INVALID_ARG_FAILURE;
    }

    let (Some(type_name), Some(method_name)) =
        (read_host_string(type_name), read_host_string(method_name))
    else {
        return status::INVALID_ARG_FAILURE;
    };

    let found = lock(&state.methods)
        .get(&(type_name, method_name))
        .copied();
    match found {
        Some(address) => {
            *delegate = address as *mut c_void;
            status::SUCCESS
        }
        None => status::MISSING_METHOD,
    }
}
