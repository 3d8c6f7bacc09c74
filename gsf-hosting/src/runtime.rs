//! Managed runtime lifecycle.
//!
//! One `RuntimeBridge` owns at most one live runtime context. Its lifecycle is
//! `Uninitialized -> Initializing -> Ready -> Closed`; a failed start drops
//! back to `Uninitialized` and may be retried, `Closed` is terminal.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::error::{CallResult, HostError};
use crate::host::fxr::{HostString, LoadAssemblyAndGetFunctionPointerFn};
use crate::host::{HostFxr, HostProvider, RuntimeContext, SystemHost};
use crate::logging;
use crate::paths::{self, HostPaths};
use crate::settings::{LoaderSettings, SettingsManager};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Uninitialized = 0,
    Initializing = 1,
    Ready = 2,
    Closed = 3,
}

impl RuntimeState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RuntimeState::Initializing,
            2 => RuntimeState::Ready,
            3 => RuntimeState::Closed,
            _ => RuntimeState::Uninitialized,
        }
    }
}

/// Everything a ready runtime needs to resolve managed methods.
pub(crate) struct ReadyRuntime {
    // Field order is drop order: the context must be closed while the
    // launcher library is still mapped.
    _context: RuntimeContext,
    pub(crate) load_assembly: LoadAssemblyAndGetFunctionPointerFn,
    pub(crate) assembly: HostString,
    host: HostFxr,
}

enum Lifecycle {
    Uninitialized { last_failure: Option<CallResult> },
    Ready(ReadyRuntime),
    Closed,
}

/// Owner of the process's managed runtime.
pub struct RuntimeBridge {
    paths: HostPaths,
    provider: Box<dyn HostProvider>,
    lifecycle: RwLock<Lifecycle>,
    state: AtomicU8,
    /// Number of start attempts begun.
    started: AtomicU64,
}

static GLOBAL: OnceLock<RuntimeBridge> = OnceLock::new();

impl RuntimeBridge {
    pub fn new(paths: HostPaths, provider: Box<dyn HostProvider>) -> Self {
        Self {
            paths,
            provider,
            lifecycle: RwLock::new(Lifecycle::Uninitialized { last_failure: None }),
            state: AtomicU8::new(RuntimeState::Uninitialized as u8),
            started: AtomicU64::new(0),
        }
    }

    /// Builds the bridge for the module this crate is linked into: settings
    /// and managed files are taken from the module's directory, logging is
    /// installed, and the installed .NET host is used.
    pub fn from_environment() -> Self {
        let root = paths::module_dir();
        let (settings, load_error) = match SettingsManager::from_module_dir(&root) {
            Ok(manager) => (manager.into_settings(), None),
            Err(e) => (LoaderSettings::default().resolve_paths(&root), Some(e)),
        };

        logging::init(&settings.logging, &root);
        if let Some(e) = load_error {
            warn!("Using default settings: {:#}", e);
        }

        let paths = HostPaths::new(&root, &settings.runtime);
        info!(
            "Runtime bridge rooted at {:?} (config {:?}, assembly {:?})",
            paths.root(),
            paths.config(),
            paths.assembly()
        );
        Self::new(paths, Box::new(SystemHost::new(&settings.host)))
    }

    /// The process-wide bridge, built from the environment on first use.
    pub fn global() -> &'static RuntimeBridge {
        GLOBAL.get_or_init(Self::from_environment)
    }

    /// Installs `bridge` as the process-wide instance. Fails, handing the
    /// bridge back, if one was already installed or built.
    pub fn install_global(bridge: RuntimeBridge) -> Result<&'static RuntimeBridge, RuntimeBridge> {
        GLOBAL.set(bridge)?;
        Ok(Self::global())
    }

    pub fn paths(&self) -> &HostPaths {
        &self.paths
    }

    pub fn state(&self) -> RuntimeState {
        RuntimeState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Starts the managed runtime unless it is already running.
    ///
    /// Callers that queued behind an in-flight attempt adopt its outcome
    /// instead of starting another one; a caller arriving after a failed
    /// attempt starts a fresh one.
    pub fn initialize(&self) -> CallResult {
        if self.state() == RuntimeState::Ready {
            return CallResult::Success;
        }

        let ticket = self.started.load(Ordering::Acquire);
        let arrived_mid_attempt = self.state() == RuntimeState::Initializing;
        let mut lifecycle = self.write();

        match &*lifecycle {
            Lifecycle::Ready(_) => return CallResult::Success,
            Lifecycle::Closed => {
                debug!("Initialize requested after the runtime was closed");
                return CallResult::RuntimeInitFailed;
            }
            Lifecycle::Uninitialized { last_failure } => {
                let attempted_since = self.started.load(Ordering::Acquire) != ticket;
                if attempted_since || arrived_mid_attempt {
                    if let Some(result) = last_failure {
                        return *result;
                    }
                }
            }
        }

        // A caller that sees the bumped count also sees `Initializing`.
        self.set_state(RuntimeState::Initializing);
        self.started.fetch_add(1, Ordering::AcqRel);
        let attempt = self.start();

        match attempt {
            Ok(ready) => {
                info!("Managed runtime ready (hostfxr {:?})", ready.host.origin());
                *lifecycle = Lifecycle::Ready(ready);
                self.set_state(RuntimeState::Ready);
                CallResult::Success
            }
            Err(e) => {
                let result = e.call_result();
                warn!("Managed runtime failed to start: {} [{}]", e, result);
                *lifecycle = Lifecycle::Uninitialized {
                    last_failure: Some(result),
                };
                self.set_state(RuntimeState::Uninitialized);
                result
            }
        }
    }

    fn start(&self) -> Result<ReadyRuntime, HostError> {
        let assembly = HostString::from_path(self.paths.assembly(), CallResult::RuntimeInitFailed)?;

        let fxr_path = self.provider.locate()?;
        let host = self.provider.load(&fxr_path)?;
        let context = host.initialize_for_runtime_config(self.paths.config())?;
        let load_assembly = context.load_assembly_delegate(host.exports().get_runtime_delegate)?;

        Ok(ReadyRuntime {
            _context: context,
            load_assembly,
            assembly,
            host,
        })
    }

    /// Closes the runtime context and unloads the launcher. Idempotent; the
    /// bridge cannot be started again afterwards.
    pub fn close(&self) {
        let mut lifecycle = self.write();
        let previous = std::mem::replace(&mut *lifecycle, Lifecycle::Closed);
        self.set_state(RuntimeState::Closed);

        if let Lifecycle::Ready(ready) = previous {
            info!("Closing managed runtime (hostfxr {:?})", ready.host.origin());
            drop(ready);
        }
    }

    /// Runs `f` against the ready runtime, starting it first if needed.
    pub(crate) fn with_ready<R>(&self, f: impl FnOnce(&ReadyRuntime) -> R) -> Result<R, HostError> {
        let started = self.initialize();
        if !started.is_success() {
            return Err(HostError::Unavailable(started));
        }

        let lifecycle = self.read();
        match &*lifecycle {
            Lifecycle::Ready(ready) => Ok(f(ready)),
            Lifecycle::Closed => Err(HostError::Closed),
            Lifecycle::Uninitialized { .. } => {
                Err(HostError::Unavailable(CallResult::RuntimeInitFailed))
            }
        }
    }

    fn set_state(&self, state: RuntimeState) {
        self.state.store(state as u8, Ordering::Release);
    }

    // Foreign calls never leave the lifecycle half-written, so a poisoned
    // lock still guards consistent state.
    fn read(&self) -> RwLockReadGuard<'_, Lifecycle> {
        self.lifecycle.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Lifecycle> {
        self.lifecycle.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for RuntimeBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeBridge")
            .field("paths", &self.paths)
            .field("state", &self.state())
            .finish()
    }
}

/// Closes the process-wide runtime if one was ever built.
pub fn shutdown() {
    if let Some(bridge) = GLOBAL.get() {
        bridge.close();
    }
}
