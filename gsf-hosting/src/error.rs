use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Pipeline stage reached by a bridge operation.
///
/// Never crosses the native export boundary; exports translate anything other
/// than `Success` into their neutral return value and only log the code.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallResult {
    Success = 0,
    HostLoadFailed = 1,
    RuntimeInitFailed = 2,
    FunctionLoadFailed = 3,
    /// The forward itself failed after resolution, e.g. a panic unwound to
    /// the export boundary.
    CallFailed = 4,
}

impl CallResult {
    pub fn is_success(self) -> bool {
        self == CallResult::Success
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CallResult::Success => "Success",
            CallResult::HostLoadFailed => "HostFxr load failed",
            CallResult::RuntimeInitFailed => "Runtime initialization failed",
            CallResult::FunctionLoadFailed => "Function load failed",
            CallResult::CallFailed => "Function call failed",
        }
    }
}

impl fmt::Display for CallResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<T> From<&Result<T, HostError>> for CallResult {
    fn from(result: &Result<T, HostError>) -> Self {
        match result {
            Ok(_) => CallResult::Success,
            Err(e) => e.call_result(),
        }
    }
}

#[derive(Error, Debug)]
pub enum HostError {
    #[error("hostfxr could not be located (searched: {searched})")]
    HostNotFound { searched: String },

    #[error("Failed to load host library {}: {source}", path.display())]
    LibraryLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("Host library {} is missing export `{symbol}`", path.display())]
    MissingExport { path: PathBuf, symbol: &'static str },

    #[error("Runtime initialization failed for {} (status {status:#010x})", config.display())]
    RuntimeInit { config: PathBuf, status: i32 },

    #[error("Runtime delegate unavailable (status {status:#010x})")]
    DelegateUnavailable { status: i32 },

    #[error("Could not resolve {type_name}::{method_name} (status {status:#010x})")]
    FunctionLoad {
        type_name: String,
        method_name: String,
        status: i32,
    },

    #[error("Invalid host string {value:?}: contains an interior NUL")]
    InvalidString { value: String, stage: CallResult },

    #[error("Managed runtime unavailable: {0}")]
    Unavailable(CallResult),

    #[error("Managed runtime has been closed")]
    Closed,

    #[error("Forward panicked: {0}")]
    Panicked(String),
}

impl HostError {
    /// Stage of the pipeline this error belongs to.
    pub fn call_result(&self) -> CallResult {
        match self {
            HostError::HostNotFound { .. }
            | HostError::LibraryLoad { .. }
            | HostError::MissingExport { .. } => CallResult::HostLoadFailed,
            HostError::RuntimeInit { .. }
            | HostError::DelegateUnavailable { .. }
            | HostError::Closed => CallResult::RuntimeInitFailed,
            HostError::FunctionLoad { .. } => CallResult::FunctionLoadFailed,
            HostError::InvalidString { stage, .. } => *stage,
            HostError::Unavailable(result) => *result,
            HostError::Panicked(_) => CallResult::CallFailed,
        }
    }
}
