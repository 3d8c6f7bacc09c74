use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_RUNTIME_CONFIG_FILE: &str = "GoldsrcFramework.runtimeconfig.json";
pub const DEFAULT_ASSEMBLY_FILE: &str = "GoldsrcFramework.dll";
pub const DEFAULT_LOG_FILE: &str = "gsfloader.log";

/// Names of the managed files that sit beside the native module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// Host configuration handed verbatim to `hostfxr_initialize_for_runtime_config`
    #[serde(default = "default_runtime_config_file")]
    pub config_file: PathBuf,

    /// Managed assembly containing every export target
    #[serde(default = "default_assembly_file")]
    pub assembly_file: PathBuf,
}

fn default_runtime_config_file() -> PathBuf {
    PathBuf::from(DEFAULT_RUNTIME_CONFIG_FILE)
}

fn default_assembly_file() -> PathBuf {
    PathBuf::from(DEFAULT_ASSEMBLY_FILE)
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            config_file: default_runtime_config_file(),
            assembly_file: default_assembly_file(),
        }
    }
}

/// Overrides for host launcher discovery. Both are optional; when unset the
/// locator searches the environment and the default install locations.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct HostSettings {
    /// Exact path of the hostfxr library to load
    #[serde(default)]
    pub hostfxr_path: Option<PathBuf>,

    /// A dotnet install root searched before any other
    #[serde(default)]
    pub dotnet_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingSettings {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// Filter directive used when `GSF_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Loader settings, read from `gsfloader.toml` beside the native module.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LoaderSettings {
    #[serde(default)]
    pub runtime: RuntimeSettings,

    #[serde(default)]
    pub host: HostSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl LoaderSettings {
    /// Resolves every relative path against the module directory.
    pub fn resolve_paths(mut self, root: &Path) -> Self {
        self.runtime.config_file = anchor(root, self.runtime.config_file);
        self.runtime.assembly_file = anchor(root, self.runtime.assembly_file);
        self.host.hostfxr_path = self.host.hostfxr_path.map(|p| anchor(root, p));
        self.host.dotnet_root = self.host.dotnet_root.map(|p| anchor(root, p));
        self.logging.file = anchor(root, self.logging.file);
        self
    }
}

fn anchor(root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}
