pub mod error;
pub mod forward;
pub mod host;
pub mod logging;
pub mod paths;
pub mod resolver;
pub mod runtime;
pub mod settings;

pub use error::{CallResult, HostError};
pub use forward::{or_neutral, Neutral};
pub use host::{HostProvider, SystemHost};
pub use paths::HostPaths;
pub use resolver::{ManagedMethod, ResolvedMethod};
pub use runtime::{shutdown, RuntimeBridge, RuntimeState};
pub use settings::{LoaderSettings, SettingsManager};
