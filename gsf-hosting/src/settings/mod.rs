pub mod config;
pub mod manager;


pub use config::{HostSettings, LoaderSettings, LoggingSettings, RuntimeSettings};
pub use manager::SettingsManager;
