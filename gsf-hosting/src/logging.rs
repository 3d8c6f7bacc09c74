//! File logging for the loader.
//!
//! The module lives inside someone else's process, so installation is
//! best-effort: an already installed global subscriber wins and an unwritable
//! log file only disables logging.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::settings::LoggingSettings;

/// Environment variable holding an `EnvFilter` directive that overrides the
/// configured level.
pub const LOG_ENV_VAR: &str = "GSF_LOG";

/// Install the file subscriber. Returns the log file path when this call
/// installed it, `None` when logging is disabled or another subscriber is
/// already in place.
pub fn init(settings: &LoggingSettings, root: &Path) -> Option<PathBuf> {
    if !settings.enabled {
        return None;
    }

    match try_init(settings, root) {
        Ok(installed) => installed,
        Err(e) => {
            eprintln!("gsfloader: logging disabled: {e:#}");
            None
        }
    }
}

fn try_init(settings: &LoggingSettings, root: &Path) -> Result<Option<PathBuf>> {
    use tracing_subscriber::fmt;

    let log_file = if settings.file.is_absolute() {
        settings.file.clone()
    } else {
        root.join(&settings.file)
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .with_context(|| format!("Failed to open log file {log_file:?}"))?;

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter(settings))
        .try_init()
        .is_ok();

    if !installed {
        return Ok(None);
    }

    info!("Tracing initialized to {:?}", log_file);
    Ok(Some(log_file))
}

fn filter(settings: &LoggingSettings) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_disabled_logging_creates_nothing() {
        let temp = TempDir::new().unwrap();
        let settings = LoggingSettings {
            enabled: false,
            ..LoggingSettings::default()
        };

        assert_eq!(init(&settings, temp.path()), None);
        assert!(!temp.path().join(&settings.file).exists());
    }

    #[test]
    fn test_unwritable_location_is_not_fatal() {
        let temp = TempDir::new().unwrap();
        let settings = LoggingSettings {
            file: PathBuf::from("missing-dir/nested/gsfloader.log"),
            ..LoggingSettings::default()
        };

        assert_eq!(init(&settings, temp.path()), None);
    }
}
