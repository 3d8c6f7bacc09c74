//! Host launcher discovery.
//!
//! Mirrors the `get_hostfxr_path` contract: explicit overrides, the
//! architecture specific and generic `DOTNET_ROOT` variables, the registered
//! install location and finally the platform default install directory. Each
//! candidate root contributes its newest `host/fxr/<version>` library.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::HostError;
use crate::settings::HostSettings;

#[cfg(windows)]
pub const HOSTFXR_LIBRARY_NAME: &str = "hostfxr.dll";
#[cfg(target_os = "macos")]
pub const HOSTFXR_LIBRARY_NAME: &str = "libhostfxr.dylib";
#[cfg(all(unix, not(target_os = "macos")))]
pub const HOSTFXR_LIBRARY_NAME: &str = "libhostfxr.so";

/// Finds the hostfxr library for the current process architecture.
#[derive(Debug, Clone, Default)]
pub struct HostLocator {
    explicit: Option<PathBuf>,
    roots: Vec<PathBuf>,
}

impl HostLocator {
    /// Locator that searches the configured overrides and then this machine.
    pub fn from_settings(settings: &HostSettings) -> Self {
        let mut roots = Vec::new();
        if let Some(root) = &settings.dotnet_root {
            roots.push(root.clone());
        }
        roots.extend(system_roots());

        Self {
            explicit: settings.hostfxr_path.clone(),
            roots,
        }
    }

    /// Locator restricted to the given install roots, searched in order.
    pub fn with_roots(roots: Vec<PathBuf>) -> Self {
        Self {
            explicit: None,
            roots,
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn search(&self) -> Result<PathBuf, HostError> {
        if let Some(explicit) = &self.explicit {
            if explicit.is_file() {
                debug!("Using configured hostfxr at {:?}", explicit);
                return Ok(explicit.clone());
            }
            debug!("Configured hostfxr {:?} does not exist, searching", explicit);
        }

        for root in &self.roots {
            if let Some(found) = newest_fxr(root) {
                debug!("Found hostfxr at {:?}", found);
                return Ok(found);
            }
        }

        let mut searched: Vec<String> = self
            .explicit
            .iter()
            .chain(self.roots.iter())
            .map(|p| p.display().to_string())
            .collect();
        if searched.is_empty() {
            searched.push("<no candidates>".to_string());
        }
        Err(HostError::HostNotFound {
            searched: searched.join(", "),
        })
    }
}

/// The newest `host/fxr/<version>/<library>` under an install root.
fn newest_fxr(root: &Path) -> Option<PathBuf> {
    let fxr_dir = root.join("host").join("fxr");
    let entries = std::fs::read_dir(&fxr_dir).ok()?;

    entries
        .flatten()
        .filter_map(|entry| {
            let version = FxrVersion::parse(entry.file_name().to_str()?)?;
            let library = entry.path().join(HOSTFXR_LIBRARY_NAME);
            library.is_file().then_some((version, library))
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, library)| library)
}

/// Process architecture in the naming used by dotnet install layouts.
pub fn dotnet_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "x64",
        "x86" => "x86",
        "aarch64" => "arm64",
        "arm" => "arm",
        "s390x" => "s390x",
        "powerpc64" => "ppc64le",
        "loongarch64" => "loongarch64",
        other => other,
    }
}

fn system_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    let arch = dotnet_arch();

    let arch_var = format!("DOTNET_ROOT_{}", arch.to_uppercase());
    if let Some(root) = env_path(&arch_var) {
        roots.push(root);
    }
    if cfg!(windows) && arch == "x86" {
        if let Some(root) = env_path("DOTNET_ROOT(x86)") {
            roots.push(root);
        }
    }
    if let Some(root) = env_path("DOTNET_ROOT") {
        roots.push(root);
    }

    roots.extend(registered_install_locations(arch));
    roots.extend(default_install_locations(arch));
    roots
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(unix)]
fn registered_install_locations(arch: &str) -> Vec<PathBuf> {
    let etc = Path::new("/etc/dotnet");
    [
        etc.join(format!("install_location_{arch}")),
        etc.join("install_location"),
    ]
    .iter()
    .filter_map(|file| read_install_location(file))
    .collect()
}

// TODO: read HKLM\SOFTWARE\dotnet\Setup\InstalledVersions\<arch>\InstallLocation.
#[cfg(windows)]
fn registered_install_locations(_arch: &str) -> Vec<PathBuf> {
    Vec::new()
}

/// First non-empty line of an `install_location` file.
#[cfg_attr(windows, allow(dead_code))]
fn read_install_location(file: &Path) -> Option<PathBuf> {
    let contents = std::fs::read_to_string(file).ok()?;
    contents
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(PathBuf::from)
}

#[cfg(windows)]
fn default_install_locations(arch: &str) -> Vec<PathBuf> {
    let var = if arch == "x86" {
        "ProgramFiles(x86)"
    } else {
        "ProgramFiles"
    };
    env_path(var)
        .map(|program_files| vec![program_files.join("dotnet")])
        .unwrap_or_default()
}

#[cfg(target_os = "macos")]
fn default_install_locations(_arch: &str) -> Vec<PathBuf> {
    vec![PathBuf::from("/usr/local/share/dotnet")]
}

#[cfg(all(unix, not(target_os = "macos")))]
fn default_install_locations(_arch: &str) -> Vec<PathBuf> {
    vec![
        PathBuf::from("/usr/share/dotnet"),
        PathBuf::from("/usr/lib/dotnet"),
    ]
}

/// `major.minor.patch[-prerelease]` directory name under `host/fxr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FxrVersion {
    major: u64,
    minor: u64,
    patch: u64,
    prerelease: Option<String>,
}

impl FxrVersion {
    pub fn parse(name: &str) -> Option<Self> {
        let (core, prerelease) = match name.split_once('-') {
            Some((core, pre)) => (core, Some(pre.to_string())),
            None => (name, None),
        };

        let mut parts = core.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let patch = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }

        Some(Self {
            major,
            minor,
            patch,
            prerelease,
        })
    }
}

impl Ord for FxrVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => compare_prerelease(a, b),
            })
    }
}

/// SemVer precedence of two pre-release tags: dot-separated identifiers,
/// numeric ones compared as numbers and ranked below alphanumeric ones, a
/// shorter tag ranking below a longer tag it prefixes.
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

impl PartialOrd for FxrVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallResult;
    use rstest::rstest;
    use std::fs;
    use tempfile::TempDir;

    fn install_fxr(root: &Path, version: &str) -> PathBuf {
        let dir = root.join("host").join("fxr").join(version);
        fs::create_dir_all(&dir).unwrap();
        let library = dir.join(HOSTFXR_LIBRARY_NAME);
        fs::write(&library, b"").unwrap();
        library
    }

    #[rstest]
    #[case("8.0.4", "8.0.11")]
    #[case("6.0.36", "8.0.0")]
    #[case("9.0.0-rc.2", "9.0.0")]
    #[case("9.0.0-preview.1", "9.0.0-rc.1")]
    #[case("10.0.0-preview.2", "10.0.0-preview.10")]
    #[case("10.0.0-rc.1", "10.0.0-rc.1.24451.1")]
    #[case("10.0.0-1", "10.0.0-alpha")]
    fn test_version_ordering(#[case] older: &str, #[case] newer: &str) {
        let older = FxrVersion::parse(older).unwrap();
        let newer = FxrVersion::parse(newer).unwrap();
        assert!(older < newer);
    }

    #[rstest]
    #[case("")]
    #[case("8.0")]
    #[case("8.0.1.2")]
    #[case("latest")]
    fn test_invalid_versions(#[case] name: &str) {
        assert_eq!(FxrVersion::parse(name), None);
    }

    #[test]
    fn test_search_picks_newest_version() {
        let temp = TempDir::new().unwrap();
        install_fxr(temp.path(), "6.0.36");
        let newest = install_fxr(temp.path(), "8.0.11");
        install_fxr(temp.path(), "8.0.4");
        install_fxr(temp.path(), "8.0.11-rc.2");

        let locator = HostLocator::with_roots(vec![temp.path().to_path_buf()]);
        assert_eq!(locator.search().unwrap(), newest);
    }

    #[test]
    fn test_search_prefers_newer_prerelease_over_older_release() {
        let temp = TempDir::new().unwrap();
        install_fxr(temp.path(), "8.0.11");
        let newest = install_fxr(temp.path(), "9.0.0-rc.2");

        let locator = HostLocator::with_roots(vec![temp.path().to_path_buf()]);
        assert_eq!(locator.search().unwrap(), newest);
    }

    #[test]
    fn test_search_orders_preview_numbers_numerically() {
        let temp = TempDir::new().unwrap();
        install_fxr(temp.path(), "10.0.0-preview.2");
        let newest = install_fxr(temp.path(), "10.0.0-preview.10");

        let locator = HostLocator::with_roots(vec![temp.path().to_path_buf()]);
        assert_eq!(locator.search().unwrap(), newest);
    }

    #[test]
    fn test_search_skips_version_dirs_without_library() {
        let temp = TempDir::new().unwrap();
        let expected = install_fxr(temp.path(), "7.0.20");
        fs::create_dir_all(temp.path().join("host").join("fxr").join("8.0.0")).unwrap();

        let locator = HostLocator::with_roots(vec![temp.path().to_path_buf()]);
        assert_eq!(locator.search().unwrap(), expected);
    }

    #[test]
    fn test_first_root_with_library_wins() {
        let empty = TempDir::new().unwrap();
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let expected = install_fxr(first.path(), "6.0.0");
        install_fxr(second.path(), "8.0.0");

        let locator = HostLocator::with_roots(vec![
            empty.path().to_path_buf(),
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        assert_eq!(locator.search().unwrap(), expected);
    }

    #[test]
    fn test_explicit_path_overrides_roots() {
        let temp = TempDir::new().unwrap();
        install_fxr(temp.path(), "8.0.0");
        let explicit = temp.path().join("custom-hostfxr");
        fs::write(&explicit, b"").unwrap();

        let settings = HostSettings {
            hostfxr_path: Some(explicit.clone()),
            dotnet_root: Some(temp.path().to_path_buf()),
        };
        let locator = HostLocator::from_settings(&settings);
        assert_eq!(locator.search().unwrap(), explicit);
    }

    #[test]
    fn test_configured_root_is_searched_first() {
        let temp = TempDir::new().unwrap();
        let settings = HostSettings {
            hostfxr_path: None,
            dotnet_root: Some(temp.path().to_path_buf()),
        };

        let locator = HostLocator::from_settings(&settings);
        assert_eq!(locator.roots().first(), Some(&temp.path().to_path_buf()));
    }

    #[test]
    fn test_not_found_is_host_load_failure() {
        let temp = TempDir::new().unwrap();
        let locator = HostLocator::with_roots(vec![temp.path().to_path_buf()]);

        let err = locator.search().unwrap_err();
        assert_eq!(err.call_result(), CallResult::HostLoadFailed);
        assert!(err.to_string().contains(&temp.path().display().to_string()));
    }

    #[test]
    fn test_install_location_file_first_line() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("install_location");
        fs::write(&file, "\n  /opt/dotnet  \n/ignored\n").unwrap();

        assert_eq!(
            read_install_location(&file),
            Some(PathBuf::from("/opt/dotnet"))
        );
    }
}
