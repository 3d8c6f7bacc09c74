use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::settings::RuntimeSettings;

/// Files the bridge hands to the managed host, all anchored at the directory
/// of the native module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPaths {
    root: PathBuf,
    config: PathBuf,
    assembly: PathBuf,
}

impl HostPaths {
    pub fn new(root: impl Into<PathBuf>, runtime: &RuntimeSettings) -> Self {
        let root = root.into();
        let config = root.join(&runtime.config_file);
        let assembly = root.join(&runtime.assembly_file);
        Self {
            root,
            config,
            assembly,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Path {
        &self.config
    }

    pub fn assembly(&self) -> &Path {
        &self.assembly
    }
}

/// Directory containing the native module, falling back to the executable's
/// directory and then the working directory.
pub fn module_dir() -> PathBuf {
    let located = current_module_path()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(Path::to_path_buf))
        })
        .unwrap_or_else(|| PathBuf::from("."));

    debug!("Module directory resolved to {:?}", located);
    located
}

/// On-disk path of the shared object or DLL that contains this function.
#[cfg(unix)]
pub fn current_module_path() -> io::Result<PathBuf> {
    use std::ffi::{CStr, OsStr};
    use std::os::unix::ffi::OsStrExt;

    let mut info: libc::Dl_info = unsafe { std::mem::zeroed() };
    let anchor = current_module_path as *const libc::c_void;
    let found = unsafe { libc::dladdr(anchor, &mut info) };
    if found == 0 || info.dli_fname.is_null() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            "dladdr could not attribute the loader to a module",
        ));
    }

    let name = unsafe { CStr::from_ptr(info.dli_fname) };
    Ok(PathBuf::from(OsStr::from_bytes(name.to_bytes())))
}

/// On-disk path of the shared object or DLL that contains this function.
#[cfg(windows)]
pub fn current_module_path() -> io::Result<PathBuf> {
    use std::ffi::OsString;
    use std::os::windows::ffi::OsStringExt;
    use windows_sys::Win32::Foundation::HMODULE;
    use windows_sys::Win32::System::LibraryLoader::{
        GetModuleFileNameW, GetModuleHandleExW, GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS,
        GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
    };

    let mut module: HMODULE = unsafe { std::mem::zeroed() };
    let anchor = current_module_path as *const u16;
    let ok = unsafe {
        GetModuleHandleExW(
            GET_MODULE_HANDLE_EX_FLAG_FROM_ADDRESS | GET_MODULE_HANDLE_EX_FLAG_UNCHANGED_REFCOUNT,
            anchor,
            &mut module,
        )
    };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }

    let mut buffer = vec![0u16; 260];
    loop {
        let len = unsafe { GetModuleFileNameW(module, buffer.as_mut_ptr(), buffer.len() as u32) }
            as usize;
        if len == 0 {
            return Err(io::Error::last_os_error());
        }
        // A full buffer means the name was truncated.
        if len < buffer.len() {
            buffer.truncate(len);
            return Ok(PathBuf::from(OsString::from_wide(&buffer)));
        }
        buffer.resize(buffer.len() * 2, 0);
    }
}
