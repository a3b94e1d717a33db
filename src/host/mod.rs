use std::fmt;
use std::path::Path;

use log::{debug, info};
use sysinfo::{ProcessesToUpdate, System};

/// Oldest OBS Studio major release the plugin supports.
pub const MIN_HOST_MAJOR: u16 = 26;

#[cfg(windows)]
const HOST_REGISTRY_KEY: &str = r"SOFTWARE\OBS Studio";

/// Fixed file version of an executable: major.minor.patch.build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
    pub build: u16,
}

impl FileVersion {
    pub fn new(major: u16, minor: u16, patch: u16, build: u16) -> Self {
        Self {
            major,
            minor,
            patch,
            build,
        }
    }

    /// Split the two 32-bit words of a `VS_FIXEDFILEINFO` block.
    pub fn from_words(most_significant: u32, least_significant: u32) -> Self {
        Self::new(
            (most_significant >> 16) as u16,
            (most_significant & 0xffff) as u16,
            (least_significant >> 16) as u16,
            (least_significant & 0xffff) as u16,
        )
    }
}

impl fmt::Display for FileVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// An unknown version never satisfies the minimum.
pub fn meets_minimum(version: Option<FileVersion>, min_major: u16) -> bool {
    version.is_some_and(|v| v.major >= min_major)
}

pub fn describe_version(version: Option<FileVersion>) -> String {
    version
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unknown".into())
}

/// Install directory registered by the OBS installer, or an empty string.
#[cfg(windows)]
pub fn registered_install_path() -> String {
    use winreg::RegKey;
    use winreg::enums::HKEY_LOCAL_MACHINE;

    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    let value = hklm
        .open_subkey(HOST_REGISTRY_KEY)
        .and_then(|key| key.get_value::<String, _>(""));
    match value {
        Ok(path) => {
            debug!("host: registry reports install path {}", path);
            path
        }
        Err(err) => {
            log::warn!("host: unable to read {}: {}", HOST_REGISTRY_KEY, err);
            String::new()
        }
    }
}

#[cfg(not(windows))]
pub fn registered_install_path() -> String {
    debug!("host: no registry on this platform");
    String::new()
}

#[cfg(windows)]
pub fn file_version(path: &Path) -> Option<FileVersion> {
    use std::ffi::c_void;
    use std::iter::once;
    use std::os::windows::ffi::OsStrExt;
    use windows_sys::Win32::Storage::FileSystem::{
        GetFileVersionInfoSizeW, GetFileVersionInfoW, VS_FIXEDFILEINFO, VerQueryValueW,
    };

    let wide: Vec<u16> = path.as_os_str().encode_wide().chain(once(0)).collect();
    let mut handle = 0u32;
    let size = unsafe { GetFileVersionInfoSizeW(wide.as_ptr(), &mut handle) };
    if size == 0 {
        log::warn!("host: {} carries no version resource", path.display());
        return None;
    }

    let mut data = vec![0u8; size as usize];
    let loaded =
        unsafe { GetFileVersionInfoW(wide.as_ptr(), 0, size, data.as_mut_ptr().cast::<c_void>()) };
    if loaded == 0 {
        log::warn!("host: failed to load version info from {}", path.display());
        return None;
    }

    let root: Vec<u16> = "\\".encode_utf16().chain(once(0)).collect();
    let mut block: *mut c_void = std::ptr::null_mut();
    let mut len = 0u32;
    let found = unsafe {
        VerQueryValueW(
            data.as_ptr().cast::<c_void>(),
            root.as_ptr(),
            &mut block,
            &mut len,
        )
    };
    if found == 0 || block.is_null() || (len as usize) < std::mem::size_of::<VS_FIXEDFILEINFO>() {
        log::warn!("host: no fixed file info in {}", path.display());
        return None;
    }

    // The block points into `data`, which outlives this read.
    let info = unsafe { std::ptr::read_unaligned(block.cast::<VS_FIXEDFILEINFO>()) };
    let version = FileVersion::from_words(info.dwFileVersionMS, info.dwFileVersionLS);
    debug!("host: {} reports version {}", path.display(), version);
    Some(version)
}

#[cfg(not(windows))]
pub fn file_version(path: &Path) -> Option<FileVersion> {
    debug!(
        "host: version resources unavailable for {} on this platform",
        path.display()
    );
    None
}

/// Whether any running process carries the given executable name.
pub fn is_process_running(process_name: &str) -> bool {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    let running = system
        .processes()
        .values()
        .any(|process| process.name().eq_ignore_ascii_case(process_name));
    info!("host: {} running={}", process_name, running);
    running
}
