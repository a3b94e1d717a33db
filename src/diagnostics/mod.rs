use std::env::consts as os_consts;

use log::debug;
use sysinfo::System;

pub const SUPPORTED_OS: &str = "windows";
pub const SUPPORTED_ARCH: &str = "x86_64";
pub const SUPPORTED_RELEASES: [&str; 2] = ["10", "11"];

/// First Windows 11 build number; Windows 11 still reports a 10.0 kernel.
const WINDOWS_11_BUILD: u32 = 22_000;
const WINDOWS_10_BUILD: u32 = 10_240;

pub fn os_family() -> String {
    os_consts::OS.into()
}

pub fn cpu_arch() -> String {
    os_consts::ARCH.into()
}

/// Marketing release of the running OS ("10", "11", ...), if it can be determined.
pub fn os_release() -> Option<String> {
    let os_version = System::os_version();
    let kernel = System::kernel_version();
    debug!(
        "diagnostics: os_version={:?} kernel_version={:?}",
        os_version, kernel
    );
    classify_release(os_version.as_deref(), kernel.as_deref())
}

/// Prefer the build number, which tells Windows 10 and 11 apart, and fall back
/// to the leading token of the reported OS version.
pub fn classify_release(os_version: Option<&str>, kernel_version: Option<&str>) -> Option<String> {
    let build = kernel_version
        .map(str::trim)
        .and_then(|kernel| kernel.split('.').next_back())
        .and_then(|part| part.parse::<u32>().ok());
    match build {
        Some(build) if build >= WINDOWS_11_BUILD => return Some("11".into()),
        Some(build) if build >= WINDOWS_10_BUILD => return Some("10".into()),
        _ => {}
    }
    os_version
        .and_then(|version| version.split_whitespace().next())
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

pub fn is_supported_release(release: Option<&str>) -> bool {
    release.is_some_and(|release| SUPPORTED_RELEASES.contains(&release))
}

#[cfg(windows)]
pub fn is_elevated() -> bool {
    use windows_sys::Win32::UI::Shell::IsUserAnAdmin;
    let elevated = unsafe { IsUserAnAdmin() } != 0;
    debug!("diagnostics: elevated={}", elevated);
    elevated
}

#[cfg(not(windows))]
pub fn is_elevated() -> bool {
    false
}
