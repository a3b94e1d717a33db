use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

const BACKUP_SUFFIX: &str = ".backup";

/// Sibling path holding the pre-install original, e.g. `obs-webrtc.dll.backup`.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Copy `source` into `dest_dir`, moving any existing file of the same name aside first.
///
/// The copy keeps the source's permissions and timestamps. Returns the installed path.
pub fn install_file(source: &Path, dest_dir: &Path) -> Result<PathBuf, String> {
    let name = source
        .file_name()
        .ok_or_else(|| format!("{} has no file name", source.display()))?;
    let dest = dest_dir.join(name);

    if dest.exists() {
        let backup = backup_path(&dest);
        fs::rename(&dest, &backup).map_err(|e| {
            format!(
                "failed to back up {} to {}: {e}",
                dest.display(),
                backup.display()
            )
        })?;
        info!("storage: backed up {} to {}", dest.display(), backup.display());
    }

    fs::copy(source, &dest).map_err(|e| {
        format!(
            "failed to copy {} to {}: {e}",
            source.display(),
            dest.display()
        )
    })?;
    if let Err(err) = copy_timestamps(source, &dest) {
        warn!("storage: {}", err);
    }
    debug!("storage: installed {}", dest.display());
    Ok(dest)
}

/// Remove an installed file and put its backup back in place if one exists.
pub fn uninstall_file(path: &Path) -> Result<(), String> {
    if path.exists() {
        fs::remove_file(path).map_err(|e| format!("failed to remove {}: {e}", path.display()))?;
        debug!("storage: removed {}", path.display());
    }

    let backup = backup_path(path);
    if backup.exists() {
        fs::rename(&backup, path).map_err(|e| {
            format!(
                "failed to restore {} from {}: {e}",
                path.display(),
                backup.display()
            )
        })?;
        info!("storage: restored {} from backup", path.display());
    }
    Ok(())
}

fn copy_timestamps(source: &Path, dest: &Path) -> Result<(), String> {
    let meta = fs::metadata(source)
        .map_err(|e| format!("failed to read metadata of {}: {e}", source.display()))?;
    let mut times = fs::FileTimes::new();
    if let Ok(accessed) = meta.accessed() {
        times = times.set_accessed(accessed);
    }
    if let Ok(modified) = meta.modified() {
        times = times.set_modified(modified);
    }
    let file = fs::File::options()
        .write(true)
        .open(dest)
        .map_err(|e| format!("failed to open {}: {e}", dest.display()))?;
    file.set_times(times)
        .map_err(|e| format!("failed to set timestamps on {}: {e}", dest.display()))
}
