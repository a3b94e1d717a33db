use std::env;
use std::path::{Path, PathBuf};

pub const HOST_PROCESS_NAME: &str = "obs64.exe";

/// Directory the package files are resolved against: the folder holding the installer binary.
pub fn default_package_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Per-user OBS config root, e.g. `%APPDATA%\obs-studio`.
pub fn roaming_config_dir() -> Option<PathBuf> {
    env::var_os("APPDATA")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .map(|appdata| appdata.join("obs-studio"))
}

pub fn roaming_services_config() -> Option<PathBuf> {
    roaming_config_dir().map(|root| {
        root.join("plugin_config")
            .join("rtmp-services")
            .join("services.json")
    })
}

/// Fixed locations inside an OBS Studio installation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostLayout {
    root: PathBuf,
}

impl HostLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn executable(&self) -> PathBuf {
        self.root.join("bin").join("64bit").join(HOST_PROCESS_NAME)
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.root.join("obs-plugins").join("64bit")
    }

    pub fn services_config(&self) -> PathBuf {
        self.root
            .join("data")
            .join("obs-plugins")
            .join("rtmp-services")
            .join("services.json")
    }
}
