use std::backtrace::{Backtrace, BacktraceStatus};
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::diagnostics;
use crate::env::{self, HostLayout};
use crate::host::{self, FileVersion, MIN_HOST_MAJOR};
use crate::package::{Manifest, ManifestEntry, ManifestError};
use crate::services;
use crate::storage;
use crate::ui::Console;
use crate::util::{step_counter, with_counter};

pub mod state;

use state::{Failure, UserAction, exit_code};

/// Environment queries behind the preflight gates.
pub trait Probe {
    fn os_family(&self) -> String;
    fn cpu_arch(&self) -> String;
    fn os_release(&self) -> Option<String>;
    fn is_elevated(&self) -> bool;
    fn registered_install_path(&self) -> String;
    fn host_version(&self, executable: &Path) -> Option<FileVersion>;
    fn is_host_running(&self) -> bool;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemProbe;

impl Probe for SystemProbe {
    fn os_family(&self) -> String {
        diagnostics::os_family()
    }

    fn cpu_arch(&self) -> String {
        diagnostics::cpu_arch()
    }

    fn os_release(&self) -> Option<String> {
        diagnostics::os_release()
    }

    fn is_elevated(&self) -> bool {
        diagnostics::is_elevated()
    }

    fn registered_install_path(&self) -> String {
        host::registered_install_path()
    }

    fn host_version(&self, executable: &Path) -> Option<FileVersion> {
        host::file_version(executable)
    }

    fn is_host_running(&self) -> bool {
        host::is_process_running(env::HOST_PROCESS_NAME)
    }
}

#[derive(Clone, Debug)]
pub struct InstallerConfig {
    /// Directory the manifest paths are resolved against.
    pub package_dir: PathBuf,
    /// Skips the registry lookup when set.
    pub host_dir: Option<PathBuf>,
    pub roaming_services: Option<PathBuf>,
}

pub struct InstallerEngine<P> {
    probe: P,
    manifest: Manifest,
    config: InstallerConfig,
    console: Console,
}

impl<P: Probe> InstallerEngine<P> {
    pub fn new(probe: P, manifest: Manifest, config: InstallerConfig, console: Console) -> Self {
        Self {
            probe,
            manifest,
            config,
            console,
        }
    }

    /// Run the gates, pick an action and carry it out. Returns the process exit status.
    pub fn run(&self, preselected: Option<UserAction>) -> u8 {
        match self.try_run(preselected) {
            Ok(()) => exit_code::SUCCESS,
            Err(failure) => {
                error!("installer stopped: {}", failure);
                self.console.error(&format!("Installer stopped: {failure}"));
                failure.exit_code()
            }
        }
    }

    fn try_run(&self, preselected: Option<UserAction>) -> Result<(), Failure> {
        let host = self.preflight()?;
        let action = match preselected {
            Some(action) => action,
            None => self.ask_action()?,
        };
        self.perform(&host, action)
    }

    /// Evaluate every precondition in order; the first failure ends the run.
    pub fn preflight(&self) -> Result<HostLayout, Failure> {
        self.check_platform()?;
        self.verify_package()?;
        let host = self.locate_host()?;
        self.check_host_version(&host)?;
        self.check_host_idle()?;
        info!("preflight: all checks passed for {}", host.root().display());
        Ok(host)
    }

    pub fn perform(&self, host: &HostLayout, action: UserAction) -> Result<(), Failure> {
        info!("action: {}", action.label());
        match action {
            UserAction::Install => {
                self.install(host)?;
                self.console.notice(
                    "Installation finished. Restart OBS Studio to use the Tencent WebRTC output.",
                );
            }
            UserAction::Uninstall => {
                self.uninstall(host)?;
                self.console
                    .notice("Uninstall finished. Restart OBS Studio to apply the change.");
            }
            UserAction::Quit => self.console.notice("Nothing changed."),
        }
        Ok(())
    }

    fn check_platform(&self) -> Result<(), Failure> {
        let step = self.console.step("Checking operating system");
        let os = self.probe.os_family();
        if os != diagnostics::SUPPORTED_OS {
            step.fail(&os, "this installer only supports Windows");
            return Err(Failure::Unsupported(format!("operating system {os}")));
        }
        step.ok(os);

        let step = self.console.step("Checking CPU architecture");
        let arch = self.probe.cpu_arch();
        if arch != diagnostics::SUPPORTED_ARCH {
            step.fail(&arch, "this installer only supports AMD64 systems");
            return Err(Failure::Unsupported(format!("architecture {arch}")));
        }
        step.ok(arch);

        let step = self.console.step("Checking Windows release");
        let release = self.probe.os_release();
        let shown = release.clone().unwrap_or_else(|| "unknown".into());
        if !diagnostics::is_supported_release(release.as_deref()) {
            step.fail(&shown, "Windows 10 or Windows 11 is required");
            return Err(Failure::Unsupported(format!("Windows release {shown}")));
        }
        step.ok(shown);

        let step = self.console.step("Checking administrator privileges");
        if !self.probe.is_elevated() {
            step.fail("", "run the installer as administrator");
            return Err(Failure::NotElevated);
        }
        step.ok("");
        Ok(())
    }

    fn verify_package(&self) -> Result<(), Failure> {
        let total = self.manifest.entries().len();
        for (index, entry) in self.manifest.entries().iter().enumerate() {
            let counter = step_counter(index, total);
            let step = self.console.step("Verifying package files");
            step.update(counter.clone());
            match entry.verify(&self.config.package_dir) {
                Ok(()) => step.ok(with_counter(&counter, &entry.path)),
                Err(err) => {
                    let reason = match &err {
                        ManifestError::Missing { .. } => "file is missing",
                        ManifestError::Mismatch { .. } => "file is corrupt",
                    };
                    step.fail(with_counter(&counter, err.path()), reason);
                    return Err(match err {
                        ManifestError::Missing { path } => {
                            Failure::Missing(format!("package file {path} not found"))
                        }
                        ManifestError::Mismatch { path, detail } => {
                            Failure::Corrupt { path, detail }
                        }
                    });
                }
            }
        }
        Ok(())
    }

    fn locate_host(&self) -> Result<HostLayout, Failure> {
        let step = self.console.step("Locating OBS Studio");
        let root = match &self.config.host_dir {
            Some(dir) => dir.clone(),
            None => PathBuf::from(self.probe.registered_install_path()),
        };
        let shown = root.display().to_string();
        if shown.is_empty() || !root.is_dir() {
            step.fail(&shown, "OBS Studio installation not found");
            return Err(Failure::Missing(format!(
                "OBS Studio install directory {shown:?} not found"
            )));
        }

        let host = HostLayout::new(root);
        if !host.executable().is_file() {
            step.fail(&shown, "OBS Studio executable not found");
            return Err(Failure::Missing(format!(
                "{} not found",
                host.executable().display()
            )));
        }
        step.ok(shown);
        Ok(host)
    }

    fn check_host_version(&self, host: &HostLayout) -> Result<(), Failure> {
        let step = self.console.step("Checking OBS Studio version");
        let version = self.probe.host_version(&host.executable());
        let shown = host::describe_version(version);
        if !host::meets_minimum(version, MIN_HOST_MAJOR) {
            step.fail(&shown, "OBS Studio is too old");
            return Err(Failure::Missing(format!(
                "OBS Studio {MIN_HOST_MAJOR} or newer is required, found {shown}"
            )));
        }
        step.ok(shown);
        Ok(())
    }

    fn check_host_idle(&self) -> Result<(), Failure> {
        let step = self.console.step("Checking for a running OBS Studio");
        if self.probe.is_host_running() {
            step.fail("", "close OBS Studio and try again");
            return Err(Failure::HostRunning);
        }
        step.ok("");
        Ok(())
    }

    fn ask_action(&self) -> Result<UserAction, Failure> {
        self.console
            .show_menu("Tencent WebRTC OBS plugin installer", &UserAction::MENU);
        let answer = self.console.prompt("Select an option [0,1,2]: ").map_err(|e| {
            warn!("ui: failed to read selection: {}", e);
            Failure::InvalidChoice(String::new())
        })?;
        resolve_choice(&answer)
    }

    fn install(&self, host: &HostLayout) -> Result<(), Failure> {
        let plugins_dir = host.plugins_dir();
        if !plugins_dir.is_dir() {
            return Err(Failure::Missing(format!(
                "OBS Studio plugin directory {} not found",
                plugins_dir.display()
            )));
        }

        let total = self.manifest.entries().len();
        for (index, entry) in self.manifest.entries().iter().enumerate() {
            let counter = step_counter(index, total);
            let step = self.console.step("Installing plugin files");
            step.update(counter.clone());
            let source = entry.source(&self.config.package_dir);
            match storage::install_file(&source, &plugins_dir) {
                Ok(dest) => {
                    debug!("install: {} -> {}", entry.path, dest.display());
                    step.ok(with_counter(&counter, &entry.path));
                }
                Err(detail) => {
                    step.fail(&counter, &format!("could not install {}", entry.path));
                    return Err(step_failure(format!("installing {}", entry.path), detail));
                }
            }
        }

        let local = host.services_config();
        if !local.is_file() {
            return Err(Failure::Missing(format!(
                "OBS Studio services config {} not found",
                local.display()
            )));
        }
        self.edit_services(
            "Registering streaming service",
            &local,
            services::install_service,
        )?;
        if let Some(roaming) = self.roaming_services() {
            self.edit_services(
                "Registering streaming service for the current user",
                &roaming,
                services::install_service,
            )?;
        }
        Ok(())
    }

    fn uninstall(&self, host: &HostLayout) -> Result<(), Failure> {
        let plugins_dir = host.plugins_dir();
        if plugins_dir.is_dir() {
            let total = self.manifest.entries().len();
            for (index, entry) in self.manifest.entries().iter().enumerate() {
                let counter = step_counter(index, total);
                let step = self.console.step("Removing plugin files");
                step.update(counter.clone());
                match uninstall_entry(entry, &plugins_dir) {
                    Ok(()) => step.ok(with_counter(&counter, &entry.path)),
                    Err(detail) => {
                        step.fail(&counter, &format!("could not remove {}", entry.path));
                        return Err(step_failure(format!("removing {}", entry.path), detail));
                    }
                }
            }
        } else {
            warn!(
                "uninstall: plugin directory {} missing; skipping files",
                plugins_dir.display()
            );
        }

        let local = host.services_config();
        if local.is_file() {
            self.edit_services(
                "Removing streaming service",
                &local,
                services::uninstall_service,
            )?;
        }
        if let Some(roaming) = self.roaming_services() {
            self.edit_services(
                "Removing streaming service for the current user",
                &roaming,
                services::uninstall_service,
            )?;
        }
        Ok(())
    }

    fn edit_services(
        &self,
        label: &str,
        path: &Path,
        edit: fn(&Path) -> Result<(), String>,
    ) -> Result<(), Failure> {
        let step = self.console.step(label);
        match edit(path) {
            Ok(()) => {
                step.ok("");
                Ok(())
            }
            Err(detail) => {
                step.fail("", "could not update the services config");
                Err(step_failure(format!("updating {}", path.display()), detail))
            }
        }
    }

    fn roaming_services(&self) -> Option<PathBuf> {
        self.config
            .roaming_services
            .clone()
            .filter(|path| path.is_file())
    }
}

pub fn resolve_choice(answer: &str) -> Result<UserAction, Failure> {
    UserAction::from_choice(answer).ok_or_else(|| Failure::InvalidChoice(answer.to_owned()))
}

fn uninstall_entry(entry: &ManifestEntry, plugins_dir: &Path) -> Result<(), String> {
    let name = entry
        .file_name()
        .ok_or_else(|| format!("{} has no file name", entry.path))?;
    storage::uninstall_file(&plugins_dir.join(name))
}

fn step_failure(step: String, detail: String) -> Failure {
    error!("{} failed: {}", step, detail);
    let trace = Backtrace::capture();
    if trace.status() == BacktraceStatus::Captured {
        eprintln!("{trace}");
    }
    Failure::Step { step, detail }
}
