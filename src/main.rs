use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;

mod diagnostics;
mod engine;
mod env;
mod host;
mod package;
mod services;
mod storage;
mod ui;
mod util;

use engine::state::UserAction;
use engine::{InstallerConfig, InstallerEngine, SystemProbe};
use package::Manifest;
use ui::Console;

#[derive(Parser, Debug)]
#[command(
    name = "OBS WebRTC Installer",
    author,
    version,
    about = "Installs or removes the Tencent WebRTC output plugin for OBS Studio"
)]
struct Cli {
    /// Print installer version and exit without checking the system.
    #[arg(long)]
    version_only: bool,

    /// Directory holding the plugin package (defaults to the installer's folder).
    #[arg(long, value_name = "DIR")]
    package_dir: Option<PathBuf>,

    /// OBS Studio install directory; skips the registry lookup.
    #[arg(long, value_name = "DIR")]
    host_dir: Option<PathBuf>,

    /// Run this action instead of showing the menu.
    #[arg(long, value_enum)]
    action: Option<UserAction>,

    /// Exit without waiting for Enter.
    #[arg(long)]
    no_pause: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if cli.version_only {
        println!("OBS WebRTC Installer {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let console = Console::new(!cli.no_pause);
    let config = InstallerConfig {
        package_dir: cli.package_dir.unwrap_or_else(env::default_package_dir),
        host_dir: cli.host_dir,
        roaming_services: env::roaming_services_config(),
    };
    log::debug!("main: {:?}", config);

    let engine = InstallerEngine::new(SystemProbe, Manifest::bundled(), config, console.clone());
    let code = engine.run(cli.action);
    console.pause();
    ExitCode::from(code)
}
