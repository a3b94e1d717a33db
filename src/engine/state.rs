use std::fmt;

/// Exit statuses, using the Windows C runtime errno numbering.
pub mod exit_code {
    pub const SUCCESS: u8 = 0;
    pub const STEP_FAILED: u8 = 1;
    pub const EPERM: u8 = 1;
    pub const ENOENT: u8 = 2;
    pub const EAGAIN: u8 = 11;
    pub const EACCES: u8 = 13;
    pub const ENOSYS: u8 = 40;
}

// Actions offered by the main menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum UserAction {
    Install,
    Uninstall,
    Quit,
}

impl UserAction {
    pub const MENU: [(&'static str, &'static str); 3] = [
        ("1", "Install the Tencent WebRTC OBS plugin"),
        ("2", "Uninstall the Tencent WebRTC OBS plugin"),
        ("0", "Quit"),
    ];

    /// Map a menu answer to an action; anything but an exact key is rejected.
    pub fn from_choice(choice: &str) -> Option<Self> {
        match choice {
            "1" => Some(UserAction::Install),
            "2" => Some(UserAction::Uninstall),
            "0" => Some(UserAction::Quit),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UserAction::Install => "install",
            UserAction::Uninstall => "uninstall",
            UserAction::Quit => "quit",
        }
    }
}

/// Why a run stopped early.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Failure {
    /// Wrong OS, architecture or OS release.
    Unsupported(String),
    NotElevated,
    /// A required file, directory or host installation is absent or too old.
    Missing(String),
    /// A package file does not match its manifest digest.
    Corrupt { path: String, detail: String },
    HostRunning,
    InvalidChoice(String),
    /// An install or uninstall step hit an I/O or parse error.
    Step { step: String, detail: String },
}

impl Failure {
    pub fn exit_code(&self) -> u8 {
        match self {
            Failure::Unsupported(_) => exit_code::EPERM,
            Failure::NotElevated => exit_code::EACCES,
            Failure::Missing(_) | Failure::Corrupt { .. } => exit_code::ENOENT,
            Failure::HostRunning => exit_code::EAGAIN,
            Failure::InvalidChoice(_) => exit_code::ENOSYS,
            Failure::Step { .. } => exit_code::STEP_FAILED,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Unsupported(reason) => write!(f, "unsupported environment: {reason}"),
            Failure::NotElevated => write!(f, "administrator privileges are required"),
            Failure::Missing(what) => write!(f, "{what}"),
            Failure::Corrupt { path, detail } => write!(f, "package file {path} is corrupt: {detail}"),
            Failure::HostRunning => {
                write!(f, "OBS Studio is running; close it and run the installer again")
            }
            Failure::InvalidChoice(choice) => write!(f, "invalid selection {choice:?}"),
            Failure::Step { step, detail } => write!(f, "{step} failed: {detail}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_menu_choices_exactly() {
        assert_eq!(UserAction::from_choice("1"), Some(UserAction::Install));
        assert_eq!(UserAction::from_choice("2"), Some(UserAction::Uninstall));
        assert_eq!(UserAction::from_choice("0"), Some(UserAction::Quit));
        assert_eq!(UserAction::from_choice(" 1"), None);
        assert_eq!(UserAction::from_choice("3"), None);
        assert_eq!(UserAction::from_choice(""), None);
    }

    #[test]
    fn failures_map_to_errno_codes() {
        assert_eq!(Failure::Unsupported("linux".into()).exit_code(), 1);
        assert_eq!(Failure::NotElevated.exit_code(), 13);
        assert_eq!(Failure::Missing("x".into()).exit_code(), 2);
        assert_eq!(
            Failure::Corrupt {
                path: "a".into(),
                detail: "b".into()
            }
            .exit_code(),
            2
        );
        assert_eq!(Failure::HostRunning.exit_code(), 11);
        assert_eq!(Failure::InvalidChoice("9".into()).exit_code(), 40);
        assert_eq!(
            Failure::Step {
                step: "copy".into(),
                detail: "denied".into()
            }
            .exit_code(),
            1
        );
    }
}
