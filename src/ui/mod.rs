use std::io::{self, BufRead, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::warn;

const RULE_WIDTH: usize = 60;
const RUNNING_TEMPLATE: &str = "{spinner:.cyan} {prefix}... {msg}";
const OK_TEMPLATE: &str = "{prefix} {msg:.green}";
const FAILED_TEMPLATE: &str = "{prefix} {msg:.red}";

/// Terminal front end: progress lines, the action menu and the exit pause.
#[derive(Clone, Debug)]
pub struct Console {
    pause_on_exit: bool,
}

impl Console {
    pub fn new(pause_on_exit: bool) -> Self {
        Self { pause_on_exit }
    }

    /// Start a progress line that keeps redrawing until it is resolved.
    pub fn step(&self, label: impl Into<String>) -> Step {
        Step::start(label.into())
    }

    pub fn notice(&self, message: &str) {
        println!("{message}");
    }

    pub fn error(&self, message: &str) {
        eprintln!("{message}");
    }

    pub fn show_menu(&self, title: &str, options: &[(&str, &str)]) {
        let rule = "=".repeat(RULE_WIDTH);
        println!();
        println!("{rule}");
        println!("  {title}");
        println!("{rule}");
        for (key, label) in options {
            println!(" {key}  {label}");
        }
    }

    /// Read one line from stdin with the trailing line ending removed.
    pub fn prompt(&self, text: &str) -> io::Result<String> {
        print!("{text}");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_owned())
    }

    /// Hold the window open until the user acknowledges.
    pub fn pause(&self) {
        if !self.pause_on_exit {
            return;
        }
        if let Err(err) = self.prompt("Press Enter to continue...") {
            warn!("ui: pause prompt failed: {}", err);
        }
    }
}

pub struct Step {
    label: String,
    bar: ProgressBar,
}

impl Step {
    fn start(label: String) -> Self {
        let bar = ProgressBar::new_spinner().with_prefix(label.clone());
        bar.set_style(style(RUNNING_TEMPLATE));
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { label, bar }
    }

    /// Replace the detail shown after the label, e.g. a `(2/4)` counter.
    pub fn update(&self, detail: impl Into<String>) {
        self.bar.set_message(detail.into());
    }

    pub fn ok(self, detail: impl Into<String>) {
        self.finish(OK_TEMPLATE, &detail.into(), "OK");
    }

    pub fn fail(self, detail: impl Into<String>, reason: &str) {
        self.finish(FAILED_TEMPLATE, &detail.into(), reason);
    }

    fn finish(self, template: &str, detail: &str, marker: &str) {
        let line = if detail.is_empty() {
            format!("{}...", self.label)
        } else {
            format!("{}... {}", self.label, detail)
        };
        if self.bar.is_hidden() {
            self.bar.finish_and_clear();
            println!("{line} {marker}");
            return;
        }
        self.bar.set_style(style(template));
        self.bar.set_prefix(line);
        self.bar.finish_with_message(marker.to_owned());
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|err| {
        warn!("ui: invalid progress template {:?}: {}", template, err);
        ProgressStyle::default_spinner()
    })
}
