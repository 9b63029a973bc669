//! Severity levels named by a response's `status` field

use std::fmt;

use tracing::{debug, error, info, warn};

/// Fixed set of levels a registry message can be logged at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    /// Map a registry status string onto a level; unknown names become `Warn`
    pub fn from_status(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "debug" => Severity::Debug,
            "success" | "info" | "log" | "start" | "end" => Severity::Info,
            "warn" | "warning" => Severity::Warn,
            "error" => Severity::Error,
            _ => Severity::Warn,
        }
    }

    /// Emit `message` at this level
    pub fn log(self, message: &str) {
        match self {
            Severity::Debug => debug!("{}", message),
            Severity::Info => info!("{}", message),
            Severity::Warn => warn!("{}", message),
            Severity::Error => error!("{}", message),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        };
        f.write_str(name)
    }
}
