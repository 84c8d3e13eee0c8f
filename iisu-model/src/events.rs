use std::fmt::{self, Display};
use std::path::PathBuf;

/// Severity attached to a job log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        })
    }
}

/// Progress stream emitted by a running job.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "event", rename_all = "snake_case"))]
pub enum JobEvent {
    Log { level: LogLevel, message: String },
    Progress { done: usize, total: usize },
    Preview { path: PathBuf },
}

impl JobEvent {
    pub fn info(message: impl Into<String>) -> Self {
        JobEvent::Log {
            level: LogLevel::Info,
            message: message.into(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        JobEvent::Log {
            level: LogLevel::Warn,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        JobEvent::Log {
            level: LogLevel::Error,
            message: message.into(),
        }
    }
}

/// Final tally returned when a job finishes or is cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JobSummary {
    pub done: usize,
    pub total: usize,
    pub errors: usize,
    pub cancelled: bool,
    pub message: String,
}

impl JobSummary {
    pub fn nothing_to_do() -> Self {
        Self {
            message: "Nothing to do (already generated / missing borders / no matches)."
                .to_string(),
            ..Self::default()
        }
    }

    pub fn finished(done: usize, total: usize, errors: usize) -> Self {
        Self {
            done,
            total,
            errors,
            cancelled: false,
            message: format!(
                "Finished. Completed {done}/{total} (errors={errors})."
            ),
        }
    }

    pub fn cancelled(done: usize, total: usize, errors: usize) -> Self {
        Self {
            done,
            total,
            errors,
            cancelled: true,
            message: format!(
                "Cancelled. Completed {done}/{total} (errors={errors})."
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_messages() {
        assert_eq!(
            JobSummary::finished(3, 4, 1).message,
            "Finished. Completed 3/4 (errors=1)."
        );
        let cancelled = JobSummary::cancelled(1, 4, 0);
        assert!(cancelled.cancelled);
        assert!(cancelled.message.starts_with("Cancelled."));
        assert!(JobSummary::nothing_to_do().message.starts_with("Nothing to do"));
    }
}
