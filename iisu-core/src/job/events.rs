use std::path::PathBuf;

use iisu_model::{JobEvent, LogLevel};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Mirrors job messages into `tracing` and, when a front end listens, into
/// a [`JobEvent`] channel. A dropped receiver is not an error.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::Sender<JobEvent>>,
}

impl EventSink {
    /// Sink that also forwards events to `tx`.
    pub fn new(tx: mpsc::Sender<JobEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Log to `tracing` only.
    pub fn silent() -> Self {
        Self::default()
    }

    async fn emit(&self, event: JobEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event).await;
        }
    }

    /// Log `message` and forward it.
    pub async fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Debug => debug!("[job] {}", message),
            LogLevel::Info => info!("[job] {}", message),
            LogLevel::Warn => warn!("[job] {}", message),
            LogLevel::Error => error!("[job] {}", message),
        }
        self.emit(JobEvent::Log { level, message }).await;
    }

    /// Log at info level.
    pub async fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message).await;
    }

    /// Log at warn level.
    pub async fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message).await;
    }

    /// Log at error level.
    pub async fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message).await;
    }

    /// Report `done` of `total` titles finished.
    pub async fn progress(&self, done: usize, total: usize) {
        self.emit(JobEvent::Progress { done, total }).await;
    }

    /// Announce a freshly written icon.
    pub async fn preview(&self, path: PathBuf) {
        self.emit(JobEvent::Preview { path }).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forwards_events_and_tolerates_closed_receiver() {
        let (tx, mut rx) = mpsc::channel(8);
        let sink = EventSink::new(tx);
        sink.info("hello").await;
        sink.progress(1, 2).await;

        assert_eq!(rx.recv().await, Some(JobEvent::info("hello")));
        assert_eq!(rx.recv().await, Some(JobEvent::Progress { done: 1, total: 2 }));

        drop(rx);
        sink.warn("nobody listening").await;
        EventSink::silent().error("also fine").await;
    }
}
