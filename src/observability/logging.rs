//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for binaries
//! - Forward lifecycle lines to the host-supplied log sink

use std::fmt;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Host callback receiving one human-readable line per lifecycle event.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Emits lifecycle and error lines to `tracing` and to the optional sink.
#[derive(Clone, Default)]
pub struct EventLog {
    sink: Option<LogSink>,
}

impl EventLog {
    pub fn new(sink: Option<LogSink>) -> Self {
        Self { sink }
    }

    pub fn info(&self, message: &str) {
        tracing::info!("{message}");
        self.forward(message);
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!("{message}");
        self.forward(message);
    }

    pub fn error(&self, message: &str) {
        tracing::error!("{message}");
        self.forward(message);
    }

    fn forward(&self, message: &str) {
        if let Some(sink) = &self.sink {
            sink(message);
        }
    }
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog")
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

/// Install a global fmt subscriber filtered by `RUST_LOG`, or `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // A host may already have installed its own subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn forwards_every_level_to_sink() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&lines);
        let log = EventLog::new(Some(Arc::new(move |line: &str| {
            captured.lock().unwrap().push(line.to_string());
        })));

        log.info("started");
        log.warn("already running");
        log.error("boom");

        assert_eq!(
            *lines.lock().unwrap(),
            vec!["started", "already running", "boom"]
        );
    }

    #[test]
    fn no_sink_is_fine() {
        EventLog::default().info("nobody listening");
    }
}
