//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured, with path / connection id fields)
//!     → logging.rs EventLog (human-readable lines for the host's log sink)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → tracing-subscriber installed by the host binary
//!     → the host's LogSink closure (UI text box, console, ...)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - The library never installs a global subscriber; binaries do
//! - Request ID flows through every request span
//! - Metrics are cheap (atomic increments behind the `metrics` facade)

pub mod logging;
pub mod metrics;

pub use logging::{EventLog, LogSink};
