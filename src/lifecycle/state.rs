//! Server state machine.
//!
//! ```text
//! Stopped ──start()──▶ Starting ──bound──▶ Running
//!    ▲                    │                   │
//!    └──── bind failed ───┘                 stop()
//!    │                                        ▼
//!    └──────── listeners drained ───────── Stopping
//! ```

use std::fmt;

/// Lifecycle state of a [`WebServer`](crate::WebServer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerState::Stopped => "stopped",
            ServerState::Starting => "starting",
            ServerState::Running => "running",
            ServerState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}
