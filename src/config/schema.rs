//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration for the web server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (ports, TLS material).
    pub listener: ListenerConfig,

    /// Site content and pipeline switches.
    pub site: SiteConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Shutdown behavior.
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host or IP address both listeners bind to.
    pub bind_host: String,

    /// Plaintext HTTP port. `0` picks an ephemeral port.
    pub http_port: u16,

    /// TLS port, used only when both `cert_path` and `key_path` are set.
    pub https_port: u16,

    /// Path to the PEM certificate chain.
    pub cert_path: Option<PathBuf>,

    /// Path to the PEM private key.
    pub key_path: Option<PathBuf>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            http_port: 8080,
            https_port: 8443,
            cert_path: None,
            key_path: None,
        }
    }
}

impl ListenerConfig {
    /// Certificate and key paths, when both are present and non-empty.
    pub fn tls_material(&self) -> Option<(&Path, &Path)> {
        let cert = self.cert_path.as_deref().filter(|p| !p.as_os_str().is_empty())?;
        let key = self.key_path.as_deref().filter(|p| !p.as_os_str().is_empty())?;
        Some((cert, key))
    }

    /// True when exactly one half of the TLS material is configured.
    pub fn tls_half_configured(&self) -> bool {
        self.tls_material().is_none() && (self.cert_path.is_some() || self.key_path.is_some())
    }
}

/// Site content and pipeline switches.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Directory served as static content; also holds `ui.html`,
    /// `swagger.html`, `swagger.json` and the `files/` upload directory.
    pub static_root: Option<PathBuf>,

    /// Add permissive CORS headers and answer every OPTIONS with 204.
    pub cors: bool,

    /// Register the built-in `/api/*` demo endpoints after user routes.
    pub builtin_routes: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            static_root: None,
            cors: false,
            builtin_routes: true,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum accepted request body in bytes (uploads, notifications).
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 64 * 1024 * 1024, // 64MB
        }
    }
}

/// Shutdown behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Seconds in-flight HTTP requests get to finish after `stop()`.
    pub grace_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { grace_secs: 5 }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Expose a Prometheus scrape endpoint (installed by the host binary).
    pub metrics_enabled: bool,

    /// Address of the scrape endpoint.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
