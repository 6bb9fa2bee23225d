//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)                 WebServerBuilder (fluent)
//!     → loader.rs (parse)                → overrides on ServerConfig
//!     → validation.rs (semantic checks)  → validation.rs
//!     → ServerConfig (validated, immutable)
//!     → frozen inside WebServer at build()
//! ```
//!
//! # Design Decisions
//! - Config is immutable once a server is built
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    LimitsConfig, ListenerConfig, ObservabilityConfig, ServerConfig, ShutdownConfig, SiteConfig,
};
pub use validation::{validate_config, ValidationError};
