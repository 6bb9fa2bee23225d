//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at build):
//!     "/api/echo/{val}"
//!     → matcher.rs (split into literal / capture segments)
//!     → router.rs (append in registration order, freeze)
//!
//! Incoming request path
//!     → router.rs (scan REST routes in order)
//!     → matcher.rs (segment-by-segment comparison)
//!     → Return: (route, captured params) or NoMatch
//! ```
//!
//! # Design Decisions
//! - Routes compiled once, immutable while serving
//! - No regex: one placeholder per segment, fixed segment count
//! - First match wins (registration order, not specificity)
//! - WebSocket routes are exact paths keyed in a map

pub mod matcher;
pub mod router;

pub use matcher::{PathMatcher, PathParams, RouteError};
pub use router::{RestRoute, RouteTable};
