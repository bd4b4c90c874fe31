//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, query)
//!     → rule.rs (RequestView, host policy, effective path)
//!     → matcher.rs (segment-wise prefix test, relative remainder)
//!     → router.rs (first matching rule in configuration order)
//!     → Return: RouteMatch with DestinationUrl, or no-match
//!
//! Rule Loading (startup and reload):
//!     config rules[]
//!     → Validate (config::validation)
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Pure and synchronous: no I/O, no shared mutable state
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same input always matches same rule
//! - Malformed input degrades to no-match, never to an error

pub mod matcher;
pub mod router;
pub mod rule;

pub use router::{RouteMatch, Router};
pub use rule::{DestinationUrl, RequestView, RoutingError, Rule};
