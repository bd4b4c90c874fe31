//! Rule-based reverse proxy library.
//!
//! The [`routing`] module is the core: forwarding [`Rule`]s decide whether an
//! incoming request (host + path) applies and compute the destination URL.
//! The remaining modules wrap it into a running proxy.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{DestinationUrl, RequestView, Router, Rule};
