//! Rule lookup and dispatch.
//!
//! # Responsibilities
//! - Store the configured rules in order
//! - Find the first rule matching a request
//! - Return the matched rule with its destination, or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in configuration order; first match wins
//! - Hot reload builds a fresh Router and swaps it in whole

use crate::config::ProxyConfig;
use crate::routing::rule::{DestinationUrl, RequestView, Rule};

/// A successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'r> {
    /// Position of the rule in configuration order.
    pub index: usize,
    pub rule: &'r Rule,
    pub destination: DestinationUrl,
}

/// Ordered collection of forwarding rules.
#[derive(Debug, Clone, Default)]
pub struct Router {
    rules: Vec<Rule>,
}

impl Router {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Build a router from the rules of a loaded configuration.
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(config.rules.clone())
    }

    /// Find the first rule matching the request and compute its destination.
    pub fn route(&self, req: &RequestView<'_>) -> Option<RouteMatch<'_>> {
        let (index, rule) = self
            .rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matches_request(req))?;

        let destination = rule.destination_url(req);
        tracing::trace!(
            rule = index,
            host = %req.host(),
            path = %req.path(),
            destination = %destination,
            "Rule matched"
        );

        Some(RouteMatch {
            index,
            rule,
            destination,
        })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
