//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and address formats
//! - Detect rules that can never match because an earlier rule wins
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Shadowed rules are reported separately as warnings; they never reject
//!   a config
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::uri::Authority;

use crate::config::schema::ProxyConfig;
use crate::routing::matcher::path_contains;
use crate::routing::Rule;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),

    #[error("invalid metrics address {0:?}")]
    InvalidMetricsAddress(String),

    #[error("request timeout must be greater than zero")]
    ZeroRequestTimeout,

    #[error("rule {index}: source_host must not be empty")]
    EmptySourceHost { index: usize },

    #[error("rule {index}: dest_host {host:?} is not a valid authority")]
    InvalidDestHost { index: usize, host: String },

    #[error("rule {index}: unsupported dest_scheme {scheme:?} (expected http or https)")]
    UnsupportedScheme { index: usize, scheme: String },

    #[error("rule {index}: dest_path {path:?} must be empty or absolute")]
    RelativeDestPath { index: usize, path: String },
}

/// A rule that can never match because an earlier rule always wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowedRule {
    pub index: usize,
    pub shadowed_by: usize,
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    for (index, rule) in config.rules.iter().enumerate() {
        validate_rule(index, rule, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Find rules that are unreachable because an earlier rule matches every
/// request they would.
pub fn shadowed_rules(config: &ProxyConfig) -> Vec<ShadowedRule> {
    config
        .rules
        .iter()
        .enumerate()
        .filter_map(|(index, rule)| {
            config.rules[..index]
                .iter()
                .position(|earlier| shadows(earlier, rule))
                .map(|shadowed_by| ShadowedRule { index, shadowed_by })
        })
        .collect()
}

fn validate_rule(index: usize, rule: &Rule, errors: &mut Vec<ValidationError>) {
    if rule.source_host.is_empty() {
        errors.push(ValidationError::EmptySourceHost { index });
    }

    if rule.dest_host.parse::<Authority>().is_err() {
        errors.push(ValidationError::InvalidDestHost {
            index,
            host: rule.dest_host.clone(),
        });
    }

    if rule.dest_scheme != "http" && rule.dest_scheme != "https" {
        errors.push(ValidationError::UnsupportedScheme {
            index,
            scheme: rule.dest_scheme.clone(),
        });
    }

    if !rule.dest_path.is_empty() && !rule.dest_path.starts_with('/') {
        errors.push(ValidationError::RelativeDestPath {
            index,
            path: rule.dest_path.clone(),
        });
    }
}

/// Returns true if every request matching `later` also matches `earlier`.
///
/// Conservative: only reports shadowing that holds for all requests.
fn shadows(earlier: &Rule, later: &Rule) -> bool {
    // A stricter host policy on the earlier rule lets some hosts through.
    if earlier.case_sensitive_host && !later.case_sensitive_host {
        return false;
    }
    if !earlier.matches_host(&later.source_host) {
        return false;
    }

    if earlier.is_catch_all() {
        return true;
    }
    if later.is_catch_all() {
        return false;
    }

    earlier.clean_request_path == later.clean_request_path
        && (!earlier.case_sensitive_path || later.case_sensitive_path)
        && path_contains(
            &earlier.source_path,
            &later.source_path,
            earlier.case_sensitive_path,
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(host: &str, path: &str) -> Rule {
        Rule {
            source_host: host.into(),
            source_path: path.into(),
            dest_host: "backend.internal:8080".into(),
            ..Rule::default()
        }
    }

    fn config(rules: Vec<Rule>) -> ProxyConfig {
        ProxyConfig {
            rules,
            ..ProxyConfig::default()
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_all_errors() {
        let mut cfg = config(vec![Rule {
            source_host: String::new(),
            dest_host: "bad host".into(),
            dest_scheme: "ftp".into(),
            dest_path: "v2".into(),
            ..Rule::default()
        }]);
        cfg.listener.bind_address = "nowhere".into();
        cfg.timeouts.request_secs = 0;

        let errors = validate_config(&cfg).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidBindAddress("nowhere".into()),
                ValidationError::ZeroRequestTimeout,
                ValidationError::EmptySourceHost { index: 0 },
                ValidationError::InvalidDestHost {
                    index: 0,
                    host: "bad host".into()
                },
                ValidationError::UnsupportedScheme {
                    index: 0,
                    scheme: "ftp".into()
                },
                ValidationError::RelativeDestPath {
                    index: 0,
                    path: "v2".into()
                },
            ]
        );
    }

    #[test]
    fn test_empty_dest_host_rejected() {
        let mut r = rule("a.com", "/api");
        r.dest_host = String::new();
        let errors = validate_config(&config(vec![r])).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidDestHost { index: 0, .. }));
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut cfg = ProxyConfig::default();
        cfg.observability.metrics_address = "bogus".into();
        assert!(validate_config(&cfg).is_err());

        cfg.observability.metrics_enabled = false;
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn test_catch_all_shadows_later_rules() {
        let cfg = config(vec![rule("a.com", ""), rule("A.COM", "/api")]);
        assert_eq!(
            shadowed_rules(&cfg),
            vec![ShadowedRule {
                index: 1,
                shadowed_by: 0
            }]
        );
        // Shadowing is a warning; the config is still valid.
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn test_broader_prefix_shadows_narrower() {
        let cfg = config(vec![rule("a.com", "/api"), rule("a.com", "/api/v2")]);
        assert_eq!(shadowed_rules(&cfg).len(), 1);

        // Narrower first is the correct ordering.
        let cfg = config(vec![rule("a.com", "/api/v2"), rule("a.com", "/api")]);
        assert!(shadowed_rules(&cfg).is_empty());
    }

    #[test]
    fn test_segment_boundary_is_not_shadowing() {
        let cfg = config(vec![rule("a.com", "/api"), rule("a.com", "/apiv2")]);
        assert!(shadowed_rules(&cfg).is_empty());
    }

    #[test]
    fn test_policy_differences_are_not_shadowing() {
        let mut strict_host = rule("a.com", "");
        strict_host.case_sensitive_host = true;
        let cfg = config(vec![strict_host, rule("a.com", "/api")]);
        assert!(shadowed_rules(&cfg).is_empty());

        let mut strict_path = rule("a.com", "/api");
        strict_path.case_sensitive_path = true;
        let cfg = config(vec![strict_path, rule("a.com", "/api/v2")]);
        assert!(shadowed_rules(&cfg).is_empty());

        let mut cleaning = rule("a.com", "/api");
        cleaning.clean_request_path = true;
        let cfg = config(vec![cleaning, rule("a.com", "/api/v2")]);
        assert!(shadowed_rules(&cfg).is_empty());

        let cfg = config(vec![rule("a.com", "/api"), rule("b.com", "/api")]);
        assert!(shadowed_rules(&cfg).is_empty());
    }
}
