//! Forwarding rules.
//!
//! # Responsibilities
//! - Hold one source → destination mapping with its matching policy
//! - Decide whether a request falls under the rule
//! - Compute the destination URL for a matched request
//!
//! # Design Decisions
//! - Rules are plain immutable values; every method takes `&self`
//! - Malformed input never matches an absolute rule (fail closed)
//! - Destination URLs are owned values built from copies, never aliases

use std::borrow::Cow;
use std::fmt;

use axum::http::{Request, Uri};
use serde::{Deserialize, Serialize};

use crate::routing::matcher::{
    clean_path, decode_path, encode_path, eq_fold, is_absolute, join_paths, path_contains,
    relative_path,
};

/// Errors raised when handing a destination to the transport.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("invalid destination URL {url}: {source}")]
    InvalidDestination {
        url: String,
        #[source]
        source: axum::http::Error,
    },
}

/// Read-only view of the parts of an incoming request used for routing.
#[derive(Debug, Clone, Copy)]
pub struct RequestView<'a> {
    host: &'a str,
    uri: &'a Uri,
}

impl<'a> RequestView<'a> {
    pub fn new(host: &'a str, uri: &'a Uri) -> Self {
        Self { host, uri }
    }

    /// Builds a view from an HTTP request.
    ///
    /// The host comes from the `Host` header, falling back to the URI
    /// authority (HTTP/2 requests carry `:authority` instead). A request with
    /// neither gets an empty host.
    pub fn from_request<B>(req: &'a Request<B>) -> Self {
        let host = req
            .headers()
            .get(axum::http::header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| req.uri().authority().map(|a| a.as_str()))
            .unwrap_or_default();
        Self::new(host, req.uri())
    }

    pub fn host(&self) -> &'a str {
        self.host
    }

    /// The path as sent, still percent-encoded.
    pub fn path(&self) -> &'a str {
        self.uri.path()
    }

    /// The percent-decoded path used for matching.
    pub fn decoded_path(&self) -> Cow<'a, str> {
        decode_path(self.uri.path())
    }

    pub fn query(&self) -> Option<&'a str> {
        self.uri.query()
    }

    pub fn uri(&self) -> &'a Uri {
        self.uri
    }
}

/// A forwarding rule mapping an inbound host + path to an outbound
/// scheme + host + path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Rule {
    /// Host to match against the request's Host.
    #[serde(alias = "SourceHost")]
    pub source_host: String,

    /// Path prefix to match. A non-absolute value matches any path.
    #[serde(alias = "SourcePath")]
    pub source_path: String,

    /// Host written into the destination URL.
    #[serde(alias = "DestHost")]
    pub dest_host: String,

    /// Base path the relative remainder is appended to. Empty means root.
    #[serde(alias = "DestPath")]
    pub dest_path: String,

    /// Scheme of the destination URL (`http` or `https`).
    #[serde(alias = "DestScheme")]
    pub dest_scheme: String,

    /// Match `source_host` case-sensitively.
    #[serde(alias = "CaseSensitiveHost")]
    pub case_sensitive_host: bool,

    /// Match `source_path` case-sensitively.
    #[serde(alias = "CaseSensitivePath")]
    pub case_sensitive_path: bool,

    /// Normalize the request path before matching, e.g. `/foo/../bar`
    /// becomes `/bar`.
    #[serde(alias = "CleanRequestPath")]
    pub clean_request_path: bool,
}

impl Default for Rule {
    fn default() -> Self {
        Self {
            source_host: String::new(),
            source_path: String::new(),
            dest_host: String::new(),
            dest_path: String::new(),
            dest_scheme: "http".to_string(),
            case_sensitive_host: false,
            case_sensitive_path: false,
            clean_request_path: false,
        }
    }
}

impl Rule {
    /// Returns true if the rule applies to any path on its host.
    pub fn is_catch_all(&self) -> bool {
        !is_absolute(&self.source_path)
    }

    /// Returns true if `host` satisfies this rule's host policy.
    pub fn matches_host(&self, host: &str) -> bool {
        if self.case_sensitive_host {
            self.source_host == host
        } else {
            eq_fold(&self.source_host, host)
        }
    }

    /// Determines whether a request matches the source side of this rule.
    pub fn matches_request(&self, req: &RequestView<'_>) -> bool {
        if !self.matches_host(req.host()) {
            return false;
        }

        // Relative source path: any path on the host. Absolute source path:
        // the request path must be absolute too.
        if self.is_catch_all() {
            return true;
        }
        let path = self.request_path(req);
        is_absolute(&path) && path_contains(&self.source_path, &path, self.case_sensitive_path)
    }

    /// Computes the URL a matched request should be forwarded to.
    ///
    /// The result is unspecified unless [`Rule::matches_request`] returned
    /// true for the same request.
    pub fn destination_url(&self, req: &RequestView<'_>) -> DestinationUrl {
        let path = if self.is_catch_all() {
            req.path().to_string()
        } else {
            let rel = encode_path(&relative_path(
                &self.source_path,
                &self.request_path(req),
                self.case_sensitive_path,
            ));
            if self.dest_path.is_empty() {
                format!("/{rel}")
            } else {
                join_paths(&self.dest_path, &rel)
            }
        };

        DestinationUrl {
            scheme: self.dest_scheme.clone(),
            host: self.dest_host.clone(),
            path,
            query: req.query().map(str::to_string),
        }
    }

    /// The decoded request path, cleaned when the rule asks for it.
    fn request_path<'a>(&self, req: &RequestView<'a>) -> Cow<'a, str> {
        let decoded = req.decoded_path();
        if self.clean_request_path {
            Cow::Owned(clean_path(&decoded))
        } else {
            decoded
        }
    }
}

/// The URL a request is forwarded to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestinationUrl {
    pub scheme: String,
    pub host: String,
    pub path: String,
    pub query: Option<String>,
}

impl DestinationUrl {
    /// Builds an absolute [`Uri`] for the transport.
    pub fn to_uri(&self) -> Result<Uri, RoutingError> {
        let path_and_query = match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        };

        Uri::builder()
            .scheme(self.scheme.as_str())
            .authority(self.host.as_str())
            .path_and_query(path_and_query)
            .build()
            .map_err(|source| RoutingError::InvalidDestination {
                url: self.to_string(),
                source,
            })
    }
}

impl fmt::Display for DestinationUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.host, self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{}", query)?;
        }
        Ok(())
    }
}
