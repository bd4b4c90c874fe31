//! HTTP server setup and request forwarding.
//!
//! # Responsibilities
//! - Create the Axum Router with a catch-all proxy handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Dispatch requests to the routing engine
//! - Forward matched requests to the rule's destination URL
//! - Swap in new rules when the configuration is reloaded
//!
//! # Design Decisions
//! - One Router snapshot per request, loaded from an ArcSwap
//! - Headers and body pass through untouched; only the URI is rewritten
//! - No match is 404, any failure to reach the destination is 502

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Request, Response as HttpResponse, StatusCode, Version},
    response::{IntoResponse, Response},
    Router,
};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{ProxyConfig, TimeoutConfig};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::observability::metrics;
use crate::routing::{RequestView, Router as ProxyRouter};

/// Client used to reach destinations over plain HTTP or TLS.
pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Errors that stop the server from starting or serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to initialize upstream TLS: {0}")]
    Tls(#[from] rustls::Error),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<ArcSwap<ProxyRouter>>,
    pub client: UpstreamClient,
}

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    app: Router,
    router: Arc<ArcSwap<ProxyRouter>>,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let router = Arc::new(ArcSwap::from_pointee(ProxyRouter::from_config(&config)));
        let client = build_client(&config.timeouts)?;

        let state = AppState {
            router: router.clone(),
            client,
        };

        let app = Self::build_router(&config, state);
        Ok(Self {
            app,
            router,
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Every config received on `config_updates` replaces the routing rules;
    /// requests already in flight finish on the rules they started with.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            rules = self.router.load().len(),
            "HTTP server starting"
        );

        let router = self.router.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                let next = ProxyRouter::from_config(&config);
                tracing::info!(rules = next.len(), "Routing rules reloaded");
                router.store(Arc::new(next));
            }
        });

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the startup config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

fn build_client(timeouts: &TimeoutConfig) -> Result<UpstreamClient, ServerError> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

    let https = HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())?
        .https_or_http()
        .enable_http1()
        .wrap_connector(http);

    Ok(Client::builder(TokioExecutor::new()).build(https))
}

/// Main proxy handler.
/// Looks up the first matching rule and forwards to its destination.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request.request_id().to_string();
    let method = request.method().clone();

    // 1. Match Rule
    let routed = {
        let snapshot = state.router.load();
        snapshot
            .route(&RequestView::from_request(&request))
            .map(|m| (m.index, m.destination))
    };

    let Some((index, destination)) = routed else {
        let view = RequestView::from_request(&request);
        tracing::warn!(
            request_id = %request_id,
            host = %view.host(),
            path = %view.path(),
            "No rule matched"
        );
        metrics::record_rule_match("none");
        metrics::record_request(method.as_str(), 404, "none", start_time);
        return (StatusCode::NOT_FOUND, "No matching rule found").into_response();
    };

    let rule = metrics::rule_label(Some(index));
    metrics::record_rule_match(&rule);

    // 2. Build destination
    let uri = match destination.to_uri() {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, rule = index, error = %e, "Invalid destination");
            metrics::record_request(method.as_str(), 502, &rule, start_time);
            return (StatusCode::BAD_GATEWAY, "Invalid destination").into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        rule = index,
        destination = %destination,
        "Forwarding request"
    );

    // 3. Forward
    // Headers pass through unchanged, so the backend sees the client's Host,
    // not dest_host.
    let (mut parts, body) = request.into_parts();
    parts.uri = uri;
    parts.version = Version::HTTP_11;

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            metrics::record_request(method.as_str(), response.status().as_u16(), &rule, start_time);
            into_client_response(response)
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                destination = %destination,
                error = %e,
                "Upstream request failed"
            );
            metrics::record_request(method.as_str(), 502, &rule, start_time);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

fn into_client_response(response: HttpResponse<Incoming>) -> Response {
    response.map(Body::new)
}
