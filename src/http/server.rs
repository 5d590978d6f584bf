//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (CORS, request ID, tracing, timeout, auth)
//! - Start the one-shot mirror selection off the request path
//! - Bind server to listener and shut down gracefully

use axum::{
    body::Body,
    http::Request,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::feed::{ContentRewriter, FeedFetcher};
use crate::http::auth::require_auth;
use crate::http::cors::cors_middleware;
use crate::http::handlers::{get_feed, get_image, get_instances, health, not_found, subscribe};
use crate::http::request::{propagate_request_id_layer, request_id_of, set_request_id_layer};
use crate::image::ImageStreamer;
use crate::lifecycle::shutdown::recv_shutdown;
use crate::mirrors::{MirrorProbe, MirrorResolver};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub mirrors: Arc<MirrorResolver>,
    pub feeds: FeedFetcher,
    pub rewriter: Arc<ContentRewriter>,
    pub images: ImageStreamer,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    mirrors: Arc<MirrorResolver>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> reqwest::Result<Self> {
        let mirrors = Arc::new(MirrorResolver::new(&config.mirrors));

        let state = AppState {
            config: Arc::new(config.clone()),
            mirrors: mirrors.clone(),
            feeds: FeedFetcher::new(Duration::from_secs(config.timeouts.feed_secs))?,
            rewriter: Arc::new(ContentRewriter::new(config.server_url.as_str())),
            images: ImageStreamer::new(Duration::from_secs(config.timeouts.image_secs))?,
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            mirrors,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let protected = Router::new()
            .route("/api/rss", get(get_feed))
            .route("/api/subscribe", post(subscribe))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

        let open = Router::new()
            .route("/api/image", get(get_image))
            .route("/api/rsshub/instances", get(get_instances))
            .route("/health", get(health))
            .route("/", get(health));

        Router::new()
            .merge(protected)
            .merge(open)
            .fallback(not_found)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %request_id_of(request),
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }))
            .layer(set_request_id_layer())
            .layer(middleware::from_fn(cors_middleware))
    }

    /// Shared mirror resolver.
    pub fn mirrors(&self) -> Arc<MirrorResolver> {
        self.mirrors.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            server_url = %self.config.server_url,
            auth = self.config.auth_token().is_some(),
            "HTTP server starting"
        );

        if self.config.mirrors.probe_on_startup {
            MirrorProbe::new(
                self.mirrors.clone(),
                Duration::from_secs(self.config.mirrors.probe_timeout_secs),
            )
            .spawn();
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(recv_shutdown(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
