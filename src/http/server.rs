//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the vhost dispatcher as fallback
//! - Wire up middleware (tracing, timeout, request ID)
//! - Translate dispatch outcomes into HTTP responses
//! - Serve until the shutdown signal fires

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::http::dispatch::{dispatch, DispatchError};
use crate::http::request::{context_from_request, request_id};
use crate::vhosts::Vhosts;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub vhosts: Arc<Vhosts>,
    pub max_body_bytes: usize,
}

/// HTTP front end routing every request by hostname.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
}

impl HttpServer {
    /// Create a new HTTP server dispatching into `vhosts`.
    pub fn new(config: ServiceConfig, vhosts: Arc<Vhosts>) -> Self {
        let state = AppState {
            vhosts,
            max_body_bytes: config.timeouts.max_body_bytes,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        Router::new()
            .fallback(vhost_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

/// Fallback handler: dispatch by hostname.
async fn vhost_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request_id(request.headers()).to_string();

    let mut ctx = match context_from_request(request, state.max_body_bytes).await {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
            return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %ctx.method(),
        hostname = %ctx.hostname(),
        path = %ctx.uri().path(),
        "Dispatching request"
    );

    match dispatch(&state.vhosts, &mut ctx) {
        Ok(()) => ctx.into_response(),
        Err(DispatchError::NotFound(hostname)) => {
            tracing::debug!(request_id = %request_id, hostname = %hostname, "No vhost matched");
            (StatusCode::NOT_FOUND, "Not Found").into_response()
        }
        Err(DispatchError::ErrorHandler(err)) => {
            tracing::error!(request_id = %request_id, error = %err, "Vhost error handler failed");
            (err.status, err.message).into_response()
        }
    }
}
