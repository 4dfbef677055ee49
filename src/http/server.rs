//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router that hands every request to the dispatcher
//! - Wire up middleware (tracing, timeout, request ID)
//! - Buffer bounded bodies and convert between axum and dispatch types
//! - Bind server to listener with graceful shutdown

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request as AxumRequest, State},
    http::StatusCode,
    response::{IntoResponse, Response as AxumResponse},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ListenerConfig;
use crate::dispatch::Dispatcher;
use crate::http::Request;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub max_body_bytes: usize,
}

/// Axum front end for a [`Dispatcher`].
pub struct HttpServer {
    router: Router,
    config: ListenerConfig,
}

impl HttpServer {
    pub fn new(dispatcher: Arc<Dispatcher>, config: ListenerConfig) -> Self {
        let state = AppState {
            dispatcher,
            max_body_bytes: config.max_body_bytes,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ListenerConfig, state: AppState) -> Router {
        Router::new().fallback(dispatch_handler).with_state(state).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs))),
        )
    }

    /// The configured router, for serving or in-process calls.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }
}

/// Convert, dispatch on the blocking pool, convert back.
async fn dispatch_handler(State(state): State<AppState>, request: AxumRequest) -> AxumResponse {
    let (parts, body) = request.into_parts();
    let dispatcher = state.dispatcher;

    let bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, limit = state.max_body_bytes, "Request body rejected");
            return dispatcher
                .get_error_response(StatusCode::PAYLOAD_TOO_LARGE, None)
                .into_response();
        }
    };

    let request = match Request::from_http(&parts, &bytes) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed request target");
            return dispatcher
                .get_error_response(StatusCode::BAD_REQUEST, None)
                .into_response();
        }
    };

    let span = tracing::Span::current();
    let worker = Arc::clone(&dispatcher);
    match tokio::task::spawn_blocking(move || span.in_scope(|| worker.route_request(request))).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Dispatch task failed");
            dispatcher
                .get_error_response(StatusCode::INTERNAL_SERVER_ERROR, None)
                .into_response()
        }
    }
}

/// Wait for shutdown signal (Ctrl+C).
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
