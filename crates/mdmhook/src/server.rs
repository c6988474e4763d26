//! HTTP ingress: the webhook endpoint, the greeting, and server startup.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use mdmhook_api::CommandClient;
use mdmhook_core::{CommandSink, CoreError, EventEnvelope, EventRouter};

use crate::config::RelayConfig;
use crate::error::RelayError;

/// Body served for every GET; doubles as a liveness check.
pub const GREETING: &str = "Hello, world!";

/// Largest event body accepted. Inventory reports for devices with many
/// apps run to several megabytes.
pub const MAX_EVENT_BYTES: usize = 64 * 1024 * 1024;

/// Shared state for Axum handlers.
pub struct AppState<S> {
    pub events: Arc<EventRouter<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
        }
    }
}

/// Build the router: `POST /webhook` for events, greeting elsewhere.
pub fn router<S: CommandSink + 'static>(events: Arc<EventRouter<S>>) -> Router {
    Router::new()
        .route("/webhook", post(webhook::<S>).get(greeting))
        .fallback(greeting)
        .layer(DefaultBodyLimit::max(MAX_EVENT_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { events })
}

/// Bind, serve until Ctrl-C / SIGTERM, then report what was seen.
pub async fn serve(config: RelayConfig) -> Result<(), RelayError> {
    let client = CommandClient::new(
        config.server_url.as_str(),
        config.api_token,
        &config.transport,
    )?;
    let events = Arc::new(EventRouter::new(client));
    let app = router(Arc::clone(&events));

    let listener = TcpListener::bind(config.listen)
        .await
        .map_err(|source| RelayError::Bind {
            addr: config.listen,
            source,
        })?;

    info!(
        addr = %config.listen,
        server_url = %config.server_url,
        "webhook server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(RelayError::Server)?;

    info!(
        devices = events.registry().len(),
        enrolled = events.registry().enrolled_count(),
        "webhook server stopped"
    );
    Ok(())
}

async fn greeting() -> &'static str {
    GREETING
}

async fn webhook<S: CommandSink + 'static>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> Response {
    let event: EventEnvelope = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            error!(error = %e, "decode JSON");
            return (StatusCode::BAD_REQUEST, format!("decode JSON: {e}")).into_response();
        }
    };

    match state.events.handle(&event).await {
        Ok(outcome) => {
            debug!(?outcome, "event handled");
            StatusCode::OK.into_response()
        }
        Err(err) => IngressError(err).into_response(),
    }
}

/// HTTP mapping for [`CoreError`].
struct IngressError(CoreError);

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoreError::MissingPayload { .. } => StatusCode::BAD_REQUEST,
            CoreError::CommandDelivery { source, .. } if source.is_retryable() => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CoreError::CommandDelivery { .. } => StatusCode::BAD_GATEWAY,
        };
        (status, self.0.to_string()).into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}
