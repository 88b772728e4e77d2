//! HTTP API.
//!
//! Request bodies may be JSON or urlencoded forms. The conversation user is taken from
//! the `x-user-id` header and defaults to `default_user`.

mod error;
mod extract;
mod handlers;

pub use error::ApiError;
pub use extract::JsonOrForm;

use crate::tts::TtsUrlBuilder;
use crate::tutor::Tutor;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

/// Shared application state.
pub struct AppState {
    pub tutor: Arc<Tutor>,
    pub tts: TtsUrlBuilder,
}

/// Build the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/chat/process_transcript", post(handlers::process_transcript))
        .route("/chat/process_input", post(handlers::process_input))
        .route(
            "/chat/history/{video_id}",
            get(handlers::chat_history).delete(handlers::clear_history),
        )
        .route("/player/process_video", post(handlers::process_video))
        .route("/player/explain", post(handlers::explain))
        .route("/podcast/generate_script", post(handlers::generate_script))
        .route("/podcast/generate_audio", post(handlers::generate_audio))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}

/// Serve the API until Ctrl+C or SIGTERM.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Resolves on Ctrl+C or SIGTERM. Either way in-flight requests finish and their
/// child processes and scratch directories are dropped.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down");
}
