//! HTTP surface: the pixel endpoint and a health check.
//!
//! The endpoint is a pass-through to the pipeline. Whatever happens inside
//! the chain, the caller gets the same pixel back.

mod pixel;

pub use pixel::{PIXEL_CONTENT_TYPE, PIXEL_GIF};

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::http::Request;
use axum::routing::get;
use tower_http::trace::TraceLayer;
use tracing::Level;

use crate::error::Result;
use crate::pipeline::Chain;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub chain: Arc<Chain>,
}

impl AppState {
    pub fn new(chain: Chain) -> Self {
        Self {
            chain: Arc::new(chain),
        }
    }
}

/// Build the router.
///
/// - `GET /pixel` - beacon endpoint, always answers with a 1x1 GIF
/// - `GET /health` - liveness check
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/pixel", get(pixel::pixel))
        .route("/health", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::span!(
                    Level::DEBUG,
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}

/// Serve `state` on an already-bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: tokio::net::TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(addr = %addr, steps = ?state.chain.step_names(), "starting pixel server");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("pixel server stopped");
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}
