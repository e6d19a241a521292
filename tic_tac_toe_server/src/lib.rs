//! Shared property store relay.
//!
//! Clients join a space over `/ws` and receive its full public/protected
//! property snapshot. Every write to a space is announced to everyone who
//! joined it, the writer included, in the order the writes were applied.

pub mod app_state;
pub mod cleanup;
pub mod config;
pub mod store;
pub mod ws_socket;

use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use app_state::AppState;
use ws_socket::ws_handler;

pub const UPDATE_CHANNEL_CAPACITY: usize = 500;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    axum::serve(listener, router(state).into_make_service()).await?;
    Ok(())
}
