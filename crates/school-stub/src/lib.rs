#![allow(non_snake_case)]

//! In-memory stand-in for the school management REST API.

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

pub use crate::state::StubState;

pub fn stub_router(state: StubState) -> Router {
    let apiRoutes = routes::api_routes(state.clone());
    let authRoutes = middleware::auth::auth_routes();

    Router::new()
        .merge(apiRoutes)
        .merge(authRoutes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::record_hit,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the stub on `addr` until the task is dropped or the server fails.
pub async fn serve(state: StubState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("stub listening on {}", listener.local_addr()?);
    axum::serve(listener, stub_router(state).into_make_service()).await
}

/// Binds an ephemeral localhost port and serves the stub in the background.
pub async fn spawn(state: StubState) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = stub_router(state);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app.into_make_service()).await {
            tracing::error!("stub server exited: {e}");
        }
    });

    Ok((addr, handle))
}
