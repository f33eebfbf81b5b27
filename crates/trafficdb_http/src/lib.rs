//! JSON over HTTP access to a [`CrudEngine`].

pub mod errors;
pub mod handlers;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use trafficdb_core::CrudEngine;

use errors::ServerResult;
use handlers::ServerState;

/// Build the router with all routes attached.
pub fn router(engine: CrudEngine) -> Router {
    let state = Arc::new(ServerState { engine });

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/tables", get(handlers::list_tables))
        .route("/tables/:table/columns", get(handlers::list_columns))
        .route("/tables/:table/count", get(handlers::count_records))
        .route(
            "/tables/:table/records",
            get(handlers::read_records)
                .post(handlers::create_record)
                .put(handlers::update_record)
                .delete(handlers::delete_record),
        )
        .route("/tables/:table/exists", post(handlers::record_exists))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve requests on `listener` until `shutdown` completes.
pub async fn serve(
    listener: TcpListener,
    engine: CrudEngine,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> ServerResult<()> {
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(engine))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("server shut down");
    Ok(())
}
