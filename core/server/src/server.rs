//! Router assembly and the Unix socket listener.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::auth::require_session;
use crate::routes;
use crate::state::AppState;

/// Build the router with all routes registered.
pub fn build_router(state: Arc<AppState>) -> Router {
    let sensitive = Router::new()
        .route(
            "/entries",
            get(routes::list_entries).post(routes::create_entry),
        )
        .route(
            "/entries/{id}",
            get(routes::get_entry).delete(routes::delete_entry),
        )
        .route("/entries/{id}/secrets", post(routes::add_secret))
        .route(
            "/entries/{id}/secrets/{label}",
            get(routes::reveal_secret).delete(routes::delete_secret),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_session,
        ));

    Router::new()
        .route("/status", get(routes::status))
        .route("/types", get(routes::types))
        .route("/initialize", post(routes::initialize))
        .route("/unlock", post(routes::unlock))
        .route("/lock", post(routes::lock))
        .merge(sensitive)
        .with_state(state)
}

/// Serve on the configured Unix socket until Ctrl-C.
///
/// # Postconditions
/// - The socket file is owner-only (0600) while serving and removed after
///
/// # Errors
/// - `Io` if the socket cannot be bound or serving fails
#[cfg(unix)]
pub async fn serve_unix(
    config: &crate::config::ServerConfig,
    state: Arc<AppState>,
) -> resivault_common::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    use tokio::net::UnixListener;
    use tracing::info;

    let path = &config.socket_path;
    match std::fs::remove_file(path) {
        Ok(()) => info!(socket = %path.display(), "Removed stale socket"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let listener = UnixListener::bind(path)?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    info!(socket = %path.display(), "Starting server");

    let router = build_router(state.clone());
    let result = axum::serve(listener, router)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await;

    state.vault.lock().await.lock();
    std::fs::remove_file(path).ok();
    info!("Server stopped");
    result.map_err(Into::into)
}
