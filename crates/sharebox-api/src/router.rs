//! Route definitions for the Sharebox HTTP API.
//!
//! Public share routes live under `/share`; health and the admin API are
//! mounted under `/api`. The router receives `AppState` and passes it to all
//! handlers via Axum's `State` extractor.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
///
/// Receives the fully-constructed `AppState` and threads it through
/// every route via `.with_state(state)`.
pub fn build_router(state: AppState) -> Router {
    let max_upload =
        usize::try_from(state.config.storage.max_upload_size_bytes).unwrap_or(usize::MAX);

    let api_routes = Router::new()
        .merge(health_routes())
        .merge(admin_share_routes())
        .merge(admin_file_routes());

    Router::new()
        .nest("/api", api_routes)
        .merge(share_routes())
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::security_headers::security_headers,
        ))
        .layer(axum_middleware::from_fn(
            middleware::logging::request_logging,
        ))
        .with_state(state)
}

/// Public share endpoints. `GET` routes also answer `HEAD`.
fn share_routes() -> Router<AppState> {
    Router::new()
        .route("/share/download/{token}", get(handlers::share::download))
        .route(
            "/share/upload/{token}",
            get(handlers::share::upload_info).post(handlers::share::upload),
        )
}

/// Health check
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}

/// Admin share management
fn admin_share_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/shares", get(handlers::admin::shares::list_shares))
        .route(
            "/admin/shares/download",
            post(handlers::admin::shares::create_download_share),
        )
        .route(
            "/admin/shares/upload",
            post(handlers::admin::shares::create_upload_share),
        )
        .route(
            "/admin/shares/{token}",
            delete(handlers::admin::shares::revoke_share),
        )
}

/// Admin file browser
fn admin_file_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/admin/files",
            get(handlers::admin::files::list_directory)
                .post(handlers::admin::files::upload_files)
                .delete(handlers::admin::files::delete_file),
        )
        .route(
            "/admin/directories",
            post(handlers::admin::files::create_directory)
                .delete(handlers::admin::files::delete_directory),
        )
        .route("/admin/move", post(handlers::admin::files::move_entries))
        .route("/admin/raw/{*key}", get(handlers::admin::files::raw_file))
}
