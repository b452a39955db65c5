//! Backend for a tutoring business website: public course, video, notes, live class and
//! testimonial listings, a contact form that records leads, and an admin back office.
//!
//!
//!
//! # General Infrastructure
//! - Frontend renders public pages from the read-only list endpoints
//! - Admin pages talk to the session-gated CRUD and import endpoints
//! - All persistence goes through one [`database::Store`], Redis in production
//! - Each admin action is a single request awaited to completion, no background work
//!
//!
//!
//! # Endpoints
//!
//! Public
//! - `GET /api/{resource}`: list, inquiries excluded
//! - `POST /api/contact`: urlencoded contact form, stored as an inquiry
//! - `POST /api/admin/login`, `POST /api/admin/logout`
//!
//! Admin (session cookie required)
//! - `GET /api/admin/{resource}`: full list
//! - `POST /api/admin/{resource}`: create, any id in the body is ignored
//! - `PUT /api/admin/{resource}`: update, id carried in the body
//! - `DELETE /api/admin/{resource}?id=N`: delete
//! - `POST /api/import/{resource}`: CSV as `text/csv` or multipart field `file`, answers `{inserted}`
//!
//! Resources: `courses`, `testimonials`, `demo-videos`, `study-materials`, `inquiries`,
//! `recorded-videos`, `live-classes`.
//!
//! Errors are always `{error: message}` with a non-2xx status. Store messages pass through verbatim
//! so the operator sees exactly why a write was refused.
//!
//!
//!
//! # Notes
//!
//! ## Ids
//! New records take `max(id) + 1`. This is a read then a write, so two operators creating at the
//! same instant can collide. The store refuses the second insert instead of duplicating the id.
//!
//! ## Refetch After Mutation
//! Admin pages never patch their list locally. Every successful write is followed by a full list
//! read, which is cheap at this table size and keeps the view honest.
//!
//! ## CSV Import
//! Imports skip the form validation on purpose, the operator's file is trusted. Rows missing
//! required columns still fail the store's not-null rule and the batch is refused as a whole.
//!
//!
//!
//! # Setup
//!
//! Environment
//! - `RUST_PORT`: default 1111
//! - `STORE_URL`: `memory://` (default) or `redis://host:6379`
//! - `ALLOWED_ORIGIN`: frontend origin for CORS, default `http://localhost:3000`
//! - `SESSION_TTL_SECS`: admin session lifetime, default 12 hours
//!
//! Secrets, read from `/run/secrets/<NAME>` or the environment
//! - `ADMIN_PASSWORD`
//! - `SESSION_SECRET`
//!
//! Run locally.
//! ```sh
//! ADMIN_PASSWORD=changeme SESSION_SECRET=dev RUST_LOG=info cargo run --bin tutor
//! ```
//!
//! Bulk load from CSV.
//! ```sh
//! cargo run --bin tutor-import -- --password changeme courses=courses.csv live-classes=live.csv
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::CONTENT_TYPE,
    },
    middleware::from_fn_with_state,
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod client;
pub mod config;
pub mod controller;
pub mod database;
pub mod error;
pub mod gateway;
pub mod import;
pub mod memory;
pub mod routes;
pub mod schema;
pub mod session;
pub mod state;
pub mod table;
pub mod utils;
pub mod validation;
pub mod youtube;

use error::AppError;
use routes::{
    contact_handler, create_handler, delete_handler, health_handler, import_handler,
    import_info_handler, list_handler, login_handler, logout_handler, public_list_handler,
    update_handler,
};
use session::require_session;
use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Result<Router, AppError> {
    let origin = HeaderValue::from_str(&state.config.allowed_origin)
        .map_err(|e| AppError::Config(format!("ALLOWED_ORIGIN: {e}")))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60));

    let admin = Router::new()
        .route(
            "/api/admin/{resource}",
            get(list_handler)
                .post(create_handler)
                .put(update_handler)
                .delete(delete_handler),
        )
        .route(
            "/api/import/{resource}",
            get(import_info_handler).post(import_handler),
        )
        .route_layer(from_fn_with_state(state.clone(), require_session));

    let app = Router::new()
        .route("/healthz", get(health_handler))
        .route("/api/contact", post(contact_handler))
        .route("/api/admin/login", post(login_handler))
        .route("/api/admin/logout", post(logout_handler))
        .route("/api/{resource}", get(public_list_handler))
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    Ok(app)
}

pub async fn start_server() -> Result<(), AppError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await?;

    info!("Starting server...");
    let address = format!("0.0.0.0:{}", state.config.port);
    let app = build_router(state)?;

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| AppError::InternalError(Box::new(e)))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::InternalError(Box::new(e)))?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
