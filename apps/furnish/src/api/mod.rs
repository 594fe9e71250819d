//! # HTTP Server
//!
//! axum router serving the catalog as server-rendered HTML.
//!
//! ```text
//! GET       /                               -> 303 /furniture/
//! GET       /furniture/                     list (public)
//! GET       /furniture/mine/                own items
//! GET|POST  /furniture/details/{id}/        detail, post review
//! GET|POST  /furniture/create/              create
//! GET|POST  /furniture/edit/{id}/           edit (owner or superuser)
//! GET|POST  /furniture/delete/{id}/         delete (owner or superuser)
//! GET|POST  /furniture/material/create/     new material
//! GET       /health                         JSON liveness
//! ```
//!
//! Everything except the public listing and `/health` needs HTTP Basic
//! credentials of a catalog user. An `{id}` that is not a decimal number is
//! treated like an unknown id (404).

pub mod auth;
pub mod error;
pub mod handlers;
pub mod pages;

use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::CONTENT_LENGTH;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use error::{AppError, StatusPage};
use furnish_core::Catalog;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

// =============================================================================
// STATE
// =============================================================================

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The catalog. Page views share the read lock; submissions take the write lock.
    pub catalog: Arc<RwLock<Catalog>>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl AppState {
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(RwLock::new(catalog)),
            limiter: None,
        }
    }

    /// Cap the whole server at `per_second` requests per second.
    ///
    /// Zero disables the limit.
    #[must_use]
    pub fn with_rate_limit(mut self, per_second: u32) -> Self {
        self.limiter = NonZeroU32::new(per_second)
            .map(|rate| Arc::new(RateLimiter::direct(Quota::per_second(rate))));
        self
    }
}

async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            tracing::warn!(path = %request.uri().path(), "rate limited");
            return AppError::RateLimited.into_response();
        }
    }
    next.run(request).await
}

/// Re-render 403/404 pages with the navigation of the user who asked.
async fn personalize_status_pages(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let credentials = auth::basic_credentials(&parts);
    let response = next.run(Request::from_parts(parts, body)).await;

    let Some(kind) = response.extensions().get::<StatusPage>().copied() else {
        return response;
    };
    let Some((username, password)) = credentials else {
        return response;
    };
    let Ok(user) = state.catalog.read().await.authenticate(&username, &password) else {
        return response;
    };
    let (mut head, _) = response.into_parts();
    head.headers.remove(CONTENT_LENGTH);
    Response::from_parts(head, Body::from(kind.render(Some(&user))))
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/furniture/", get(handlers::furniture_list))
        .route("/furniture/mine/", get(handlers::user_furniture_list))
        .route(
            "/furniture/details/{id}/",
            get(handlers::furniture_detail).post(handlers::post_review),
        )
        .route(
            "/furniture/create/",
            get(handlers::create_form).post(handlers::create_submit),
        )
        .route(
            "/furniture/edit/{id}/",
            get(handlers::edit_form).post(handlers::edit_submit),
        )
        .route(
            "/furniture/delete/{id}/",
            get(handlers::delete_form).post(handlers::delete_submit),
        )
        .route(
            "/furniture/material/create/",
            get(handlers::material_form).post(handlers::material_submit),
        )
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            personalize_status_pages,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "furnish listening");
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
