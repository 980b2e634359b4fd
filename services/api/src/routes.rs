//! API service routes
//!
//! Everything lives under `/api`. Browsing events and their packages is
//! public; every other endpoint passes through [`auth_middleware`] and
//! checks the caller's role in the handler.

use axum::{
    Json, Router,
    extract::State,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{middleware::auth_middleware, state::AppState};

pub mod admin;
pub mod auth;
pub mod deals;
pub mod events;
pub mod packages;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let auth = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/profile", get(auth::profile))
        .route("/users/:user_id", get(auth::get_user))
        .route("/sponsors", get(events::list_sponsors))
        .route("/events/organizer", get(events::list_organizer_events))
        .route(
            "/events/:event_id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/:event_id/interest", post(events::express_interest))
        .route(
            "/events/:event_id/interested-sponsors",
            get(events::interested_sponsors),
        )
        .route(
            "/events/:event_id/packages/interested-sponsors",
            get(packages::interested_sponsors),
        )
        .route(
            "/packages/:package_id/interest",
            post(packages::express_interest).delete(packages::withdraw_interest),
        )
        .route("/deals/pending", get(deals::pending_deals))
        .route("/deals/my", get(deals::my_deals))
        .route("/deals/:deal_id", get(deals::get_deal))
        .route("/deals/:deal_id/assign", post(deals::assign))
        .route(
            "/deals/:deal_id/chat",
            get(deals::get_chat).post(deals::send_message),
        )
        .route("/deals/:deal_id/status", patch(deals::update_status))
        .route("/admin/sponsors/pending", get(admin::pending_sponsors))
        .route(
            "/admin/sponsors/:application_id/approve",
            post(admin::approve_sponsor),
        )
        .route(
            "/admin/sponsors/:application_id/reject",
            post(admin::reject_sponsor),
        )
        .route("/admin/users/:user_id/deactivate", post(admin::deactivate_user))
        .route_layer(auth.clone());

    // Paths shared by a public read and an authenticated write
    let mixed_routes = Router::new()
        .route(
            "/events",
            get(events::list_public_events)
                .merge(post(events::create_event).route_layer(auth.clone())),
        )
        .route(
            "/events/:event_id/packages",
            get(packages::list_packages)
                .merge(post(packages::replace_packages).route_layer(auth)),
        );

    let api = Router::new()
        .route("/health", get(health_check))
        .route("/auth/login", post(auth::login))
        .route("/auth/signup", post(auth::signup))
        .merge(mixed_routes)
        .merge(protected_routes);

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "status": "ok",
        "storage": state.repositories.backend().as_str(),
        "database": state.repositories.database_status().await,
    }))
}
