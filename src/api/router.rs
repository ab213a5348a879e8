//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`. Browsing (doctors, slots, health)
//! and auth are public; everything else goes through the bearer-token
//! middleware, which injects `AuthContext` for the handlers.
//!
//! NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::config;

/// Build the API router.
pub fn api_router(ctx: ApiContext) -> Router {
    // Public routes — no auth, browsing and account creation
    let public = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/register", post(endpoints::auth::register))
        .route("/auth/login", post(endpoints::auth::login))
        .route("/doctors", get(endpoints::doctors::list))
        .route("/doctors/:id", get(endpoints::doctors::detail))
        .route(
            "/appointments/slots/:doctor_id/:date",
            get(endpoints::appointments::slots),
        )
        .with_state(ctx.clone());

    // Protected routes — require a valid bearer token.
    // Extension must be outermost so the middleware can extract ApiContext.
    let protected = Router::new()
        .route("/doctors/profile", put(endpoints::doctors::update_profile))
        .route("/doctors/:id/reviews", post(endpoints::doctors::add_review))
        .route("/doctors/admin/all", get(endpoints::doctors::admin_all))
        .route(
            "/doctors/admin/approve/:id",
            put(endpoints::doctors::admin_approve),
        )
        .route("/appointments/book", post(endpoints::appointments::book))
        .route(
            "/appointments/patient",
            get(endpoints::appointments::patient_list),
        )
        .route(
            "/appointments/doctor",
            get(endpoints::appointments::doctor_list),
        )
        .route("/appointments/:id", get(endpoints::appointments::detail))
        .route(
            "/appointments/cancel/:id",
            put(endpoints::appointments::cancel),
        )
        .route(
            "/appointments/confirm/:id",
            put(endpoints::appointments::confirm),
        )
        .route(
            "/appointments/complete/:id",
            put(endpoints::appointments::complete),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::Extension(ctx));

    Router::new()
        .nest("/api", public)
        .nest("/api", protected)
        .layer(cors_layer())
}

/// CORS for the SPA client. One configured origin; bearer auth means
/// no cookies, so credentials stay off.
fn cors_layer() -> CorsLayer {
    let origin = config::cors_origin();
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    match HeaderValue::from_str(&origin) {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            tracing::warn!(origin, "Invalid CORS origin, allowing any");
            layer.allow_origin(Any)
        }
    }
}
