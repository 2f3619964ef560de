use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::config;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::handlers;
use crate::middleware::{admin_auth_middleware, jwt_auth_middleware, optional_auth_middleware};
use crate::state::AppState;

/// Full application router: public, authenticated and administrator groups
/// plus the uploads directory and the global layers.
pub fn build_router(state: AppState) -> Router {
    let api = &config().api;

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes(&state))
        .merge(protected_routes(&state))
        .merge(admin_routes(&state))
        .nest_service("/uploads", ServeDir::new(&config().storage.upload_dir))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer())
                .layer(DefaultBodyLimit::max(api.max_request_size_bytes)),
        )
        .with_state(state)
}

fn public_routes(state: &AppState) -> Router<AppState> {
    use axum::routing::post;
    use handlers::public::*;

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password/:token", post(auth::reset_password))
        .route("/api/users", get(users::list))
        .route("/api/users/:id", get(users::get))
        .route("/api/projects", get(projects::list))
        .route("/api/projects/:id", get(projects::get))
        .route("/api/progress-logs", get(progress_logs::list))
        .route("/api/progress-logs/project/:project_id", get(progress_logs::list_for_project))
        .route("/api/progress-logs/:id", get(progress_logs::get))
        .route("/api/challenges", get(challenges::list))
        .route("/api/challenges/:id", get(challenges::get))
        .route("/api/grants", get(grants::list))
        .route("/api/grants/:id", get(grants::get))
        .route("/api/grant-programs", get(grant_programs::list))
        .route("/api/grant-programs/:id", get(grant_programs::get))
        .route("/api/events", get(events::list))
        .route("/api/events/:id", get(events::get))
        .route("/api/announcements", get(announcements::list))
        .route("/api/announcements/:id", get(announcements::get))
        .route_layer(from_fn_with_state(state.clone(), optional_auth_middleware))
}

fn protected_routes(state: &AppState) -> Router<AppState> {
    use axum::routing::{post, put};
    use handlers::protected::*;

    let upload_limit = DefaultBodyLimit::max(config().api.max_upload_size_bytes);

    Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/profile", put(auth::update_profile))
        .route("/api/auth/password", put(auth::change_password))
        .route("/api/projects", post(projects::create))
        .route("/api/projects/my-projects", get(projects::my_projects))
        .route("/api/projects/:id", put(projects::update).delete(projects::delete))
        .route("/api/progress-logs", post(progress_logs::create))
        .route(
            "/api/progress-logs/:id",
            put(progress_logs::update).delete(progress_logs::delete),
        )
        .route(
            "/api/challenges/:id/register",
            post(challenges::register).delete(challenges::unregister),
        )
        .route(
            "/api/events/:id/register",
            post(events::register).delete(events::unregister),
        )
        .route("/api/grant-applications", post(grant_applications::submit))
        .route(
            "/api/grant-applications/my-applications",
            get(grant_applications::my_applications),
        )
        .route(
            "/api/grant-applications/:id",
            get(grant_applications::get).delete(grant_applications::withdraw),
        )
        // `:name` is the upload kind on POST and the public id on DELETE
        .route(
            "/api/uploads/:name",
            post(uploads::upload).layer(upload_limit).delete(uploads::delete),
        )
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    use axum::middleware::from_fn;
    use axum::routing::{patch, post, put};
    use handlers::elevated::*;

    Router::new()
        .route("/api/projects/:id/featured", patch(projects::toggle_featured))
        .route("/api/challenges", post(challenges::create))
        .route("/api/challenges/:id", put(challenges::update).delete(challenges::delete))
        .route("/api/challenges/:id/participants", get(challenges::participants))
        .route("/api/challenges/:id/winners", put(challenges::set_winners))
        .route("/api/grants", post(grants::create))
        .route("/api/grants/:id", put(grants::update).delete(grants::delete))
        .route("/api/grant-programs", post(grant_programs::create))
        .route(
            "/api/grant-programs/:id",
            put(grant_programs::update).delete(grant_programs::delete),
        )
        .route("/api/grant-programs/:id/featured", patch(grant_programs::toggle_featured))
        .route("/api/grant-programs/:id/applications", get(grant_programs::applications))
        .route("/api/grant-applications", get(grant_applications::list))
        .route("/api/grant-applications/:id/status", put(grant_applications::update_status))
        .route("/api/events", post(events::create))
        .route("/api/events/:id", put(events::update).delete(events::delete))
        .route("/api/announcements", post(announcements::create))
        .route(
            "/api/announcements/:id",
            put(announcements::update).delete(announcements::delete),
        )
        // Layers run outermost-last: the token is checked before the admin flag.
        .route_layer(from_fn(admin_auth_middleware))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware))
}

fn cors_layer() -> CorsLayer {
    if crate::is_development!() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config()
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "SheBuilds API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "auth": "/api/auth",
            "users": "/api/users",
            "projects": "/api/projects",
            "progress_logs": "/api/progress-logs",
            "challenges": "/api/challenges",
            "grants": "/api/grants",
            "grant_programs": "/api/grant-programs",
            "grant_applications": "/api/grant-applications",
            "events": "/api/events",
            "announcements": "/api/announcements",
            "uploads": "/api/uploads",
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "timestamp": now, "database": "ok" })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "timestamp": now, "database": "unavailable" })),
            )
        }
    }
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
