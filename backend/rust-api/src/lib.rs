use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod repository;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(middlewares::request_id::REQUEST_ID_HEADER),
        ])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        .nest("/api", api_routes(app_state.clone()))
        .with_state(app_state)
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(
            middlewares::request_id::request_id_middleware,
        ))
        .layer(cors)
}

fn api_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    public_routes(app_state.clone())
        .merge(member_routes(app_state.clone()))
        .merge(admin_routes(app_state))
}

fn public_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    let register_route = Router::new()
        .route("/register", post(handlers::auth::register))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            middlewares::rate_limit::register_rate_limit_middleware,
        ));

    let login_route = Router::new()
        .route("/login", post(handlers::auth::login))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::rate_limit::login_rate_limit_middleware,
        ));

    let catalog_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/modules", get(handlers::modules::list_modules))
        .route("/modules/{id}", get(handlers::modules::get_module))
        .route("/mentors", get(handlers::mentorship::list_mentors));

    register_route.merge(login_route).merge(catalog_routes)
}

/// Any authenticated user; role checks happen in the services.
fn member_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        // Learning
        .route(
            "/modules/{id}/complete",
            post(handlers::modules::complete_module),
        )
        .route("/modules/{id}/quiz", get(handlers::quiz::get_quiz))
        .route(
            "/modules/{id}/quiz/submit",
            post(handlers::quiz::submit_quiz),
        )
        // Opportunities
        .route(
            "/opportunities",
            get(handlers::opportunities::list_opportunities)
                .post(handlers::opportunities::create_opportunity),
        )
        .route(
            "/opportunities/{id}/respond",
            post(handlers::opportunities::respond_to_opportunity),
        )
        .route("/matches", get(handlers::opportunities::list_matches))
        // Mentorship
        .route(
            "/mentors/top-learners",
            get(handlers::mentorship::top_learners),
        )
        .route(
            "/mentorship/request",
            post(handlers::mentorship::create_request),
        )
        .route(
            "/mentorship/requests",
            get(handlers::mentorship::list_requests),
        )
        .route(
            "/mentorship/requests/{id}",
            put(handlers::mentorship::update_request),
        )
        // Users
        .route("/users/{id}", get(handlers::users::get_profile))
        .route(
            "/users/{id}/reset-progress",
            post(handlers::users::reset_progress),
        )
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ))
}

fn admin_routes(app_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        // Module management
        .route("/modules", post(handlers::modules::create_module))
        .route(
            "/modules/{id}",
            put(handlers::modules::update_module).delete(handlers::modules::delete_module),
        )
        .route("/admin/modules", post(handlers::modules::create_module))
        .route(
            "/admin/modules/{id}",
            put(handlers::modules::update_module).delete(handlers::modules::delete_module),
        )
        // Accounts and recommendations
        .route("/admin/create-admin", post(handlers::auth::create_admin))
        .route("/admin/users", get(handlers::admin::list_users))
        .route("/admin/recommend", post(handlers::admin::recommend))
        .route(
            "/admin/recommendations",
            get(handlers::admin::list_recommendations),
        )
        .route_layer(middleware::from_fn(
            middlewares::auth::admin_guard_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::auth::auth_middleware,
        ))
}
