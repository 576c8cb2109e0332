pub mod attempts;
pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod countdown_task;
pub mod dto;
pub mod forms;
pub mod learning;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

pub use middleware::require_auth;
pub use ws_handler::quiz_ws_handler;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use state::AppState;
use std::sync::Arc;

/// Builds every API route. Catalog reads, plans, contact and auth are public;
/// the rest require a valid `session` cookie.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/catalog", get(catalog::catalog_handler))
        .route("/quizzes/{quiz_id}", get(learning::get_quiz_handler))
        .route("/plans", get(rest::list_plans_handler))
        .route("/contact", post(rest::contact_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/bookmarks", get(catalog::list_bookmarks_handler))
        .route(
            "/bookmarks/{clip_id}/toggle",
            post(catalog::toggle_bookmark_handler),
        )
        .route("/courses/{course_id}", get(learning::get_course_handler))
        .route(
            "/courses/{course_id}/clips/{clip_id}/complete",
            post(learning::complete_clip_handler),
        )
        .route(
            "/quizzes/{quiz_id}/attempts",
            get(learning::list_attempts_handler).post(learning::submit_attempt_handler),
        )
        .route("/certificates", get(learning::list_certificates_handler))
        .route(
            "/checkout",
            get(checkout::get_checkout_handler).delete(checkout::reset_checkout_handler),
        )
        .route("/checkout/actions", post(checkout::checkout_action_handler))
        .route("/checkout/promo", post(checkout::apply_promo_handler))
        .route("/checkout/submit", post(checkout::submit_checkout_handler))
        .route("/quiz/ws", get(quiz_ws_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .with_state(app_state)
}
