// ============================================================================
// OPENASK - anonymous Q&A and content-sharing board
// ============================================================================

// - Posts with categories, images and answers
// - One like/dislike per user per post or answer, recorded by the backend
// - Sessions issued by an external provider (JWT bearer tokens)
// - Profile display names and avatars
// - Every mutation is followed by a read-back from the backend

pub mod auth;
pub mod backend;
pub mod config;
pub mod dto;
pub mod errors;
pub mod extract;
pub mod feed;
pub mod models;
pub mod routes;
pub mod states;
pub mod uploads;

pub use states::AppState;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use routes::{answer, contact, health, interaction, post as posts, profile};

/// Build the router
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.body_limit();

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Public routes (no auth required)
        .route("/health", get(health::health_check))
        .route("/posts", get(posts::get_posts).post(posts::create_post))
        .route(
            "/posts/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/interactions", get(interaction::get_interactions))
        .route("/contact", post(contact::submit_contact))
        // Protected routes (auth required)
        .route("/posts/{id}/like", post(posts::like_post))
        .route("/posts/{id}/dislike", post(posts::dislike_post))
        .route("/posts/{id}/report", post(posts::report_post))
        .route("/posts/{id}/answers", post(posts::create_answer))
        .route("/answers/{id}/like", post(answer::like_answer))
        .route("/answers/{id}/dislike", post(answer::dislike_answer))
        .route("/uploads/post-images", post(posts::upload_post_image))
        .route(
            "/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/profile/avatar", post(profile::upload_avatar))
        // Add state and middleware
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
