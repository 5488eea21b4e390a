pub mod auth;
pub mod comments;
pub mod content;
mod convert;
pub mod error;
pub mod interactions;
pub mod middleware;
pub mod notifications;
pub mod posts;
pub mod questions;
pub mod tags;
pub mod users;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use tracing::error;

use edushare_db::Database;

use crate::auth::AppState;
use crate::error::ApiError;

/// Full REST surface. Everything except health and auth sits behind the
/// session check.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/top", get(posts::top_posts))
        .route("/posts/{post_id}", get(posts::get_post))
        .route("/posts/{post_id}/comments", get(posts::get_post_comments))
        .route("/questions", get(questions::list_questions).post(questions::create_question))
        .route("/questions/top", get(questions::top_questions))
        .route("/questions/{question_id}", get(questions::get_question).put(questions::update_question))
        .route("/questions/{question_id}/comments", get(questions::get_question_comments))
        .route("/comments", post(comments::create_comment))
        .route(
            "/interactions",
            get(interactions::get_interactions)
                .post(interactions::add_interaction)
                .delete(interactions::remove_interaction),
        )
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/read-all", put(notifications::mark_all_read))
        .route("/notifications/{notification_id}/read", put(notifications::mark_read))
        .route("/users/{user_id}", get(users::get_user))
        .route("/users/{user_id}/dailySign", put(users::daily_sign))
        .route("/tags", get(tags::list_tags))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

async fn health() -> &'static str {
    "ok"
}

/// Runs a blocking DB closure off the async runtime.
pub(crate) async fn db_call<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed: {e}"))
        })?
        .map_err(ApiError::from)
}
