use crate::{
    AppState,
    auth::CurrentUser,
    backend::{BackendError, Procedure, Target},
    dto::{ActionResponse, Notice},
    errors::{ApiError, RemoteContext},
    extract::AppPath,
    feed,
    models::{InteractionKind, Post},
};
use axum::{
    Json,
    extract::State,
};
use tracing::info;
use uuid::Uuid;

/// POST /answers/{id}/like
pub async fn like_answer(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ActionResponse<Post>>, ApiError> {
    vote(&state, &user, id, InteractionKind::Like).await
}

/// POST /answers/{id}/dislike
pub async fn dislike_answer(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ActionResponse<Post>>, ApiError> {
    vote(&state, &user, id, InteractionKind::Dislike).await
}

// Answers carry no per-user interaction lookup, so the refreshed parent post is the result.
async fn vote(
    state: &AppState,
    user: &CurrentUser,
    id: Uuid,
    kind: InteractionKind,
) -> Result<Json<ActionResponse<Post>>, ApiError> {
    let (failure, title) = match kind {
        InteractionKind::Like => ("Failed to like answer. Please try again.", "Answer liked!"),
        InteractionKind::Dislike => (
            "Failed to dislike answer. Please try again.",
            "Answer disliked!",
        ),
    };

    let backend = state.backend.as_ref();

    backend
        .call(Procedure::for_vote(Target::Answer, kind), id, user.id)
        .await
        .or_notify(failure)?;

    info!("Answer {} {}d by user {}", id, kind.verb(), user.id);

    let answer = backend
        .get_answer(id)
        .await?
        .ok_or(BackendError::Missing("answer"))?;
    let post = feed::load_post(backend, answer.post_id).await?;

    Ok(Json(ActionResponse::new(
        post,
        Notice::success(title, "Your interaction has been recorded."),
    )))
}
