use crate::{
    AppState,
    auth::MaybeUser,
    dto::InteractionsQuery,
    errors::{ApiError, RemoteContext},
    extract::AppQuery,
    feed,
    models::InteractionKind,
};
use axum::{
    Json,
    extract::State,
};
use std::collections::HashMap;
use uuid::Uuid;

/// GET /interactions?post_ids=<id>,<id>
/// Anonymous callers get an empty map.
pub async fn get_interactions(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    AppQuery(params): AppQuery<InteractionsQuery>,
) -> Result<Json<HashMap<Uuid, Option<InteractionKind>>>, ApiError> {
    let post_ids = params.post_ids()?;

    let Some(user) = user else {
        return Ok(Json(HashMap::new()));
    };

    let interactions = feed::interactions_for(state.backend.as_ref(), user.id, &post_ids)
        .await
        .or_notify("Failed to load your interactions.")?;

    Ok(Json(interactions))
}
