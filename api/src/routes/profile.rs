use crate::{
    AppState,
    auth::CurrentUser,
    backend::{Backend, BackendError, Bucket, ObjectUpload, PostFilter, ProfilePatch},
    dto::{ActionResponse, Notice, ProfileOverview, UpdateProfileRequest},
    errors::{ApiError, RemoteContext},
    extract::AppJson,
    feed,
    models::{ActivityStats, Profile, UserAnswer},
    uploads,
};
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

async fn load_profile(backend: &dyn Backend, user_id: Uuid) -> Result<Profile, BackendError> {
    let profile = backend
        .get_profiles(&[user_id])
        .await?
        .into_iter()
        .next()
        .map(Profile::from)
        .unwrap_or_else(|| Profile {
            user_id,
            ..Profile::default()
        });

    Ok(profile)
}

/// GET /profile
/// Headers: Authorization: Bearer <token>
pub async fn get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ProfileOverview>, ApiError> {
    const FAILURE: &str = "Failed to load your profile data.";
    let backend = state.backend.as_ref();

    let profile = load_profile(backend, user.id).await.or_notify(FAILURE)?;
    let posts = feed::load_posts(backend, PostFilter::owned_by(user.id))
        .await
        .or_notify(FAILURE)?;
    let answers: Vec<UserAnswer> = backend
        .list_user_answers(user.id)
        .await
        .or_notify(FAILURE)?
        .into_iter()
        .map(UserAnswer::from)
        .collect();

    let stats = ActivityStats::tally(&posts, &answers);

    Ok(Json(ProfileOverview {
        profile,
        posts,
        answers,
        stats,
    }))
}

/// PUT /profile
/// Body: { "display_name": "..." }
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<ActionResponse<Profile>>, ApiError> {
    let payload = payload.normalized();
    payload.validate()?;

    let backend = state.backend.as_ref();
    backend
        .update_profile(
            user.id,
            ProfilePatch {
                display_name: Some(payload.display_name),
                avatar_url: None,
            },
        )
        .await
        .or_notify("Failed to update profile.")?;

    info!("Display name updated for user {}", user.id);

    let profile = load_profile(backend, user.id).await?;

    Ok(Json(ActionResponse::new(
        profile,
        Notice::success("Profile updated", "Your display name has been updated."),
    )))
}

/// POST /profile/avatar
/// Multipart body with a `file` part. Replaces `{user_id}/avatar.{ext}` in the avatars bucket.
pub async fn upload_avatar(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ActionResponse<Profile>>, ApiError> {
    const FAILURE: &str = "Failed to upload avatar. Please try again.";

    let limit = state.config.avatar_max_bytes;
    let mut multipart = multipart?;
    let image = uploads::read_image(&mut multipart, limit).await?;
    image.check(limit)?;

    let backend = state.backend.as_ref();
    let path = uploads::avatar_path(user.id, &image);

    backend
        .upload(
            Bucket::Avatars,
            &path,
            ObjectUpload {
                bytes: image.bytes,
                content_type: image.content_type,
                upsert: true,
            },
        )
        .await
        .or_notify(FAILURE)?;

    let avatar_url = uploads::cache_busted(&backend.public_url(Bucket::Avatars, &path), Utc::now());

    backend
        .update_profile(
            user.id,
            ProfilePatch {
                display_name: None,
                avatar_url: Some(avatar_url),
            },
        )
        .await
        .or_notify(FAILURE)?;

    info!("Avatar updated for user {}", user.id);

    let profile = load_profile(backend, user.id).await?;

    Ok(Json(ActionResponse::new(
        profile,
        Notice::success("Avatar updated", "Your profile picture has been updated."),
    )))
}
