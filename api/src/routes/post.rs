use crate::{
    AppState,
    auth::CurrentUser,
    backend::{Bucket, NewAnswerRow, NewPostRow, ObjectUpload, PostFilter, PostPatch, Procedure, Target},
    dto::{
        ActionResponse, CreateAnswerRequest, CreatePostRequest, FeedQuery, InteractionResponse,
        Notice, PaginatedResponse, ReportRequest, UpdatePostRequest, UploadResponse,
    },
    errors::{ApiError, RemoteContext},
    extract::{AppJson, AppPath, AppQuery},
    feed,
    models::{InteractionKind, Post},
    uploads,
};
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// GET /posts?q=alpha&category=Science&page=1&limit=10
pub async fn get_posts(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<FeedQuery>,
) -> Result<Json<PaginatedResponse<Post>>, ApiError> {
    let category = params.category()?;

    let posts = feed::load_posts(state.backend.as_ref(), PostFilter::all())
        .await
        .or_notify("Failed to load posts. Please try again.")?;

    let mut posts = feed::search_titles(posts, params.q.as_deref().unwrap_or_default());
    if let Some(category) = category {
        posts.retain(|post| post.category == category);
    }

    Ok(Json(PaginatedResponse::slice(
        &posts,
        params.page(),
        params.limit(),
    )))
}

/// GET /posts/{id}
pub async fn get_post(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Post>, ApiError> {
    let post = feed::load_post(state.backend.as_ref(), id).await?;

    Ok(Json(post))
}

/// POST /posts
/// Headers: Authorization: Bearer <token>
/// Body: { "title": "...", "description": "...", "category": "...", "image_url": "..." }
pub async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(payload): AppJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<ActionResponse<Post>>), ApiError> {
    let payload = payload.normalized();
    payload.validate()?;
    let category = payload.category()?;

    let row = state
        .backend
        .insert_post(NewPostRow {
            user_id: user.id,
            title: payload.title,
            description: payload.description,
            category,
            image_url: payload.image_url,
        })
        .await
        .or_notify("Failed to create post. Please try again.")?;

    info!("Post created: {} by user {}", row.id, user.id);

    let post = feed::load_post(state.backend.as_ref(), row.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(ActionResponse::new(
            post,
            Notice::success(
                "Post created!",
                "Your question/content has been posted successfully.",
            ),
        )),
    ))
}

/// PUT /posts/{id}
/// Headers: Authorization: Bearer <token>
/// Body: { "title": "...", "description": "...", "category": "..." }
pub async fn update_post(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdatePostRequest>,
) -> Result<Json<ActionResponse<Post>>, ApiError> {
    let payload = payload.normalized();
    payload.validate()?;
    let category = payload.category()?;

    let existing = feed::load_post(state.backend.as_ref(), id).await?;

    // Check ownership
    if !existing.is_owned_by(user.id) {
        return Err(ApiError::Forbidden);
    }

    state
        .backend
        .update_post(
            id,
            PostPatch {
                title: payload.title,
                description: payload.description,
                category,
            },
        )
        .await
        .or_notify("Failed to update post. Please try again.")?;

    info!("Post updated: {} by user {}", id, user.id);

    let post = feed::load_post(state.backend.as_ref(), id).await?;

    Ok(Json(ActionResponse::new(
        post,
        Notice::success("Post updated", "Your changes have been saved."),
    )))
}

/// DELETE /posts/{id}
/// Headers: Authorization: Bearer <token>
pub async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ActionResponse<Uuid>>, ApiError> {
    let existing = feed::load_post(state.backend.as_ref(), id).await?;

    // Check ownership
    if !existing.is_owned_by(user.id) {
        return Err(ApiError::Forbidden);
    }

    state
        .backend
        .delete_post(id)
        .await
        .or_notify("Failed to delete post. Please try again.")?;

    info!("Post deleted: {} by user {}", id, user.id);

    Ok(Json(ActionResponse::new(
        id,
        Notice::success("Post deleted", "Your post has been removed."),
    )))
}

/// POST /posts/{id}/like
pub async fn like_post(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ActionResponse<InteractionResponse>>, ApiError> {
    vote(&state, &user, id, InteractionKind::Like).await
}

/// POST /posts/{id}/dislike
pub async fn dislike_post(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ActionResponse<InteractionResponse>>, ApiError> {
    vote(&state, &user, id, InteractionKind::Dislike).await
}

/// Record the vote remotely, then read back both the counters and the user's recorded
/// interaction. Nothing is computed locally.
async fn vote(
    state: &AppState,
    user: &CurrentUser,
    id: Uuid,
    kind: InteractionKind,
) -> Result<Json<ActionResponse<InteractionResponse>>, ApiError> {
    let (failure, title) = match kind {
        InteractionKind::Like => ("Failed to like post. Please try again.", "Post liked!"),
        InteractionKind::Dislike => ("Failed to dislike post. Please try again.", "Post disliked!"),
    };

    state
        .backend
        .call(Procedure::for_vote(Target::Post, kind), id, user.id)
        .await
        .or_notify(failure)?;

    info!("Post {} {}d by user {}", id, kind.verb(), user.id);

    let backend = state.backend.as_ref();
    let post = feed::load_post(backend, id).await?;
    let interaction = feed::interactions_for(backend, user.id, &[id])
        .await?
        .remove(&id)
        .flatten();

    Ok(Json(ActionResponse::new(
        InteractionResponse { post, interaction },
        Notice::success(title, "Your interaction has been recorded."),
    )))
}

/// POST /posts/{id}/report
/// Body: { "reason": "..." }
pub async fn report_post(
    user: CurrentUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<ReportRequest>,
) -> Result<Json<ActionResponse<Uuid>>, ApiError> {
    let payload = payload.normalized();
    payload.validate()?;

    info!(
        post_id = %id,
        reporter = %user.id,
        reason = %payload.reason,
        "Report submitted"
    );

    Ok(Json(ActionResponse::new(
        id,
        Notice::success(
            "Report submitted",
            "Thank you for helping keep our community safe.",
        ),
    )))
}

/// POST /posts/{id}/answers
/// Body: { "content": "..." }
pub async fn create_answer(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(post_id): AppPath<Uuid>,
    AppJson(payload): AppJson<CreateAnswerRequest>,
) -> Result<(StatusCode, Json<ActionResponse<Post>>), ApiError> {
    let payload = payload.normalized();
    payload.validate()?;

    let answer = state
        .backend
        .insert_answer(NewAnswerRow {
            post_id,
            user_id: user.id,
            content: payload.content,
        })
        .await
        .or_notify("Failed to add answer. Please try again.")?;

    info!("Answer {} added to post {} by user {}", answer.id, post_id, user.id);

    let post = feed::load_post(state.backend.as_ref(), post_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(ActionResponse::new(
            post,
            Notice::success("Answer posted!", "Your answer has been added successfully."),
        )),
    ))
}

/// POST /uploads/post-images
/// Multipart body with a `file` part.
pub async fn upload_post_image(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ActionResponse<UploadResponse>>), ApiError> {
    let limit = state.config.post_image_max_bytes;
    let mut multipart = multipart?;
    let image = uploads::read_image(&mut multipart, limit).await?;
    image.check(limit)?;

    let path = uploads::post_image_path(&image);
    let bucket = Bucket::PostImages;

    state
        .backend
        .upload(
            bucket,
            &path,
            ObjectUpload {
                bytes: image.bytes,
                content_type: image.content_type,
                upsert: false,
            },
        )
        .await
        .or_notify("Failed to upload image. Please try again.")?;

    info!("Post image {} uploaded by user {}", path, user.id);

    let url = state.backend.public_url(bucket, &path);

    Ok((
        StatusCode::CREATED,
        Json(ActionResponse::new(
            UploadResponse { url, path },
            Notice::success("Image uploaded", "Your image is ready to attach."),
        )),
    ))
}
