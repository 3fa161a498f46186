//! Access to the hosted backend-as-a-service.
//!
//! Handlers only ever talk to [`Backend`]. [`RestBackend`] speaks the hosted service's
//! REST/RPC/storage conventions; [`MemoryBackend`] keeps the same tables in-process and
//! enforces the one-vote-per-user guarantee itself.

mod memory;
mod rest;
mod rows;

use async_trait::async_trait;
use bytes::Bytes;
use std::{fmt, sync::Arc};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{BackendMode, Config};

pub use memory::{MemoryBackend, StoredObject, VoteChange};
pub use rest::RestBackend;
pub use rows::{
    AnswerRow, InteractionRow, NewAnswerRow, NewPostRow, PostPatch, PostRefRow, PostRow,
    ProfilePatch, ProfileRow, UserAnswerRow,
};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("decode: {0}")]
    Decode(String),

    #[error("{0} not found")]
    Missing(&'static str),
}

/// Named counter procedures exposed by the hosted backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Procedure {
    IncrementPostLikes,
    IncrementPostDislikes,
    IncrementAnswerLikes,
    IncrementAnswerDislikes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Post,
    Answer,
}

impl Procedure {
    pub fn for_vote(target: Target, kind: crate::models::InteractionKind) -> Self {
        use crate::models::InteractionKind::*;
        match (target, kind) {
            (Target::Post, Like) => Procedure::IncrementPostLikes,
            (Target::Post, Dislike) => Procedure::IncrementPostDislikes,
            (Target::Answer, Like) => Procedure::IncrementAnswerLikes,
            (Target::Answer, Dislike) => Procedure::IncrementAnswerDislikes,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Procedure::IncrementPostLikes => "increment_post_likes",
            Procedure::IncrementPostDislikes => "increment_post_dislikes",
            Procedure::IncrementAnswerLikes => "increment_answer_likes",
            Procedure::IncrementAnswerDislikes => "increment_answer_dislikes",
        }
    }

    pub fn target(&self) -> Target {
        match self {
            Procedure::IncrementPostLikes | Procedure::IncrementPostDislikes => Target::Post,
            Procedure::IncrementAnswerLikes | Procedure::IncrementAnswerDislikes => Target::Answer,
        }
    }

    pub fn kind(&self) -> crate::models::InteractionKind {
        use crate::models::InteractionKind::*;
        match self {
            Procedure::IncrementPostLikes | Procedure::IncrementAnswerLikes => Like,
            Procedure::IncrementPostDislikes | Procedure::IncrementAnswerDislikes => Dislike,
        }
    }

    /// Name of the RPC argument carrying the target id.
    pub fn target_param(&self) -> &'static str {
        match self.target() {
            Target::Post => "post_id",
            Target::Answer => "answer_id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    PostImages,
    Avatars,
}

impl Bucket {
    pub fn name(&self) -> &'static str {
        match self {
            Bucket::PostImages => "post-images",
            Bucket::Avatars => "avatars",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostFilter {
    pub user_id: Option<Uuid>,
}

impl PostFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn owned_by(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectUpload {
    pub bytes: Bytes,
    pub content_type: String,
    /// Replace an existing object at the same path instead of failing.
    pub upsert: bool,
}

#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Posts with their answers, newest post first.
    async fn list_posts(&self, filter: PostFilter) -> Result<Vec<PostRow>, BackendError>;
    async fn get_post(&self, id: Uuid) -> Result<Option<PostRow>, BackendError>;
    async fn insert_post(&self, post: NewPostRow) -> Result<PostRow, BackendError>;
    async fn update_post(&self, id: Uuid, patch: PostPatch) -> Result<PostRow, BackendError>;
    async fn delete_post(&self, id: Uuid) -> Result<(), BackendError>;

    async fn get_answer(&self, id: Uuid) -> Result<Option<AnswerRow>, BackendError>;
    async fn insert_answer(&self, answer: NewAnswerRow) -> Result<AnswerRow, BackendError>;
    /// Answers written by `user_id`, newest first, joined with their post's title.
    async fn list_user_answers(&self, user_id: Uuid) -> Result<Vec<UserAnswerRow>, BackendError>;

    async fn get_profiles(&self, user_ids: &[Uuid]) -> Result<Vec<ProfileRow>, BackendError>;
    async fn update_profile(&self, user_id: Uuid, patch: ProfilePatch)
    -> Result<(), BackendError>;

    async fn list_interactions(
        &self,
        user_id: Uuid,
        post_ids: &[Uuid],
    ) -> Result<Vec<InteractionRow>, BackendError>;

    /// Invoke a counter procedure on behalf of `user_id`.
    async fn call(
        &self,
        procedure: Procedure,
        target: Uuid,
        user_id: Uuid,
    ) -> Result<(), BackendError>;

    async fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        object: ObjectUpload,
    ) -> Result<(), BackendError>;

    fn public_url(&self, bucket: Bucket, path: &str) -> String;
}

pub fn connect(config: &Config) -> Result<Arc<dyn Backend>, BackendError> {
    match &config.backend {
        BackendMode::Remote { url, service_key } => Ok(Arc::new(RestBackend::new(
            url,
            service_key,
            config.backend_timeout,
        )?)),
        BackendMode::Memory => Ok(Arc::new(MemoryBackend::new(&config.public_base_url))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InteractionKind;

    #[test]
    fn procedures_map_to_remote_names() {
        let p = Procedure::for_vote(Target::Answer, InteractionKind::Dislike);
        assert_eq!(p.name(), "increment_answer_dislikes");
        assert_eq!(p.target_param(), "answer_id");
        assert_eq!(p.kind(), InteractionKind::Dislike);

        let p = Procedure::for_vote(Target::Post, InteractionKind::Like);
        assert_eq!(p.name(), "increment_post_likes");
        assert_eq!(p.target_param(), "post_id");
    }

    #[test]
    fn bucket_names() {
        assert_eq!(Bucket::PostImages.name(), "post-images");
        assert_eq!(Bucket::Avatars.to_string(), "avatars");
    }
}
