//! Reading posts back from the backend in the shape clients render.

use std::collections::HashMap;

use tracing::warn;
use uuid::Uuid;

use crate::{
    backend::{Backend, BackendError, PostFilter},
    models::{Author, InteractionKind, Post},
};

pub async fn load_posts(backend: &dyn Backend, filter: PostFilter) -> Result<Vec<Post>, BackendError> {
    let rows = backend.list_posts(filter).await?;
    let mut posts: Vec<Post> = rows.into_iter().map(Post::from).collect();
    attach_authors(backend, &mut posts).await;
    Ok(posts)
}

pub async fn load_post(backend: &dyn Backend, id: Uuid) -> Result<Post, BackendError> {
    let row = backend.get_post(id).await?.ok_or(BackendError::Missing("post"))?;
    let mut posts = [Post::from(row)];
    attach_authors(backend, &mut posts).await;
    let [post] = posts;
    Ok(post)
}

/// Fill in author names and avatars with one batched profile lookup.
///
/// A failed lookup leaves every author empty; the posts themselves are still served.
pub async fn attach_authors(backend: &dyn Backend, posts: &mut [Post]) {
    let mut ids: Vec<Uuid> = posts.iter().flat_map(Post::author_ids).collect();
    ids.sort_unstable();
    ids.dedup();

    if ids.is_empty() {
        return;
    }

    let profiles: HashMap<Uuid, Author> = match backend.get_profiles(&ids).await {
        Ok(rows) => rows
            .into_iter()
            .filter(|p| p.display_name.is_some() || p.avatar_url.is_some())
            .map(|p| {
                (
                    p.user_id,
                    Author {
                        name: p.display_name,
                        avatar_url: p.avatar_url,
                    },
                )
            })
            .collect(),
        Err(e) => {
            warn!("Profile lookup for {} authors failed: {}", ids.len(), e);
            return;
        }
    };

    let author = |user_id: Option<Uuid>| user_id.and_then(|id| profiles.get(&id).cloned());
    for post in posts.iter_mut() {
        post.author = author(post.user_id);
        for answer in post.answers.iter_mut() {
            answer.author = author(answer.user_id);
        }
    }
}

/// Case-insensitive substring match on titles. Order is preserved; a blank query keeps all.
pub fn search_titles(posts: Vec<Post>, query: &str) -> Vec<Post> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return posts;
    }

    posts
        .into_iter()
        .filter(|post| post.title.to_lowercase().contains(&needle))
        .collect()
}

/// The user's recorded vote for each requested post; posts without one map to `None`.
pub async fn interactions_for(
    backend: &dyn Backend,
    user_id: Uuid,
    post_ids: &[Uuid],
) -> Result<HashMap<Uuid, Option<InteractionKind>>, BackendError> {
    let mut map: HashMap<Uuid, Option<InteractionKind>> =
        post_ids.iter().map(|id| (*id, None)).collect();

    if post_ids.is_empty() {
        return Ok(map);
    }

    for row in backend.list_interactions(user_id, post_ids).await? {
        map.insert(row.post_id, Some(row.interaction_type));
    }

    Ok(map)
}
