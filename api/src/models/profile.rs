use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// An answer written by the current user, shown alongside the title of the post it answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAnswer {
    pub id: Uuid,
    pub content: String,
    pub likes: i64,
    pub dislikes: i64,
    pub post_id: Uuid,
    pub post_title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityStats {
    pub total_posts: usize,
    pub total_answers: usize,
    pub total_likes_received: i64,
}

impl ActivityStats {
    pub fn tally(posts: &[super::Post], answers: &[UserAnswer]) -> Self {
        let total_likes_received = posts.iter().map(|p| p.likes).sum::<i64>()
            + answers.iter().map(|a| a.likes).sum::<i64>();

        Self {
            total_posts: posts.len(),
            total_answers: answers.len(),
            total_likes_received,
        }
    }
}
