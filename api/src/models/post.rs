use super::Category;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display identity attached to a post or answer.
///
/// Absent when the author never set up a profile; clients render those as anonymous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub likes: i64,
    pub dislikes: i64,
    pub image_url: Option<String>,
    pub author: Option<Author>,
    pub answers: Vec<Answer>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: Uuid,
    pub post_id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Option<Uuid>,
    pub content: String,
    pub likes: i64,
    pub dislikes: i64,
    pub author: Option<Author>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == Some(user_id)
    }

    /// Every user id referenced by the post and its answers.
    pub fn author_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.user_id
            .into_iter()
            .chain(self.answers.iter().filter_map(|a| a.user_id))
    }
}
