//! Wire shapes of the hosted backend's tables.
//!
//! Rows are deserialized exactly as the backend returns them and converted into
//! [`crate::models`] types here, so nothing past this module sees loosely typed data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::models::{Answer, Category, InteractionKind, Post, Profile, UserAnswer};

const UNKNOWN_POST_TITLE: &str = "Unknown Post";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub dislikes: i64,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub answers: Vec<AnswerRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRow {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Option<Uuid>,
    pub content: String,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub dislikes: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRow {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRow {
    pub post_id: Uuid,
    pub interaction_type: InteractionKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRefRow {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAnswerRow {
    pub id: Uuid,
    pub post_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub dislikes: i64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub posts: Option<PostRefRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPostRow {
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAnswerRow {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
}

/// The editable columns of a post. Counters are deliberately absent.
#[derive(Debug, Clone, Serialize)]
pub struct PostPatch {
    pub title: String,
    pub description: String,
    pub category: Category,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        let category = row.category.parse().unwrap_or_else(|_| {
            warn!("Post {} has unknown category {:?}", row.id, row.category);
            Category::Other
        });

        let mut answers: Vec<Answer> = row.answers.into_iter().map(Answer::from).collect();
        answers.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        Post {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            category,
            likes: row.likes,
            dislikes: row.dislikes,
            image_url: row.image_url.filter(|url| !url.is_empty()),
            author: None,
            answers,
            created_at: row.created_at,
        }
    }
}

impl From<AnswerRow> for Answer {
    fn from(row: AnswerRow) -> Self {
        Answer {
            id: row.id,
            post_id: row.post_id,
            user_id: row.user_id,
            content: row.content,
            likes: row.likes,
            dislikes: row.dislikes,
            author: None,
            created_at: row.created_at,
        }
    }
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            user_id: row.user_id,
            display_name: row.display_name,
            avatar_url: row.avatar_url,
        }
    }
}

impl From<UserAnswerRow> for UserAnswer {
    fn from(row: UserAnswerRow) -> Self {
        let (post_id, post_title) = match row.posts {
            Some(post) => (post.id, post.title),
            None => (row.post_id, UNKNOWN_POST_TITLE.to_string()),
        };

        UserAnswer {
            id: row.id,
            content: row.content,
            likes: row.likes,
            dislikes: row.dislikes,
            post_id,
            post_title,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_hosted_post_with_nested_answers() {
        let json = serde_json::json!({
            "id": "6f2a3c1e-8a55-4d40-9d7c-0c4f3b1a2e11",
            "user_id": null,
            "title": "Why is the sky blue?",
            "description": "Asking for a friend",
            "category": "Science",
            "likes": 3,
            "dislikes": 1,
            "image_url": "",
            "created_at": "2025-03-01T10:00:00.123456+00:00",
            "answers": [
                {
                    "id": "0d9d1f58-2f6e-4b0e-9e44-6a3c9b2d7f01",
                    "post_id": "6f2a3c1e-8a55-4d40-9d7c-0c4f3b1a2e11",
                    "user_id": "3b8e1f0a-1c2d-4e5f-8a9b-0c1d2e3f4a5b",
                    "content": "Rayleigh scattering",
                    "likes": 5,
                    "dislikes": 0,
                    "created_at": "2025-03-01T11:00:00+00:00"
                }
            ]
        });

        let row: PostRow = serde_json::from_value(json).unwrap();
        let post = Post::from(row);

        assert_eq!(post.category, Category::Science);
        assert_eq!(post.image_url, None);
        assert_eq!(post.answers.len(), 1);
        assert_eq!(post.answers[0].likes, 5);
    }

    #[test]
    fn unknown_category_falls_back_to_other() {
        let row = PostRow {
            id: Uuid::new_v4(),
            user_id: None,
            title: "t".into(),
            description: "d".into(),
            category: "Gardening".into(),
            likes: 0,
            dislikes: 0,
            image_url: None,
            created_at: Utc::now(),
            answers: vec![],
        };

        assert_eq!(Post::from(row).category, Category::Other);
    }

    #[test]
    fn user_answer_without_joined_post_gets_placeholder_title() {
        let post_id = Uuid::new_v4();
        let row = UserAnswerRow {
            id: Uuid::new_v4(),
            post_id,
            content: "c".into(),
            likes: 0,
            dislikes: 0,
            created_at: Utc::now(),
            posts: None,
        };

        let answer = UserAnswer::from(row);
        assert_eq!(answer.post_id, post_id);
        assert_eq!(answer.post_title, "Unknown Post");
    }

    #[test]
    fn post_patch_never_carries_counters() {
        let patch = PostPatch {
            title: "t".into(),
            description: "d".into(),
            category: Category::News,
        };
        let value = serde_json::to_value(&patch).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 3);
        assert!(!keys.iter().any(|k| k == "likes" || k == "dislikes"));
    }
}
