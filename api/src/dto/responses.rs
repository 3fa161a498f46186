use serde::Serialize;

use crate::models::{ActivityStats, InteractionKind, Post, Profile, UserAnswer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeVariant {
    Default,
    Destructive,
}

/// Transient user-facing notification attached to every action response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub variant: NoticeVariant,
}

impl Notice {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NoticeVariant::Default,
        }
    }

    pub fn failure(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NoticeVariant::Destructive,
        }
    }
}

/// Result of a user action: the refreshed record plus what to tell the user.
#[derive(Debug, Serialize)]
pub struct ActionResponse<T> {
    pub data: T,
    pub notice: Notice,
}

impl<T> ActionResponse<T> {
    pub fn new(data: T, notice: Notice) -> Self {
        Self { data, notice }
    }
}

/// Paginated response wrapper
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
}

impl<T: Clone> PaginatedResponse<T> {
    pub fn slice(items: &[T], page: usize, limit: usize) -> Self {
        let total = items.len();
        let start = page.saturating_sub(1).saturating_mul(limit);
        let end = start.saturating_add(limit).min(total);

        let data = if start < total {
            items[start..end].to_vec()
        } else {
            vec![]
        };

        Self {
            data,
            page,
            limit,
            total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InteractionResponse {
    pub post: Post,
    pub interaction: Option<InteractionKind>,
}

#[derive(Debug, Serialize)]
pub struct ProfileOverview {
    pub profile: Profile,
    pub posts: Vec<Post>,
    pub answers: Vec<UserAnswer>,
    pub stats: ActivityStats,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_pages_through_items() {
        let items: Vec<u32> = (1..=25).collect();

        let second = PaginatedResponse::slice(&items, 2, 10);
        assert_eq!(second.data, (11..=20).collect::<Vec<_>>());
        assert_eq!(second.total, 25);

        let past_end = PaginatedResponse::slice(&items, 4, 10);
        assert!(past_end.data.is_empty());
    }

    #[test]
    fn notice_variant_serializes_lowercase() {
        let json = serde_json::to_value(Notice::failure("Error", "nope")).unwrap();
        assert_eq!(json["variant"], "destructive");
    }
}
