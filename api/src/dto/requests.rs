use serde::Deserialize;
use std::borrow::Cow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{errors::ApiError, models::Category};

const REQUIRED: &str = "Please fill in all required fields.";
const MAX_PAGE_SIZE: usize = 100;

fn required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required").with_message(Cow::Borrowed(REQUIRED)));
    }
    Ok(())
}

fn known_category(value: &str) -> Result<(), ValidationError> {
    required(value)?;
    value.parse::<Category>().map(|_| ()).map_err(|_| {
        ValidationError::new("category")
            .with_message(Cow::Borrowed("Please choose one of the listed categories."))
    })
}

fn trimmed(value: String) -> String {
    value.trim().to_string()
}

fn parse_category(value: &str) -> Result<Category, ApiError> {
    value
        .parse()
        .map_err(|_| ApiError::ValidationError("Please choose one of the listed categories.".into()))
}

#[derive(Debug, Validate, Deserialize)]
pub struct CreatePostRequest {
    #[validate(
        custom(function = "required"),
        length(max = 200, message = "Titles are limited to 200 characters.")
    )]
    #[serde(default)]
    pub title: String,
    #[validate(
        custom(function = "required"),
        length(max = 1000, message = "Descriptions are limited to 1000 characters.")
    )]
    #[serde(default)]
    pub description: String,
    #[validate(custom(function = "known_category"))]
    #[serde(default)]
    pub category: String,
    #[validate(url(message = "Image URL must be a valid URL."))]
    pub image_url: Option<String>,
}

impl CreatePostRequest {
    /// Trim every field and drop a blank image URL.
    pub fn normalized(self) -> Self {
        Self {
            title: trimmed(self.title),
            description: trimmed(self.description),
            category: self.category,
            image_url: self.image_url.map(trimmed).filter(|url| !url.is_empty()),
        }
    }

    pub fn category(&self) -> Result<Category, ApiError> {
        parse_category(&self.category)
    }
}

#[derive(Debug, Validate, Deserialize)]
pub struct UpdatePostRequest {
    #[validate(
        custom(function = "required"),
        length(max = 200, message = "Titles are limited to 200 characters.")
    )]
    #[serde(default)]
    pub title: String,
    #[validate(
        custom(function = "required"),
        length(max = 1000, message = "Descriptions are limited to 1000 characters.")
    )]
    #[serde(default)]
    pub description: String,
    #[validate(custom(function = "known_category"))]
    #[serde(default)]
    pub category: String,
}

impl UpdatePostRequest {
    pub fn normalized(self) -> Self {
        Self {
            title: trimmed(self.title),
            description: trimmed(self.description),
            category: self.category,
        }
    }

    pub fn category(&self) -> Result<Category, ApiError> {
        parse_category(&self.category)
    }
}

#[derive(Debug, Validate, Deserialize)]
pub struct CreateAnswerRequest {
    #[validate(
        custom(function = "required"),
        length(max = 5000, message = "Answers are limited to 5000 characters.")
    )]
    #[serde(default)]
    pub content: String,
}

impl CreateAnswerRequest {
    pub fn normalized(self) -> Self {
        Self {
            content: trimmed(self.content),
        }
    }
}

#[derive(Debug, Validate, Deserialize)]
pub struct ReportRequest {
    #[validate(
        custom(function = "required"),
        length(max = 1000, message = "Reports are limited to 1000 characters.")
    )]
    #[serde(default)]
    pub reason: String,
}

impl ReportRequest {
    pub fn normalized(self) -> Self {
        Self {
            reason: trimmed(self.reason),
        }
    }
}

#[derive(Debug, Validate, Deserialize)]
pub struct UpdateProfileRequest {
    #[validate(
        custom(function = "required"),
        length(max = 100, message = "Display names are limited to 100 characters.")
    )]
    #[serde(default)]
    pub display_name: String,
}

impl UpdateProfileRequest {
    pub fn normalized(self) -> Self {
        Self {
            display_name: trimmed(self.display_name),
        }
    }
}

#[derive(Debug, Validate, Deserialize)]
pub struct ContactRequest {
    #[validate(custom(function = "required"), length(max = 100))]
    #[serde(default)]
    pub name: String,
    #[validate(
        custom(function = "required"),
        email(message = "Invalid email format"),
        length(max = 255)
    )]
    #[serde(default)]
    pub email: String,
    #[validate(custom(function = "required"), length(max = 200))]
    #[serde(default)]
    pub subject: String,
    #[validate(
        custom(function = "required"),
        length(max = 1000, message = "Messages are limited to 1000 characters.")
    )]
    #[serde(default)]
    pub message: String,
}

impl ContactRequest {
    pub fn normalized(self) -> Self {
        Self {
            name: trimmed(self.name),
            email: trimmed(self.email),
            subject: trimmed(self.subject),
            message: trimmed(self.message),
        }
    }
}

/// GET /posts query: search, category filter and pagination.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_page() -> usize {
    1
}
fn default_limit() -> usize {
    10
}

impl FeedQuery {
    pub fn category(&self) -> Result<Option<Category>, ApiError> {
        match self.category.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => parse_category(raw).map(Some),
        }
    }

    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    pub fn limit(&self) -> usize {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }
}

/// GET /interactions?post_ids=a,b,c
#[derive(Debug, Deserialize)]
pub struct InteractionsQuery {
    #[serde(default)]
    pub post_ids: Option<String>,
}

impl InteractionsQuery {
    pub fn post_ids(&self) -> Result<Vec<Uuid>, ApiError> {
        let Some(raw) = self.post_ids.as_deref() else {
            return Ok(Vec::new());
        };

        let mut ids = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let id = Uuid::parse_str(part)
                .map_err(|_| ApiError::ValidationError(format!("Invalid post id: {part}")))?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}
