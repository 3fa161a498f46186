use axum::{
    Json,
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{error, warn};
use validator::ValidationErrors;

use crate::{backend::BackendError, dto::Notice};

const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug)]
pub enum ApiError {
    /// No usable session; the client should send the user to `redirect` to sign in.
    Unauthenticated { redirect: String },
    Forbidden,
    NotFound(&'static str),
    ValidationError(String),
    /// The request could not be read at all (malformed body, query or path).
    Rejected { status: StatusCode, message: String },
    UnsupportedMedia(String),
    FileTooLarge { limit_bytes: usize },
    RateLimited,
    Remote {
        message: &'static str,
        source: BackendError,
    },
    InternalError(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Rejected { status, .. } => *status,
            ApiError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Remote { .. } => StatusCode::BAD_GATEWAY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn notice(&self) -> Notice {
        match self {
            ApiError::Unauthenticated { .. } => {
                Notice::failure("Authentication required", "Please sign in to continue.")
            }
            ApiError::Forbidden => {
                Notice::failure("Not allowed", "You can only change your own content.")
            }
            ApiError::NotFound(what) => Notice::failure("Not found", format!("That {what} no longer exists.")),
            ApiError::ValidationError(msg) => Notice::failure("Missing information", msg.clone()),
            ApiError::Rejected { .. } => Notice::failure(
                "Invalid request",
                "We couldn't read that request. Please check the form and try again.",
            ),
            ApiError::UnsupportedMedia(_) => {
                Notice::failure("Invalid file type", "Please upload an image file.")
            }
            ApiError::FileTooLarge { limit_bytes } => Notice::failure(
                "File too large",
                format!(
                    "Please upload an image smaller than {}MB.",
                    limit_bytes / (1024 * 1024)
                ),
            ),
            ApiError::RateLimited => {
                Notice::failure("Slow down", "Too many actions at once. Please wait a moment.")
            }
            ApiError::Remote { message, .. } => Notice::failure("Error", *message),
            ApiError::InternalError(_) => Notice::failure("Error", GENERIC_FAILURE),
        }
    }
}

/// Convert our custom errors to HTTP responses
///
/// Every failure carries a destructive notice the client shows as a toast.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let notice = self.notice();

        let message = match &self {
            ApiError::Remote { message, source } => {
                error!("Backend call failed: {}", source);
                message.to_string()
            }
            ApiError::InternalError(msg) => {
                error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            ApiError::Rejected { message, .. } => {
                warn!("Rejected request: {}", message);
                message.clone()
            }
            ApiError::UnsupportedMedia(content_type) => {
                warn!("Rejected upload with content type {:?}", content_type);
                notice.description.clone()
            }
            _ => notice.description.clone(),
        };

        if let ApiError::Unauthenticated { redirect } = self {
            return (
                status,
                [(header::LOCATION, redirect.clone())],
                Json(serde_json::json!({
                  "error": message,
                  "notice": notice,
                  "redirect": redirect,
                })),
            )
                .into_response();
        }

        (
            status,
            Json(serde_json::json!({
              "error": message,
              "notice": notice,
            })),
        )
            .into_response()
    }
}

impl From<BackendError> for ApiError {
    fn from(source: BackendError) -> Self {
        match source {
            BackendError::Missing(what) => ApiError::NotFound(what),
            source => ApiError::Remote {
                message: GENERIC_FAILURE,
                source,
            },
        }
    }
}

macro_rules! rejection {
    ($($rejection:ty),+) => {
        $(
            impl From<$rejection> for ApiError {
                fn from(rejection: $rejection) -> Self {
                    ApiError::Rejected {
                        status: rejection.status(),
                        message: rejection.body_text(),
                    }
                }
            }
        )+
    };
}

rejection!(JsonRejection, QueryRejection, PathRejection, MultipartRejection);

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::ValidationError(describe(&errors))
    }
}

/// Attach the user-facing failure message for a specific action to a backend result.
pub trait RemoteContext<T> {
    fn or_notify(self, message: &'static str) -> Result<T, ApiError>;
}

impl<T> RemoteContext<T> for Result<T, BackendError> {
    fn or_notify(self, message: &'static str) -> Result<T, ApiError> {
        self.map_err(|source| match source {
            BackendError::Missing(what) => ApiError::NotFound(what),
            source => ApiError::Remote { message, source },
        })
    }
}

fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let mut messages: Vec<String> = Vec::new();
    for (field, errs) in fields {
        for err in errs.iter() {
            let msg = match &err.message {
                Some(msg) => msg.to_string(),
                None => format!("{field} is invalid"),
            };
            if !messages.contains(&msg) {
                messages.push(msg);
            }
        }
    }

    messages.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::ValidationError;

    #[test]
    fn backend_missing_maps_to_not_found() {
        let err: ApiError = BackendError::Missing("post").into();
        assert!(matches!(err, ApiError::NotFound("post")));
    }

    #[test]
    fn or_notify_keeps_action_message() {
        let result: Result<(), BackendError> = Err(BackendError::Decode("bad".into()));
        match result.or_notify("Failed to like post. Please try again.") {
            Err(ApiError::Remote { message, .. }) => {
                assert_eq!(message, "Failed to like post. Please try again.")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn describe_deduplicates_messages() {
        let mut errors = ValidationErrors::new();
        let shared = ValidationError::new("length").with_message("Please fill in all required fields.".into());
        errors.add("title", shared.clone());
        errors.add("description", shared);
        errors.add("image_url", ValidationError::new("url"));

        assert_eq!(
            describe(&errors),
            "Please fill in all required fields. image_url is invalid"
        );
    }

    #[test]
    fn rejections_keep_status_and_carry_a_notice() {
        let err = ApiError::Rejected {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "missing field `title`".into(),
        };
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.notice().variant, crate::dto::NoticeVariant::Destructive);
    }

    #[test]
    fn unauthenticated_sets_location() {
        let response = ApiError::Unauthenticated {
            redirect: "/auth".into(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::LOCATION], "/auth");
    }
}
