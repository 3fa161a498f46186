use crate::{
    dto::{ActionResponse, ContactRequest, Notice},
    errors::ApiError,
    extract::AppJson,
};
use axum::Json;
use tracing::info;
use validator::Validate;

/// POST /contact
/// Body: { "name": "...", "email": "...", "subject": "...", "message": "..." }
pub async fn submit_contact(
    AppJson(payload): AppJson<ContactRequest>,
) -> Result<Json<ActionResponse<()>>, ApiError> {
    let payload = payload.normalized();
    payload.validate()?;

    info!(
        name = %payload.name,
        email = %payload.email,
        subject = %payload.subject,
        message = %payload.message,
        "Contact form submission"
    );

    Ok(Json(ActionResponse::new(
        (),
        Notice::success(
            "Message sent!",
            "Thank you for contacting us. We'll get back to you soon.",
        ),
    )))
}
