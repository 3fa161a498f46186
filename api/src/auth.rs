use crate::{config::Config, errors::ApiError, states::AppState};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, Method, header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tracing::debug;
use uuid::Uuid;

/// Session claims issued by the external session provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    #[serde(default)]
    pub email: Option<String>,
    pub aud: String,
    pub exp: usize,
}

/// The signed-in user behind a request.
///
/// Extracting it rejects the request with an authentication redirect when there is no
/// valid session, and applies the per-user write rate limit to non-GET requests.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Like [`CurrentUser`], but anonymous requests get `None` instead of a rejection.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

/// Mint a session token the way the session provider does.
pub fn create_token(
    user_id: &Uuid,
    email: Option<&str>,
    config: &Config,
    ttl: Duration,
) -> Result<String, ApiError> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| ApiError::InternalError("Failed to calculate expiration".into()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.map(str::to_string),
        aud: config.session_audience.clone(),
        exp: expiration,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::InternalError(format!("Token Creation failed: {}", e)))
}

pub fn validate_token(headers: &HeaderMap, config: &Config) -> Option<Claims> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())?;

    let token = auth_header.strip_prefix("Bearer ")?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[config.session_audience.as_str()]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| debug!("Rejected session token: {}", e))
    .ok()
}

fn authenticate(headers: &HeaderMap, config: &Config) -> Option<CurrentUser> {
    let claims = validate_token(headers, config)?;
    let id = Uuid::parse_str(&claims.sub).ok()?;

    Some(CurrentUser {
        id,
        email: claims.email,
    })
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = authenticate(&parts.headers, &state.config).ok_or_else(|| {
            ApiError::Unauthenticated {
                redirect: state.config.auth_redirect.clone(),
            }
        })?;

        if parts.method != Method::GET && !state.allow_write(user.id) {
            return Err(ApiError::RateLimited);
        }

        Ok(user)
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(authenticate(&parts.headers, &state.config)))
    }
}
