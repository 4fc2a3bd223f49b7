use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::WebError;

/// Authenticated caller identity, parsed from `Authorization: Bearer <uuid>`.
///
/// Upstream auth terminates at the gateway; by the time a request reaches
/// this service the bearer token is the caller's user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub Uuid);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(WebError::Unauthorized)?;

        let token = header.strip_prefix("Bearer ").ok_or(WebError::Unauthorized)?;

        let user_id = Uuid::parse_str(token.trim()).map_err(|_| {
            tracing::warn!("Rejected malformed bearer token");
            WebError::Unauthorized
        })?;

        Ok(Self(user_id))
    }
}
