//! Caller identity middleware
//!
//! Authentication happens upstream. The gateway forwards the authenticated
//! user's id in the `X-User-Id` header and this layer turns it into a
//! [`CurrentUser`] request extension.

use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Identity of the caller. Use it as a handler argument on routes behind
/// [`identity_middleware`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("Caller identity required".to_string()))
    }
}

fn caller_from_headers(headers: &HeaderMap) -> Result<CurrentUser, AppError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| AppError::Unauthorized("Missing X-User-Id header".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Malformed X-User-Id header".to_string()))?;

    Uuid::parse_str(raw.trim())
        .map(CurrentUser)
        .map_err(|_| AppError::Unauthorized("X-User-Id is not a valid UUID".to_string()))
}

/// Reject requests without a caller identity
pub async fn identity_middleware(mut request: Request, next: Next) -> Response {
    let user = match caller_from_headers(request.headers()) {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };

    request.extensions_mut().insert(user);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_caller_from_valid_header() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());

        assert_eq!(caller_from_headers(&headers).unwrap(), CurrentUser(id));
    }

    #[test]
    fn test_caller_missing_or_invalid() {
        assert!(matches!(
            caller_from_headers(&HeaderMap::new()),
            Err(AppError::Unauthorized(_))
        ));

        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert!(matches!(
            caller_from_headers(&headers),
            Err(AppError::Unauthorized(_))
        ));
    }
}
