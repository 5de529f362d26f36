//! Bearer-token authentication extractors.
//!
//! The `Authorization: Bearer <token>` value is hashed and looked up in the
//! store's token table.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::domain::aggregates::{ApiToken, User};
use crate::error::AppError;
use crate::state::AppState;

pub const NO_TOKEN: &str = "Not authorized, no token";
pub const TOKEN_FAILED: &str = "Not authorized, token failed";
pub const NOT_ADMIN: &str = "Not authorized as an admin";

/// Extractor that requires a signed-in user.
///
/// ```rust,ignore
/// async fn handler(AuthUser(user): AuthUser) -> String {
///     user.name
/// }
/// ```
pub struct AuthUser(pub User);

/// Extractor that requires a signed-in user with the `admin` role.
pub struct RequireAdmin(pub User);

fn bearer_token(parts: &Parts) -> Option<ApiToken> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| ApiToken::from_raw(token))
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| AppError::Unauthorized(NO_TOKEN.to_string()))?;

        let user = state
            .store()
            .find_user_by_token(&token.digest())
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "token lookup failed");
                AppError::Unauthorized(TOKEN_FAILED.to_string())
            })?
            .ok_or_else(|| AppError::Unauthorized(TOKEN_FAILED.to_string()))?;

        Ok(Self(user))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden(NOT_ADMIN.to_string()));
        }
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/cart");
        if let Some(h) = header {
            builder = builder.header(AUTHORIZATION, h);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc"))).unwrap().as_str(), "abc");
        assert!(bearer_token(&parts(Some("Basic abc"))).is_none());
        assert!(bearer_token(&parts(Some("Bearer   "))).is_none());
        assert!(bearer_token(&parts(None)).is_none());
    }
}
