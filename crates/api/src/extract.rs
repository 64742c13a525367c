//! Request extractors: caller identity and JSON bodies.
//!
//! Authentication happens at the gateway, which verifies the token and
//! forwards the caller as `X-User-Id` / `X-User-Role` headers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use common::UserId;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Role of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Admin,
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Allows admins and the owner of the resource.
    pub fn ensure_owner_or_admin(&self, owner: UserId, action: &str) -> Result<(), ApiError> {
        if self.is_admin() || self.user_id == owner {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "Forbidden: You can only {action} your own orders"
            )))
        }
    }

    pub fn ensure_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "Forbidden: Admin access required".to_string(),
            ))
        }
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?
            .parse::<UserId>()
            .map_err(|_| ApiError::Unauthorized("Invalid caller identity".to_string()))?;

        let role = match header_value(parts, USER_ROLE_HEADER) {
            None => Role::Customer,
            Some(role) if role.eq_ignore_ascii_case("admin") => Role::Admin,
            Some(role) if role.eq_ignore_ascii_case("customer") => Role::Customer,
            Some(role) => {
                return Err(ApiError::Unauthorized(format!("Unknown role '{role}'")));
            }
        };

        Ok(Self { user_id, role })
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// JSON body extractor whose rejections use the error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        axum::Json::<T>::from_request(req, state)
            .await
            .map(|axum::Json(value)| Self(value))
            .map_err(|rejection: JsonRejection| ApiError::BadRequest(rejection.body_text()))
    }
}
