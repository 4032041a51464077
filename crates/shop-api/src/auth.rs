//! # Caller Identity
//!
//! Resolves `Authorization: Bearer <token>` against the user directory.
//! A request without the header is anonymous; an unknown token is rejected.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use shop_core::{CommerceError, Role, User};
use tracing::debug;

/// Who is making the request
#[derive(Debug, Clone, Default)]
pub struct Caller {
    user: Option<User>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn signed_in(user: User) -> Self {
        Self { user: Some(user) }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn role(&self) -> Role {
        self.user.as_ref().map(User::role).unwrap_or(Role::Anonymous)
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, ApiError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(CommerceError::Unauthenticated)?;
    Ok(Some(token))
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts)? else {
            return Ok(Caller::anonymous());
        };
        match state.users.authenticate(token) {
            Some(user) => {
                debug!(user_id = user.id, "authenticated");
                Ok(Caller::signed_in(user.clone()))
            }
            None => Err(CommerceError::Unauthenticated.into()),
        }
    }
}
