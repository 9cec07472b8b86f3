//! Bearer token authentication
//!
//! Resolves the `Authorization` header to a [`User`] whose `account_id`
//! scopes every item operation of the request.

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tracing::debug;

use super::handlers::AppState;
use crate::error::{AppError, Result};
use crate::models::User;

const BEARER_PREFIX: &str = "bearer ";

// == Authenticator Trait ==
/// Maps an access token to the caller it belongs to.
#[async_trait]
pub trait Authenticator: Send + Sync + Debug {
    /// Returns `Unauthorized` for unknown tokens.
    async fn authenticate(&self, token: &str) -> Result<User>;
}

// == Static Authenticator ==
/// Fixed token table loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    users: HashMap<String, User>,
}

impl StaticAuthenticator {
    /// Builds the table from `(token, account_id)` pairs. The account id
    /// doubles as user id and name.
    pub fn from_pairs<I, T, A>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, A)>,
        T: Into<String>,
        A: Into<String>,
    {
        let users = pairs
            .into_iter()
            .map(|(token, account)| {
                let account = account.into();
                (token.into(), User::new(account.clone(), account.clone(), account))
            })
            .collect();
        Self { users }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<User> {
        self.users
            .get(token)
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("invalid token".to_string()))
    }
}

/// Pulls the token out of `Authorization`, with or without a `Bearer` prefix.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();

    let token = match raw.get(..BEARER_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(BEARER_PREFIX) => &raw[BEARER_PREFIX.len()..],
        _ => raw,
    }
    .trim();

    (!token.is_empty()).then_some(token)
}

// == Extractor ==
/// Authenticated caller of the current request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("missing access token".to_string()))?;

        let user = state.auth.authenticate(token).await?;
        debug!(account_id = %user.account_id, "Authenticated request");

        Ok(AuthUser(user))
    }
}
