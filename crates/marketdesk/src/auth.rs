use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use crate::app::AppState;
use crate::db_ops::hash_token;
use crate::error::DeskError;
use crate::storage::*;
use marketdesk_models::{Identity, Profile, Role};

pub const SESSION_COOKIE: &str = "desk_session";
pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

// Axum extractor for Identity. A valid bearer token or session cookie gives
// Identity::User, anything else Identity::Anonymous. Only a storage failure
// rejects the request.
#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = DeskError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(identity.clone());
        }

        let Some(token) = session_token(&parts.headers) else {
            return Ok(Identity::Anonymous);
        };

        let hash = state.storage.hash_token(&token);
        match state.storage.session_user(&hash)? {
            Some((id, email)) => Ok(Identity::User { id, email }),
            None => Ok(Identity::Anonymous),
        }
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Bearer token first, then the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    bearer(headers).or_else(|| {
        headers
            .get_all("cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|h| h.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, value)| value.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

pub fn require_user(identity: &Identity) -> Result<&str, DeskError> {
    identity.user_id().ok_or(DeskError::Unauthorized)
}

/// Anonymous callers get 401; a session with no profile or the wrong role
/// gets 403.
pub fn require_role(
    storage: &dyn StorageBackend,
    identity: &Identity,
    role: Role,
) -> Result<Profile, DeskError> {
    let user_id = require_user(identity)?;
    let profile = storage.get_profile(user_id)?.ok_or(DeskError::Forbidden)?;
    if profile.role != role {
        tracing::debug!(user_id, role = profile.role.as_str(), "role check failed");
        return Err(DeskError::Forbidden);
    }
    Ok(profile)
}

/// Query `secret`, then `x-cron-secret`, then a bearer token. The first
/// non-empty value wins.
pub fn extract_cron_secret(query_secret: Option<&str>, headers: &HeaderMap) -> Option<String> {
    let from_query = query_secret
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let from_header = || {
        headers
            .get(CRON_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    from_query.or_else(from_header).or_else(|| bearer(headers))
}

/// Compares digests so the check does not short-circuit on the secret bytes.
pub fn verify_cron_secret(expected: Option<&str>, provided: Option<&str>) -> bool {
    match (expected, provided) {
        (Some(expected), Some(provided)) if !expected.is_empty() && !provided.is_empty() => {
            hash_token(expected) == hash_token(provided)
        }
        _ => false,
    }
}
