use serde::Deserialize;
use spin_sdk::http::{Request, Response};
use uuid::Uuid;
use crate::models::models::{User, TokenData, Viewer};
use crate::config::*;
use crate::core::db::KvStore;
use crate::core::errors::ApiError;
use crate::core::helpers::{verify_password, now_iso, json_response, parse_json_body};

#[derive(Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub fn find_user_by_username<S: KvStore>(store: &S, username: &str) -> anyhow::Result<Option<User>> {
    let user_id = match store.get(&username_key(username))? {
        Some(raw) => String::from_utf8(raw)?,
        None => return Ok(None),
    };
    store.read_json::<User>(&user_key(&user_id))
}

pub fn issue_token<S: KvStore>(store: &S, user_id: &str) -> anyhow::Result<String> {
    let token = Uuid::new_v4().to_string();
    let data = TokenData {
        user_id: user_id.to_string(),
        created_at: now_iso(),
    };
    store.write_json(&token_key(&token), &data)?;
    Ok(token)
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.header("Authorization")?
        .as_str()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolves the request's bearer token to a live user.
pub fn validate_token<S: KvStore>(store: &S, req: &Request) -> anyhow::Result<Option<User>> {
    let token = match bearer_token(req) {
        Some(t) => t,
        None => return Ok(None),
    };
    let data = match store.read_json::<TokenData>(&token_key(token))? {
        Some(d) => d,
        None => return Ok(None),
    };

    // Check if token is expired. An unreadable issue time counts as expired.
    let created = match chrono::DateTime::parse_from_rfc3339(&data.created_at) {
        Ok(c) => c.with_timezone(&chrono::Utc),
        Err(_) => return Ok(None),
    };
    if (chrono::Utc::now() - created).num_hours() > token_expiration_hours() {
        return Ok(None);
    }

    // Check if user still exists
    store.read_json::<User>(&user_key(&data.user_id))
}

/// Guard run at the top of every authenticated handler.
pub fn require_user<S: KvStore>(store: &S, req: &Request) -> Result<Viewer, ApiError> {
    match validate_token(store, req)? {
        Some(user) => Ok(Viewer::from(&user)),
        None => Err(ApiError::Unauthorized),
    }
}

// === HTTP Handlers ===

pub fn login_user<S: KvStore>(store: &S, req: Request) -> Result<Response, ApiError> {
    let creds: LoginForm = parse_json_body(&req)?;

    let user = match find_user_by_username(store, &creds.username)? {
        Some(u) if verify_password(&creds.password, &u.password) => u,
        _ => {
            tracing::warn!(username = %creds.username, "rejected login");
            return Err(ApiError::Unauthorized);
        }
    };

    let token = issue_token(store, &user.id)?;
    json_response(200, &serde_json::json!({
        "token": token,
        "user_id": user.id,
        "username": user.username,
    }))
}

/// Revokes the caller's token. Only a token that would pass the guard can be revoked.
pub fn logout_user<S: KvStore>(store: &S, req: Request) -> Result<Response, ApiError> {
    let token = bearer_token(&req).ok_or(ApiError::Unauthorized)?;
    let viewer = require_user(store, &req)?;
    store.delete(&token_key(token))?;
    tracing::debug!(user = %viewer.username, "logged out");

    json_response(200, &serde_json::json!({
        "message": "Logged out successfully"
    }))
}
