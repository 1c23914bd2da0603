use spin_sdk::http::{Request, Response};
use crate::models::models::{Follow, Viewer};
use crate::core::db::KvStore;
use crate::core::errors::ApiError;
use crate::core::helpers::{now_iso, json_response};
use crate::auth::{require_user, find_user_by_username};
use crate::config::*;

/// Result of a follow toggle, as reported to the caller.
#[derive(Debug, PartialEq, Eq)]
pub struct FollowState {
    pub is_following: bool,
    pub followers_count: usize,
}

pub fn is_following<S: KvStore>(store: &S, follower_id: &str, following_id: &str) -> anyhow::Result<bool> {
    store.exists(&follow_key(follower_id, following_id))
}

/// Ids of every user `user_id` follows.
pub fn followed_ids<S: KvStore>(store: &S, user_id: &str) -> anyhow::Result<Vec<String>> {
    let prefix = following_prefix(user_id);
    Ok(store
        .keys_with_prefix(&prefix)?
        .into_iter()
        .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
        .collect())
}

pub fn following_count<S: KvStore>(store: &S, user_id: &str) -> anyhow::Result<usize> {
    store.count_prefix(&following_prefix(user_id))
}

pub fn followers_count<S: KvStore>(store: &S, user_id: &str) -> anyhow::Result<usize> {
    let count = store
        .keys_with_prefix(FOLLOW_PREFIX)?
        .iter()
        .filter_map(|key| key[FOLLOW_PREFIX.len()..].split_once(':'))
        .filter(|(_, following)| *following == user_id)
        .count();
    Ok(count)
}

/// Follows `target_username` if the viewer does not yet, unfollows otherwise.
pub fn toggle_follow<S: KvStore>(store: &S, viewer: &Viewer, target_username: &str) -> Result<FollowState, ApiError> {
    let target = find_user_by_username(store, target_username)?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    if target.id == viewer.id {
        return Err(ApiError::BadRequest("You cannot follow yourself.".to_string()));
    }

    let edge = Follow {
        follower_id: viewer.id.clone(),
        following_id: target.id.clone(),
        created_at: now_iso(),
    };
    let is_following = store.toggle(&follow_key(&viewer.id, &target.id), &serde_json::to_vec(&edge)?)?;

    tracing::debug!(follower = %viewer.username, following = %target.username, is_following, "follow toggled");

    Ok(FollowState {
        is_following,
        followers_count: followers_count(store, &target.id)?,
    })
}

// === HTTP Handlers ===

pub fn handle_toggle_follow<S: KvStore>(store: &S, req: Request, target_username: &str) -> Result<Response, ApiError> {
    let viewer = require_user(store, &req)?;
    let state = toggle_follow(store, &viewer, target_username)?;

    let (status, message) = if state.is_following {
        (201, "Followed successfully.")
    } else {
        (200, "Unfollowed successfully.")
    };

    json_response(status, &serde_json::json!({
        "message": message,
        "is_following": state.is_following,
        "followers_count": state.followers_count,
    }))
}
