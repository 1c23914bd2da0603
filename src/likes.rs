use serde::Deserialize;
use spin_sdk::http::{Request, Response};
use crate::models::models::{Like, Viewer};
use crate::core::db::KvStore;
use crate::core::errors::ApiError;
use crate::core::helpers::{now_iso, json_response, parse_json_body};
use crate::auth::require_user;
use crate::posts::get_post;
use crate::config::*;

#[derive(Deserialize)]
struct LikeBody {
    liked: bool,
}

pub fn like_count<S: KvStore>(store: &S, post_id: u64) -> anyhow::Result<usize> {
    store.count_prefix(&like_prefix(post_id))
}

/// Puts the viewer's like on `post_id` into the requested state and returns
/// the post's like count afterwards. Repeating a call changes nothing.
pub fn set_like<S: KvStore>(store: &S, viewer: &Viewer, post_id: u64, liked: bool) -> Result<usize, ApiError> {
    if get_post(store, post_id)?.is_none() {
        return Err(ApiError::NotFound("Post not found.".to_string()));
    }

    let key = like_key(post_id, &viewer.id);
    if liked {
        let like = Like {
            user_id: viewer.id.clone(),
            post_id,
            created_at: now_iso(),
        };
        // Keep the original like time on repeats.
        store.set_if_absent(&key, &serde_json::to_vec(&like)?)?;
    } else {
        store.delete(&key)?;
    }

    Ok(like_count(store, post_id)?)
}

// === HTTP Handlers ===

pub fn handle_set_like<S: KvStore>(store: &S, req: Request, post_id: u64) -> Result<Response, ApiError> {
    let viewer = require_user(store, &req)?;
    let body: LikeBody = parse_json_body(&req)?;

    let count = set_like(store, &viewer, post_id, body.liked)?;
    json_response(200, &serde_json::json!({
        "like_count": count,
        "liked": body.liked,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::MemoryStore;
    use crate::posts::create_post;
    use crate::users::register_user;

    fn viewer<S: KvStore>(store: &S, name: &str) -> Viewer {
        let user = register_user(store, name, &format!("{}@example.com", name), "pw1").unwrap();
        Viewer::from(&user)
    }

    #[test]
    fn like_then_unlike_returns_to_zero() {
        let store = MemoryStore::new();
        let alice = viewer(&store, "alice");
        let bob = viewer(&store, "bob");
        let post = create_post(&store, &alice, Some("hello")).unwrap();

        assert_eq!(set_like(&store, &bob, post.id, true).unwrap(), 1);
        assert_eq!(set_like(&store, &bob, post.id, false).unwrap(), 0);
    }

    #[test]
    fn repeated_likes_and_unlikes_are_idempotent() {
        let store = MemoryStore::new();
        let alice = viewer(&store, "alice");
        let bob = viewer(&store, "bob");
        let post = create_post(&store, &alice, Some("hello")).unwrap();

        assert_eq!(set_like(&store, &bob, post.id, false).unwrap(), 0);
        assert_eq!(set_like(&store, &bob, post.id, true).unwrap(), 1);
        assert_eq!(set_like(&store, &bob, post.id, true).unwrap(), 1);
        assert_eq!(set_like(&store, &alice, post.id, true).unwrap(), 2);
    }

    #[test]
    fn racing_likes_from_one_viewer_count_once() {
        let store = MemoryStore::new();
        let alice = viewer(&store, "alice");
        let bob = viewer(&store, "bob");
        let post = create_post(&store, &alice, Some("hello")).unwrap();

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| set_like(&store, &bob, post.id, true).unwrap());
            }
        });
        assert_eq!(like_count(&store, post.id).unwrap(), 1);
    }

    #[test]
    fn liking_a_missing_post_is_not_found() {
        let store = MemoryStore::new();
        let bob = viewer(&store, "bob");
        assert!(matches!(set_like(&store, &bob, 42, true), Err(ApiError::NotFound(_))));
        assert_eq!(store.count_prefix("like:").unwrap(), 0);
    }
}
