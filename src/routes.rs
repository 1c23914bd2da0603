use spin_sdk::http::{Method, Request, Response};
use crate::core::db::KvStore;
use crate::core::errors::ApiError;
use crate::core::static_server::serve_static;
use crate::{auth, follow, likes, posts, users};

/// Routes a request to its handler and renders any error as JSON.
///
/// Shared by the Spin component and the native server.
pub fn dispatch<S: KvStore>(store: &S, req: Request) -> Response {
    match route(store, req) {
        Ok(resp) => resp,
        Err(err) => err.into(),
    }
}

fn route<S: KvStore>(store: &S, req: Request) -> Result<Response, ApiError> {
    let path = req.path().trim_end_matches('/').to_string();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let is_get = matches!(req.method(), Method::Get);
    let is_post = matches!(req.method(), Method::Post);

    match segments.as_slice() {
        [] if is_get => serve_static("/"),
        ["register"] if is_post => users::handle_register(store, req),
        ["login"] if is_post => auth::login_user(store, req),
        ["logout"] if is_get || is_post => auth::logout_user(store, req),
        ["posts"] if is_get => posts::handle_list_posts(store, req),
        ["posts"] if is_post => posts::handle_create_post(store, req),
        ["posts", id, "edit"] if is_post => {
            let post_id = parse_id(id)?;
            posts::handle_edit_post(store, req, post_id)
        }
        ["like", id] if is_post => {
            let post_id = parse_id(id)?;
            likes::handle_set_like(store, req, post_id)
        }
        ["profile", username] if is_get => {
            let username = decode(username);
            users::handle_get_profile(store, req, &username)
        }
        ["follow", username] if is_post => {
            let username = decode(username);
            follow::handle_toggle_follow(store, req, &username)
        }
        ["following_posts"] if is_get => posts::handle_following_posts(store, req),
        [file] if is_get && file.contains('.') => serve_static(&path),
        [] | ["register"] | ["login"] | ["logout"] | ["posts"] | ["posts", _, "edit"]
        | ["like", _] | ["profile", _] | ["follow", _] | ["following_posts"] => {
            Err(ApiError::MethodNotAllowed)
        }
        _ => Err(ApiError::NotFound("No route found".to_string())),
    }
}

/// Post ids are plain integers; anything else is an unknown route.
fn parse_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse::<u64>()
        .map_err(|_| ApiError::NotFound("No route found".to_string()))
}

fn decode(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}
