use std::collections::HashMap;
use serde::Deserialize;
use spin_sdk::http::{Request, Response};
use ammonia::Builder;
use crate::models::models::{Post, PostSummary, PostView, User, Viewer};
use crate::core::db::KvStore;
use crate::core::errors::ApiError;
use crate::core::helpers::{now_iso, json_response, parse_json_body, content_type};
use crate::core::pagination::{paginate, Page};
use crate::core::query_params::{page_param, parse_pairs};
use crate::auth::require_user;
use crate::follow::followed_ids;
use crate::likes::like_count;
use crate::config::*;

#[derive(Deserialize)]
struct ContentBody {
    content: Option<String>,
}

pub fn get_post<S: KvStore>(store: &S, post_id: u64) -> anyhow::Result<Option<Post>> {
    store.read_json::<Post>(&post_key(post_id))
}

/// Every post, newest first. Equal timestamps fall back to the higher id.
pub fn load_posts<S: KvStore>(store: &S) -> anyhow::Result<Vec<Post>> {
    let mut posts = Vec::new();
    for key in store.keys_with_prefix(POST_PREFIX)? {
        if let Some(p) = store.read_json::<Post>(&key)? {
            posts.push(p);
        }
    }

    posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
    Ok(posts)
}

/// Turns stored posts into viewer-relative views, looking each author up once.
struct Annotator<'a, S: KvStore> {
    store: &'a S,
    viewer: &'a Viewer,
    authors: HashMap<String, String>,
}

impl<'a, S: KvStore> Annotator<'a, S> {
    fn new(store: &'a S, viewer: &'a Viewer) -> Self {
        Self { store, viewer, authors: HashMap::new() }
    }

    fn author(&mut self, user_id: &str) -> anyhow::Result<String> {
        if let Some(name) = self.authors.get(user_id) {
            return Ok(name.clone());
        }
        let name = self
            .store
            .read_json::<User>(&user_key(user_id))?
            .map(|u| u.username)
            .ok_or_else(|| anyhow::anyhow!("post author {} missing", user_id))?;
        self.authors.insert(user_id.to_string(), name.clone());
        Ok(name)
    }

    fn annotate(&mut self, post: Post) -> anyhow::Result<PostView> {
        Ok(PostView {
            user: self.author(&post.user_id)?,
            like_count: like_count(self.store, post.id)?,
            is_liked: self.store.exists(&like_key(post.id, &self.viewer.id))?,
            is_owner: post.user_id == self.viewer.id,
            id: post.id,
            content: post.content,
            timestamp: post.timestamp,
        })
    }
}

fn annotated_page<S: KvStore>(
    store: &S,
    viewer: &Viewer,
    posts: Vec<Post>,
    page: usize,
    page_size: usize,
) -> Result<Page<PostView>, ApiError> {
    let mut annotator = Annotator::new(store, viewer);
    Ok(paginate(posts, page, page_size).try_map(|p| annotator.annotate(p))?)
}

pub fn list_posts<S: KvStore>(store: &S, viewer: &Viewer, page: usize) -> Result<Page<PostView>, ApiError> {
    let posts = load_posts(store)?;
    annotated_page(store, viewer, posts, page, FEED_PAGE_SIZE)
}

pub fn list_following_posts<S: KvStore>(store: &S, viewer: &Viewer, page: usize) -> Result<Page<PostView>, ApiError> {
    let followed = followed_ids(store, &viewer.id)?;
    let posts = load_posts(store)?
        .into_iter()
        .filter(|p| followed.contains(&p.user_id))
        .collect();
    annotated_page(store, viewer, posts, page, FOLLOWING_PAGE_SIZE)
}

pub fn list_user_posts<S: KvStore>(store: &S, viewer: &Viewer, user_id: &str, page: usize) -> Result<Page<PostView>, ApiError> {
    let posts = load_posts(store)?
        .into_iter()
        .filter(|p| p.user_id == user_id)
        .collect();
    annotated_page(store, viewer, posts, page, PROFILE_PAGE_SIZE)
}

fn filter_post_content(content: &str) -> String {
    // Sanitize HTML to remove dangerous scripts and event handlers
    Builder::default()
        .link_rel(Some("noopener noreferrer"))
        .clean(content)
        .to_string()
}

fn validated_content(content: Option<&str>) -> Result<String, ApiError> {
    let content = content.unwrap_or_default().trim();
    // Limit applies to what the author typed, before HTML escaping.
    if content.chars().count() > MAX_POST_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Post content cannot exceed {} characters.",
            MAX_POST_LENGTH
        )));
    }

    let filtered = filter_post_content(content);
    if filtered.trim().is_empty() {
        return Err(ApiError::BadRequest("Post content cannot be empty.".to_string()));
    }
    Ok(filtered)
}

fn summary(post: Post, viewer: &Viewer) -> PostSummary {
    PostSummary {
        id: post.id,
        content: post.content,
        timestamp: post.timestamp,
        user: viewer.username.clone(),
    }
}

pub fn create_post<S: KvStore>(store: &S, viewer: &Viewer, content: Option<&str>) -> Result<PostSummary, ApiError> {
    let content = validated_content(content)?;

    let post = Post {
        id: store.increment(POST_SEQ_KEY)?,
        user_id: viewer.id.clone(),
        content,
        timestamp: now_iso(),
    };
    store.write_json(&post_key(post.id), &post)?;

    tracing::debug!(post_id = post.id, user = %viewer.username, "post created");
    Ok(summary(post, viewer))
}

/// Replaces a post's content in place. Only its author may do this.
pub fn edit_post<S: KvStore>(store: &S, viewer: &Viewer, post_id: u64, new_content: Option<&str>) -> Result<PostSummary, ApiError> {
    let mut post = get_post(store, post_id)?
        .ok_or_else(|| ApiError::NotFound("Post not found.".to_string()))?;

    if post.user_id != viewer.id {
        return Err(ApiError::Forbidden);
    }

    post.content = validated_content(new_content)?;
    store.write_json(&post_key(post.id), &post)?;

    Ok(summary(post, viewer))
}

// === HTTP Handlers ===

pub fn handle_list_posts<S: KvStore>(store: &S, req: Request) -> Result<Response, ApiError> {
    let viewer = require_user(store, &req)?;
    let page = list_posts(store, &viewer, page_param(req.uri()))?;
    json_response(200, &page)
}

pub fn handle_following_posts<S: KvStore>(store: &S, req: Request) -> Result<Response, ApiError> {
    let viewer = require_user(store, &req)?;
    let page = list_following_posts(store, &viewer, page_param(req.uri()))?;
    json_response(200, &page)
}

pub fn handle_create_post<S: KvStore>(store: &S, req: Request) -> Result<Response, ApiError> {
    let viewer = require_user(store, &req)?;
    let body: ContentBody = parse_json_body(&req)?;

    let created = create_post(store, &viewer, body.content.as_deref())?;
    json_response(201, &created)
}

pub fn handle_edit_post<S: KvStore>(store: &S, req: Request, post_id: u64) -> Result<Response, ApiError> {
    let viewer = require_user(store, &req)?;

    let content = if content_type(&req) == "application/json" {
        parse_json_body::<ContentBody>(&req)?.content
    } else {
        let form = std::str::from_utf8(req.body())
            .map_err(|_| ApiError::BadRequest("Invalid form body".to_string()))?;
        parse_pairs(form).remove("content")
    };

    let edited = edit_post(store, &viewer, post_id, content.as_deref())?;
    json_response(200, &edited)
}
