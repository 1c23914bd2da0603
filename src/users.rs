use std::sync::OnceLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use spin_sdk::http::{Request, Response};
use uuid::Uuid;
use crate::models::models::{PostView, User, Viewer};
use crate::core::db::KvStore;
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, json_response, parse_json_body};
use crate::core::pagination::Page;
use crate::core::query_params::page_param;
use crate::auth::{require_user, find_user_by_username, issue_token};
use crate::follow::{followers_count, following_count, is_following};
use crate::posts::list_user_posts;
use crate::config::*;

#[derive(Deserialize)]
struct RegisterForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    confirmation: String,
}

#[derive(Serialize)]
pub struct PublicUser {
    pub username: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct Profile {
    pub user: PublicUser,
    pub is_following: bool,
    pub followers_count: usize,
    pub following_count: usize,
    #[serde(flatten)]
    pub page: Page<PostView>,
}

fn username_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[\w.@+-]+$").expect("Regex should compile")
    })
}

fn validate_registration(username: &str, email: &str, password: &str) -> Result<(), ApiError> {
    if username.len() < MIN_USERNAME_LENGTH || username.len() > MAX_USERNAME_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Username must be {}-{} characters.",
            MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
        )));
    }
    if !username_regex().is_match(username) {
        return Err(ApiError::BadRequest(
            "Username may only contain letters, digits and @/./+/-/_ characters.".to_string(),
        ));
    }
    if !email.is_empty() && !email.contains('@') {
        return Err(ApiError::BadRequest("Invalid email address.".to_string()));
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters.",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

/// Creates a user, claiming the username atomically.
pub fn register_user<S: KvStore>(store: &S, username: &str, email: &str, password: &str) -> Result<User, ApiError> {
    let username = username.trim();
    let email = email.trim();
    validate_registration(username, email, password)?;

    let user = User {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        email: email.to_string(),
        password: hash_password(password)?,
    };

    if !store.set_if_absent(&username_key(&user.username), user.id.as_bytes())? {
        return Err(ApiError::Conflict("Username already taken.".to_string()));
    }
    if let Err(e) = store.write_json(&user_key(&user.id), &user) {
        // Release the name so the user can try again.
        if let Err(cleanup) = store.delete(&username_key(&user.username)) {
            tracing::error!(username = %user.username, error = ?cleanup, "failed to release username");
        }
        return Err(e.into());
    }

    tracing::info!(username = %user.username, "user registered");
    Ok(user)
}

pub fn get_profile<S: KvStore>(store: &S, viewer: &Viewer, username: &str, page: usize) -> Result<Profile, ApiError> {
    let target = find_user_by_username(store, username)?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    Ok(Profile {
        is_following: is_following(store, &viewer.id, &target.id)?,
        followers_count: followers_count(store, &target.id)?,
        following_count: following_count(store, &target.id)?,
        page: list_user_posts(store, viewer, &target.id, page)?,
        user: PublicUser {
            username: target.username,
            email: target.email,
        },
    })
}

// === HTTP Handlers ===

pub fn handle_register<S: KvStore>(store: &S, req: Request) -> Result<Response, ApiError> {
    let form: RegisterForm = parse_json_body(&req)?;

    if form.password != form.confirmation {
        return Err(ApiError::BadRequest("Passwords must match.".to_string()));
    }

    let user = register_user(store, &form.username, &form.email, &form.password)?;
    let token = issue_token(store, &user.id)?;

    json_response(201, &serde_json::json!({
        "id": user.id,
        "username": user.username,
        "email": user.email,
        "token": token,
    }))
}

pub fn handle_get_profile<S: KvStore>(store: &S, req: Request, username: &str) -> Result<Response, ApiError> {
    let viewer = require_user(store, &req)?;
    let profile = get_profile(store, &viewer, username, page_param(req.uri()))?;
    json_response(200, &profile)
}
