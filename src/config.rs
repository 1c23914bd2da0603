pub const FEED_PAGE_SIZE: usize = 10;
// Following feed pages by 2, unlike the main feed.
pub const FOLLOWING_PAGE_SIZE: usize = 2;
pub const PROFILE_PAGE_SIZE: usize = 10;

pub const MAX_POST_LENGTH: usize = 5000;
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 3;

pub const POST_SEQ_KEY: &str = "post_seq";
pub const POST_PREFIX: &str = "post:";
pub const FOLLOW_PREFIX: &str = "follow:";

pub fn token_expiration_hours() -> i64 {
    std::env::var("NETWORK_TOKEN_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24)
}

pub fn bind_addr() -> String {
    std::env::var("NETWORK_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
}

// === Store keys ===

pub fn user_key(user_id: &str) -> String {
    format!("user:{}", user_id)
}

pub fn username_key(username: &str) -> String {
    format!("username:{}", username)
}

pub fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

pub fn post_key(post_id: u64) -> String {
    format!("{}{}", POST_PREFIX, post_id)
}

pub fn like_key(post_id: u64, user_id: &str) -> String {
    format!("{}{}", like_prefix(post_id), user_id)
}

pub fn like_prefix(post_id: u64) -> String {
    format!("like:{}:", post_id)
}

pub fn follow_key(follower_id: &str, following_id: &str) -> String {
    format!("{}{}", following_prefix(follower_id), following_id)
}

/// Prefix of every follow edge going out of `follower_id`.
pub fn following_prefix(follower_id: &str) -> String {
    format!("{}{}:", FOLLOW_PREFIX, follower_id)
}
