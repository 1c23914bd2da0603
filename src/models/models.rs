use serde::{Serialize, Deserialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Post {
    pub id: u64,
    pub user_id: String,
    pub content: String,
    pub timestamp: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Follow {
    pub follower_id: String,
    pub following_id: String,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Like {
    pub user_id: String,
    pub post_id: u64,
    pub created_at: String,
}

#[derive(Serialize, Deserialize)]
pub struct TokenData {
    pub user_id: String,
    pub created_at: String,
}

/// The authenticated caller, resolved from a bearer token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Viewer {
    pub id: String,
    pub username: String,
}

impl From<&User> for Viewer {
    fn from(user: &User) -> Self {
        Viewer {
            id: user.id.clone(),
            username: user.username.clone(),
        }
    }
}

/// A post as clients see it: author resolved to a username and annotated
/// relative to the viewer.
#[derive(Serialize, Debug, Clone)]
pub struct PostView {
    pub id: u64,
    pub user: String,
    pub content: String,
    pub timestamp: String,
    pub like_count: usize,
    pub is_liked: bool,
    pub is_owner: bool,
}

/// Body of create/edit responses.
#[derive(Serialize, Debug)]
pub struct PostSummary {
    pub id: u64,
    pub content: String,
    pub timestamp: String,
    pub user: String,
}
