use network::core::db::MemoryStore;
use network::routes::dispatch;
use serde_json::{json, Value};
use spin_sdk::http::{Method, Request, Response};

fn send(store: &MemoryStore, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Response {
    let mut builder = Request::builder();
    builder.method(method).uri(uri);
    if let Some(token) = token {
        builder.header("Authorization", format!("Bearer {}", token).as_str());
    }
    if let Some(body) = body {
        builder.header("Content-Type", "application/json");
        builder.body(serde_json::to_vec(&body).unwrap());
    }
    dispatch(store, builder.build())
}

fn json_body(resp: &Response) -> Value {
    serde_json::from_slice(resp.body()).unwrap()
}

fn register(store: &MemoryStore, username: &str) -> String {
    let resp = send(store, Method::Post, "/register", None, Some(json!({
        "username": username,
        "email": format!("{}@example.com", username),
        "password": "secret",
        "confirmation": "secret",
    })));
    assert_eq!(*resp.status(), 201);

    let resp = send(store, Method::Post, "/login", None, Some(json!({
        "username": username,
        "password": "secret",
    })));
    assert_eq!(*resp.status(), 200);
    json_body(&resp)["token"].as_str().unwrap().to_string()
}

#[test]
fn test_post_and_like_flow() {
    let store = MemoryStore::new();
    let alice = register(&store, "alice");
    let bob = register(&store, "bob");

    let resp = send(&store, Method::Post, "/posts", Some(&alice), Some(json!({"content": "hello"})));
    assert_eq!(*resp.status(), 201);
    let post = json_body(&resp);
    assert_eq!(post["user"], "alice");
    assert_eq!(post["content"], "hello");
    let post_id = post["id"].as_u64().unwrap();

    let feed = json_body(&send(&store, Method::Get, "/posts", Some(&alice), None));
    assert_eq!(feed["posts"].as_array().unwrap().len(), 1);
    assert_eq!(feed["posts"][0]["user"], "alice");
    assert_eq!(feed["posts"][0]["like_count"], 0);
    assert_eq!(feed["posts"][0]["is_owner"], true);
    assert_eq!(feed["current_page"], 1);
    assert_eq!(feed["total_pages"], 1);
    assert_eq!(feed["has_next"], false);
    assert_eq!(feed["has_previous"], false);

    let like_uri = format!("/like/{}", post_id);
    let resp = send(&store, Method::Post, &like_uri, Some(&bob), Some(json!({"liked": true})));
    assert_eq!(*resp.status(), 200);
    assert_eq!(json_body(&resp)["like_count"], 1);

    let resp = send(&store, Method::Post, &like_uri, Some(&bob), Some(json!({"liked": false})));
    assert_eq!(json_body(&resp)["like_count"], 0);
}

#[test]
fn test_follow_toggle_and_following_feed() {
    let store = MemoryStore::new();
    let alice = register(&store, "alice");
    let bob = register(&store, "bob");
    send(&store, Method::Post, "/posts", Some(&bob), Some(json!({"content": "from bob"})));

    let resp = send(&store, Method::Post, "/follow/bob", Some(&alice), None);
    assert_eq!(*resp.status(), 201);
    assert_eq!(json_body(&resp)["is_following"], true);

    let feed = json_body(&send(&store, Method::Get, "/following_posts", Some(&alice), None));
    assert_eq!(feed["posts"][0]["content"], "from bob");

    let profile = json_body(&send(&store, Method::Get, "/profile/bob", Some(&alice), None));
    assert_eq!(profile["is_following"], true);
    assert_eq!(profile["followers_count"], 1);
    assert_eq!(profile["posts"][0]["is_liked"], false);

    let resp = send(&store, Method::Post, "/follow/bob", Some(&alice), None);
    assert_eq!(*resp.status(), 200);
    assert_eq!(json_body(&resp)["is_following"], false);

    let resp = send(&store, Method::Post, "/follow/alice", Some(&alice), None);
    assert_eq!(*resp.status(), 400);
}

#[test]
fn test_edit_post_with_form_body() {
    let store = MemoryStore::new();
    let alice = register(&store, "alice");
    let bob = register(&store, "bob");
    let post = json_body(&send(&store, Method::Post, "/posts", Some(&alice), Some(json!({"content": "draft"}))));
    let edit_uri = format!("/posts/{}/edit", post["id"]);

    let form = |token: &str, content: &str| {
        let mut builder = Request::builder();
        builder
            .method(Method::Post)
            .uri(edit_uri.as_str())
            .header("Authorization", format!("Bearer {}", token).as_str())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(content.as_bytes().to_vec());
        builder.build()
    };

    let resp = dispatch(&store, form(&bob, "content=stolen"));
    assert_eq!(*resp.status(), 403);

    let resp = dispatch(&store, form(&alice, "content="));
    assert_eq!(*resp.status(), 400);

    let resp = dispatch(&store, form(&alice, "content=final+version"));
    assert_eq!(*resp.status(), 200);
    assert_eq!(json_body(&resp)["content"], "final version");
}

#[test]
fn test_errors_are_json() {
    let store = MemoryStore::new();
    let token = register(&store, "alice");

    let resp = send(&store, Method::Get, "/posts", None, None);
    assert_eq!(*resp.status(), 401);
    assert_eq!(json_body(&resp)["error"], "Unauthorized");

    let resp = send(&store, Method::Get, "/profile/ghost", Some(&token), None);
    assert_eq!(*resp.status(), 404);

    let resp = send(&store, Method::Get, "/follow/alice", Some(&token), None);
    assert_eq!(*resp.status(), 405);

    let mut builder = Request::builder();
    builder
        .method(Method::Post)
        .uri("/like/1")
        .header("Authorization", format!("Bearer {}", token).as_str())
        .body(b"{not json".to_vec());
    let resp = dispatch(&store, builder.build());
    assert_eq!(*resp.status(), 400);
    assert_eq!(json_body(&resp)["error"], "Invalid JSON");

    let resp = send(&store, Method::Post, "/like/abc", Some(&token), Some(json!({"liked": true})));
    assert_eq!(*resp.status(), 404);
}

#[test]
fn test_logout_revokes_token() {
    let store = MemoryStore::new();
    let token = register(&store, "alice");

    let resp = send(&store, Method::Post, "/logout", Some(&token), None);
    assert_eq!(*resp.status(), 200);

    let resp = send(&store, Method::Get, "/posts", Some(&token), None);
    assert_eq!(*resp.status(), 401);

    let resp = send(&store, Method::Post, "/logout", Some(&token), None);
    assert_eq!(*resp.status(), 401);
}

#[test]
fn test_logout_over_get() {
    let store = MemoryStore::new();
    let token = register(&store, "alice");

    let resp = send(&store, Method::Get, "/logout", Some(&token), None);
    assert_eq!(*resp.status(), 200);
    assert_eq!(json_body(&resp)["message"], "Logged out successfully");

    let resp = send(&store, Method::Get, "/logout", Some("made-up"), None);
    assert_eq!(*resp.status(), 401);
}

#[test]
fn test_register_rejects_mismatch_and_duplicates() {
    let store = MemoryStore::new();
    register(&store, "alice");

    let resp = send(&store, Method::Post, "/register", None, Some(json!({
        "username": "bob", "email": "", "password": "one", "confirmation": "two",
    })));
    assert_eq!(*resp.status(), 400);

    let resp = send(&store, Method::Post, "/register", None, Some(json!({
        "username": "alice", "email": "", "password": "abc", "confirmation": "abc",
    })));
    assert_eq!(*resp.status(), 409);
}

#[actix_web::test]
async fn test_native_server_adapter() {
    use actix_web::{test, web, App};

    let store = web::Data::new(MemoryStore::new());
    let app = test::init_service(App::new().app_data(store.clone()).configure(network::server::configure)).await;

    let req = test::TestRequest::post()
        .uri("/register")
        .set_json(json!({
            "username": "carol",
            "email": "carol@example.com",
            "password": "secret",
            "confirmation": "secret",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: Value = test::read_body_json(resp).await;
    let token = body["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/posts?page=1")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let feed: Value = test::read_body_json(resp).await;
    assert_eq!(feed["posts"], json!([]));
}
