pub mod auth;
pub mod config;
pub mod core;
pub mod follow;
pub mod likes;
pub mod models;
pub mod posts;
pub mod routes;
pub mod users;

#[cfg(not(target_arch = "wasm32"))]
pub mod server;

#[cfg(target_arch = "wasm32")]
mod component {
    use spin_sdk::http::{IntoResponse, Request};
    use spin_sdk::http_component;
    use crate::core::db::SpinStore;

    #[http_component]
    fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
        let store = SpinStore::open_default()?;
        Ok(crate::routes::dispatch(&store, req))
    }
}
