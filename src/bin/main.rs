#[cfg(not(target_arch = "wasm32"))]
mod native {
    use actix_web::{web, App, HttpServer};
    use network::config::bind_addr;
    use network::core::db::MemoryStore;
    use tracing_actix_web::TracingLogger;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    pub async fn run() -> std::io::Result<()> {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .init();

        let addr = bind_addr();
        let store = web::Data::new(MemoryStore::new());

        tracing::info!("Server listening on http://{}", addr);

        HttpServer::new(move || {
            App::new()
                .wrap(TracingLogger::default())
                .app_data(store.clone())
                .configure(network::server::configure)
        })
        .bind(addr)?
        .run()
        .await
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    native::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
