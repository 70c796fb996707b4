//! Example consumer: a separate Rust project that wires its modules through supermodels-sdk.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Or from this directory: `cargo run`
//!
//! Module roots are this crate's own `src/` directory whatever the working directory,
//! since the manifest paths are fixed at compile time. `MODULE_GLOBS` still applies.

mod controllers {
    pub mod user;
}
mod models {
    pub mod audit;
    pub mod user;
}
mod routes {
    pub mod users;
}

use axum::Router;
use supermodels_sdk::{
    common_routes, init_tracing, start, AppConfig, AppState, LoaderConfig, Manifest, StartupError,
};
use tokio::net::TcpListener;

const SRC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src");

/// Roots every role under [`SRC_DIR`], keeping the configured globs.
fn loader_config(configured: LoaderConfig) -> LoaderConfig {
    LoaderConfig {
        module_globs: configured.module_globs,
        ..LoaderConfig::rooted_at(SRC_DIR)
    }
}

fn manifest() -> Result<Manifest, StartupError> {
    Ok(Manifest::new()
        .with(models::audit::entry()?)
        .with(models::user::entry()?)
        .with(controllers::user::entry())
        .with(routes::users::entry()))
}

async fn run() -> Result<(), StartupError> {
    let mut config = AppConfig::from_env()?;
    config.loader = loader_config(config.loader);
    let ready = start(&config, manifest()?).await?;

    let mut app = Router::new();
    for key in &ready.loaded.routes {
        let router = ready.container.resolve_as::<Router>(key)?;
        app = app.merge(Router::clone(&router));
    }
    let app = app.merge(common_routes(AppState::new(ready.container.clone())));

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Example consumer listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing("supermodels_sdk=info,example_consumer=info");
    if let Err(e) = run().await {
        tracing::error!(fatal = true, error = %e, "startup failed");
        std::process::exit(e.exit_code());
    }
}
