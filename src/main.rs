mod config;
mod db;
mod error;
mod executor;
mod mapper;
mod models;
mod repository;
mod routes;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use crate::{config::Config, executor::QueryExecutor, repository::MovieRepository};

pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: MovieRepository,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,movieshelf=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let db = db::connect_and_migrate(&config.database_url).await?;
    let catalog = MovieRepository::new(QueryExecutor::new(db));

    let state = Arc::new(AppState { config: config.clone(), catalog });
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, env = %config.env, version = routes::VERSION, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
