use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod middleware;
mod models;
mod repositories;
mod routes;
mod state;
mod thumbnails;

#[cfg(test)]
mod test_support;

use common::database::{health_check, init_pool};
use media::{FfmpegFastStart, FfprobeProbe, IngestionPipeline, S3ObjectStore};
use tokio::net::TcpListener;

use crate::{
    config::AppConfig, middleware::JwtValidator, repositories::VideoRepository, state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting API service");

    let config = AppConfig::from_env()?;

    // Initialize database connection pool
    let pool = init_pool(&config.database()).await?;
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let videos = VideoRepository::new(pool);
    videos.ensure_schema().await?;

    let pipeline_config = config.pipeline();
    let object_store =
        S3ObjectStore::connect(config.s3_region.clone(), config.s3_endpoint.clone()).await;
    let pipeline = IngestionPipeline::new(
        &pipeline_config,
        Arc::new(videos.clone()),
        Arc::new(FfprobeProbe::new(&pipeline_config)),
        Arc::new(FfmpegFastStart::new(&pipeline_config)),
        Arc::new(object_store),
    );

    let app_state = AppState {
        videos: Arc::new(videos),
        pipeline: Arc::new(pipeline),
        jwt: JwtValidator::new(&config.jwt_secret),
        assets_root: config.assets_root.clone(),
        port: config.port,
        presign_ttl: config.presign_ttl(),
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("API service listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
