use std::sync::Arc;
use clap::Parser;
use dotenv::dotenv;
use tracing::{info, warn};
use crate::config::Config;
use crate::repositories::postgres_repo::PostgresRepo;

pub mod config;
pub mod controller;
pub mod helpers;
pub mod models;
pub mod repositories;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::parse();
    info!("Starting LightBnB backend in {} environment", config.environment);

    let postgres_repo = Arc::new(PostgresRepo::connect(&config).await?);
    let serve_res = controller::serve(postgres_repo.clone(), &config).await;

    match Arc::try_unwrap(postgres_repo) {
        Ok(postgres_repo) => postgres_repo.close(),
        Err(_) => warn!("Postgres pool still shared at shutdown, dropping without close"),
    }

    serve_res
}
