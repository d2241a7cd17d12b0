pub mod config;
pub mod dimension;
pub mod error;
pub mod promql;
pub mod query;
pub mod rules;
pub mod server;
pub mod state;
pub mod telemetry;
pub mod time;

use crate::{config::AppConfig, server::Server};

/// Bootstraps the activity cube service using environment configuration.
pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    Server::new(config).await?.run().await
}
