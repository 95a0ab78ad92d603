pub mod config;
pub mod error;
pub mod explain;
pub mod filter;
pub mod guard;
pub mod keywords;
pub mod normalize;
pub mod parser;
pub mod query;
pub mod server;
pub mod state;
pub mod telemetry;
pub mod time;
pub mod validation;

use crate::{config::AppConfig, server::Server};

pub use query::{build_filter, explain_filter, get_templates};

/// Bootstraps the NLQ translation service using environment configuration.
pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    Server::new(config).run().await
}
