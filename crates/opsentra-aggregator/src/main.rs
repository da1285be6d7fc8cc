mod config;
mod routes;
mod state;
mod supervisor;

use config::AggregatorConfig;
use supervisor::Supervisor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let config = AggregatorConfig::from_env()?;
    Supervisor::new(config).run().await
}
