mod blackboard; // shared world snapshot
mod bus; // broadcast topics
mod errands; // per-entity leg queue
mod settings; // TOML + environment configuration
mod simulation; // tick loop and errand runners

use anyhow::Context;
use simulation::Simulation;
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| settings::DEFAULT_CONFIG_PATH.to_string());
    info!("Gulde simulation starting with configuration {}", path);

    let config = settings::load_config(&path)?;
    let simulation = Simulation::from_config(&config).context("Failed to set up simulation")?;

    match simulation.run().await {
        Ok(report) => {
            info!("Simulation tasks finished successfully.");
            print!("{}", report);
            Ok(())
        }
        Err(e) => {
            error!("Simulation tasks failed: {:?}", e);
            Err(e)
        }
    }
}
