use anyhow::Context;
use parley_server::{AppConfig, run_server};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    parley_telemetry::init_with_format("parley-server", config.log_format);
    if let Some(path) = &config.env_file {
        info!(path = %path.display(), "loaded environment file");
    }
    info!(?config, "starting parley");

    run_server(config).await
}
