use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::{debug, error};

use tuition_admin::cli::{self, Cli};
use tuition_admin::config::AdminConfig;
use tuition_admin::services::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AdminConfig::load(cli.config.as_deref())?;
    logging::init(&config.log_filter).map_err(|e| anyhow!(e))?;
    debug!("Using API at {}", config.api_base_url);

    cli::run(cli, config).await.map_err(|e| {
        error!("{:#}", e);
        e
    })
}
