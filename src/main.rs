use clap::Parser;
use pension::cli::{Cli, Commands};
use pension::config::AppConfig;
use pension::error::{PensionError, Result};
use tracing::{error, info};

mod main_runtime;

use main_runtime::{init_logging, run_migrate, run_seed, run_serve};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config_dir)?;
    let _log_guard = init_logging(&config.logging);

    if let Err(errors) = config.validate() {
        for e in &errors {
            error!("Invalid configuration: {}", e);
        }
        return Err(PensionError::Validation(errors.join("; ")));
    }

    match cli.command() {
        Commands::Serve => run_serve(&config).await?,
        Commands::Migrate => {
            run_migrate(&config).await?;
            info!("Migrations applied");
        }
        Commands::Seed => run_seed(&config).await?,
    }

    Ok(())
}
