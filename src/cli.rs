use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pension")]
#[command(version)]
#[command(about = "Pension plan balance and withdrawal service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory holding default.toml and per-environment overrides
    #[arg(long, default_value = "config", env = "PENSION_CONFIG_DIR")]
    pub config_dir: String,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP API and the withdrawal consumers (default)
    Serve,
    /// Apply database migrations and exit
    Migrate,
    /// Apply migrations, then insert demo data into empty tables
    Seed,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.unwrap_or(Commands::Serve)
    }
}
