mod cli;
mod serve;

use brief_server::BriefConfig;
use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = BriefConfig::load_or_default(&cli.config);
    if let Some(dir) = &cli.data_dir {
        config.server.data_dir = dir.clone();
    }

    match cli.command {
        Commands::Serve => serve::run(config).await,
        Commands::Chat(args) => cli::shell::run(args, config).await,
        Commands::Ingest(cmd) => cli::ingest::run(cmd, config).await,
        Commands::Project(cmd) => cli::project::run(cmd, config).await,
        Commands::Config(cmd) => cli::config_cmd::run(cmd, &cli.config, config).await,
    }
}
