use anyhow::{Context, Result};
use clap::Parser;

use geoblocker::cli::{Cli, Commands};
use geoblocker::config::init_config;
use geoblocker::runtime::modes;
use geoblocker::system::init_logging;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::GenerateConfig { output_path, force } => {
            modes::run_generate_config(output_path, force)
        }
        Commands::Serve => {
            let config = init_config(&cli.config);
            // guard 需要活到 main 结束，否则缓冲的日志会丢失
            let _log_guard =
                init_logging(&config.logging).context("Failed to initialize logging")?;
            tracing::info!(
                "geoblocker v{} starting (config: {})",
                env!("CARGO_PKG_VERSION"),
                cli.config
            );

            serve().await
        }
    }
}

#[cfg(feature = "server")]
async fn serve() -> Result<()> {
    modes::run_server().await
}

#[cfg(not(feature = "server"))]
async fn serve() -> Result<()> {
    anyhow::bail!("geoblocker was built without the `server` feature")
}
