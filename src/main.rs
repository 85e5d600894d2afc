mod gateway;
mod promo;
mod provider_builder;

use clap::{Parser, Subcommand};
use scribe_channels::discord::DiscordChannel;
use scribe_core::{command::RepairMode, config, shellexpand, traits::Platform};
use scribe_memory::Store;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(
    name = "scribe",
    version,
    about = "Scribe: Discord bot for grammar repair, moderation, and short-memory chat"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and run the bot.
    Start,
    /// Show configuration and backend availability.
    Status,
    /// Run the text repair pass once and print the result.
    Repair {
        /// Use the long-form article mode.
        #[arg(long)]
        article: bool,
        /// The text to repair.
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,
    },
}

/// Stderr plus a daily-rotated file under `{data_dir}/logs`.
///
/// `RUST_LOG` wins over the configured level. Keep the returned guard alive
/// for the life of the process or buffered file output is lost.
fn init_logging(cfg: &config::Config) -> anyhow::Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.scribe.log_level));

    let log_dir = PathBuf::from(shellexpand(&cfg.scribe.data_dir)).join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, "scribe.log"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    Ok(guard)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;
    let _log_guard = init_logging(&cfg)?;

    match cli.command {
        Commands::Start => {
            cfg.validate()?;

            let backends = provider_builder::build_backends(&cfg)?;
            if backends.completion.is_live() && !backends.completion.is_available().await {
                warn!(
                    "completion backend '{}' is not reachable; chat replies will apologize until it is",
                    backends.completion.name()
                );
            }

            let memory = Store::new(&cfg.memory).await?;
            let platform: Arc<dyn Platform> = Arc::new(DiscordChannel::new(&cfg.discord));

            info!("{} starting", cfg.scribe.name);
            let gw = Arc::new(gateway::Gateway::new(platform, backends, memory, &cfg));
            gw.run().await?;
        }
        Commands::Status => {
            println!("{} status\n", cfg.scribe.name);
            println!("Config: {}", cli.config);
            println!(
                "Discord token: {}",
                if cfg.discord.token.trim().is_empty() {
                    "missing"
                } else {
                    "configured"
                }
            );
            match cfg.discord.owner() {
                Some(owner) => println!("Owner bypass: {owner}"),
                None => println!("Owner bypass: disabled"),
            }
            println!();

            let backends = provider_builder::build_backends(&cfg)?;
            let completion = &backends.completion;
            if completion.is_live() {
                println!(
                    "  completion: {} ({})",
                    completion.name(),
                    if completion.is_available().await {
                        "available"
                    } else {
                        "unreachable"
                    }
                );
            } else {
                println!("  completion: {} (local)", completion.name());
            }
            println!(
                "  moderation: {}",
                backends.safety.backend_name().unwrap_or("denylist only")
            );
            println!(
                "  grammar: {}",
                backends.repairer.engine_name().unwrap_or("local fallback")
            );
            println!();

            let memory = Store::new(&cfg.memory).await?;
            println!("History: {}", cfg.memory.db_path);
            println!("  entries: {}", memory.count_entries(None).await?);
            memory.close().await;
        }
        Commands::Repair { article, text } => {
            if text.is_empty() {
                anyhow::bail!("no text provided. Usage: scribe repair <text>");
            }

            let mode = if article {
                RepairMode::Article
            } else {
                RepairMode::Terse
            };
            let backends = provider_builder::build_backends(&cfg)?;
            let repair = backends.repairer.repair(&text.join(" "), mode).await;
            println!("{}", repair.text);
        }
    }

    Ok(())
}
