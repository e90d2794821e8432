use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "updown-arb")]
#[command(about = "Dump-and-hedge bot for complementary UP/DOWN binary pairs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot live against Polymarket
    Run {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
        /// Stop after this many completed rounds
        #[arg(long)]
        rounds: Option<u32>,
        /// Reset the cycle every time this much time elapses (e.g. "15m")
        #[arg(long, value_parser = humantime::parse_duration)]
        round_duration: Option<std::time::Duration>,
    },
    /// Run a scripted dump-and-hedge scenario against a simulated venue
    Simulate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Run {
            config,
            rounds,
            round_duration,
        } => commands::run::execute(&config, rounds, round_duration).await,
        Commands::Simulate => commands::simulate::execute().await,
    }
}
