use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "loyalmint", version, about = "LoyalMint loyalty-points CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the tier table
    Tiers {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the reward catalog
    Rewards {
        /// Mark which rewards this balance can afford
        #[arg(long)]
        balance: Option<u64>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Interactive session against a local simulated ledger
    Session(commands::session::SessionArgs),
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("loyalmint=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Tiers { json } => commands::tiers::run(json),
        Commands::Rewards { balance, json } => commands::rewards::run(balance, json),
        Commands::Config { action } => commands::config::run(action),
        Commands::Session(args) => commands::session::run(args).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
