use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod host;

#[derive(Parser)]
#[command(name = "viewbudget", version, about = "Daily viewing-time budget for video sites")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a live page session, reading show/hide/limit commands from stdin
    Watch {
        /// Page URL
        url: String,
        /// Start with the page hidden
        #[arg(long)]
        hidden: bool,
    },
    /// Print today's usage for a site as JSON
    Status {
        /// Page URL
        url: String,
        /// Include every stored day
        #[arg(long)]
        history: bool,
    },
    /// Daily limit management
    Limit {
        #[command(subcommand)]
        action: commands::limit::LimitAction,
    },
    /// Apply the daily reset if the boundary has passed
    Reset {
        /// Page URL
        url: String,
    },
    /// Check whether a URL is covered by the site allow-list
    Match {
        /// Page URL
        url: String,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Watch { url, hidden } => commands::watch::run(&url, hidden),
        Commands::Status { url, history } => commands::status::run(&url, history),
        Commands::Limit { action } => commands::limit::run(action),
        Commands::Reset { url } => commands::reset::run(&url),
        Commands::Match { url } => commands::site::run(&url),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
