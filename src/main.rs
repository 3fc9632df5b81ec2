use clap::Parser;
use tracing::debug;

use gator::cli::Cli;
use gator::commands::{self, State};
use gator::{config, Config, Database};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> gator::Result<()> {
    let config_path = config::resolve_path(cli.config)?;
    let config = Config::load_or_default(&config_path)?;
    config.validate()?;

    // Initialize logging
    if let Err(e) = gator::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        gator::logging::init_console_only(&config.logging.level);
    }
    debug!("Using config file {}", config_path.display());

    let db = Database::open(&config.database.url).await?;
    let mut state = State::new(db, config, config_path);

    let mut stdout = std::io::stdout();
    commands::execute(cli.command, &mut state, &mut stdout).await
}
