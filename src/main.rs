use clap::Parser;

use connectors::cli::{self, Cli};
use connectors::config::Settings;
use connectors::logging::init_logging;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    init_logging(&settings.logging())?;
    cli::run(cli.command)
}
