//! Box-office revenue prediction - main entry point

use clap::Parser;
use boxoffice::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boxoffice=info".into()),
        )
        .init();

    let cli = Cli::parse();
    run(cli)
}
