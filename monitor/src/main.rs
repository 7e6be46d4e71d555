#![warn(clippy::all, rust_2018_idioms)]

use anyhow::Context;
use monitor::{config::Config, runner::Runner};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Log to stdout, `RUST_LOG=debug` for more detail.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // load configuration file
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)?,
        None => Config::default(),
    };

    let mut runner = Runner::new(&config).context("could not start nodes")?;
    runner.run();

    Ok(())
}
