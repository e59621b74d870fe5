mod config;
mod player;
mod sink;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	// stdout carries media; all diagnostics go to stderr.
	tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
		.init();

	let args = config::Args::parse();
	let config = args.load()?;

	player::run(config).await
}
