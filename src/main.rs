use clap::Parser;
use findash::cli::{Cli, run};
use tracing_subscriber::EnvFilter;

fn main() -> std::process::ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("findash=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();
    run(Cli::parse())
}
