
//! Solidafy concurrent source CLI
//!
//! Reads file-based streams concurrently and prints one JSON message per line

use clap::Parser;
use solidafy_concurrent::cli::{Cli, Runner};

fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    // Logs go to stderr so stdout stays machine-readable
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    let runner = Runner::new(cli);
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(runner.worker_threads())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(runner.run()) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
