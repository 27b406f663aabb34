use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use ingest_server::config::ServerConfig;
use ingest_server::logger::init_logger;
use ingest_server::server::run_server;

/// Multi-client TCP frame ingestion server.
///
/// Accepts up to a fixed number of concurrent clients, collects the
/// fixed-size frames they send into a shared mailbox, and exits 0 once
/// the expected number of messages has been received and verified.
#[derive(Debug, Parser)]
#[command(name = "ingest-server", version, about)]
struct Cli {
    /// Path to a JSON config file; missing keys keep their defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the listening host
    #[arg(long)]
    host: Option<String>,

    /// Override the listening port
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Read the config file if one was given, then apply CLI overrides.
    let mut config = match &cli.config {
        Some(path) => match ServerConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => ServerConfig::default(),
    };
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    // Create the logger instance per the config
    let logger = init_logger("ingest_server", &config.logger);

    // Build a multi-threaded Tokio runtime based on the `worker_threads`
    // value. This runtime drives all our async I/O and timers.
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .thread_name("ingest-worker")
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            logger.error(&format!("Failed to build Tokio runtime: {}", e));
            return ExitCode::FAILURE;
        }
    };

    // Run the server to completion and turn its verdict into an exit code:
    // 0 on full success, 1 for a shortfall, a drain mismatch, or an error.
    match rt.block_on(run_server(config, logger.clone())) {
        Ok(outcome) if outcome.is_complete() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            logger.error(&format!("Ingest server error: {}", e));
            ExitCode::FAILURE
        }
    }
}
