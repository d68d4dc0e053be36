use std::io;
use std::process::ExitCode;

use clap::Parser;
use dotenvy::dotenv;
use paypal_nvp::Engine;
use paypal_nvp::config::Config;
use paypal_nvp::csv::{read_operations, write_reports};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let config = Config::parse();

    if config.input.extension().is_none_or(|ext| ext != "csv") {
        warn!(path = %config.input.display(), "input file seems to not be a csv file");
    }

    let operations = match read_operations(config.input.clone()) {
        Ok(operations) => operations,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let plugin = match config.plugin() {
        Ok(plugin) => plugin,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut engine = Engine::new(vec![Box::new(plugin)]);
    let (op_sender, op_receiver) = tokio::sync::mpsc::channel(16);

    tokio::task::spawn_blocking(move || {
        for result in operations {
            match result {
                Ok(op) => {
                    if op_sender.blocking_send(op).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("{e}");
                }
            }
        }
    });

    let reports = engine.run(ReceiverStream::new(op_receiver)).await;

    if let Err(e) = write_reports(&reports, io::stdout().lock()) {
        error!("failed to write reports: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
