//! `swimd`: the SWIM ingestion-and-fanout daemon launcher.
//!
//! Parses CLI options, loads configuration, and either prints it back (`config`), prints
//! version information (`version`), or spawns the full pipeline and serves the HTTP/WebSocket
//! client surface until a shutdown signal arrives (`serve`).

mod cli;
mod http;

use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::Parser;
use cli::{Opts, SubCommand};
use swim_common::{init_logging, Config, ConfigError};
use swim_engine::BrokerError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

fn main() -> ExitCode {
    let opts = Opts::parse();
    init_logging(opts.verbose);

    match &opts.subcmd {
        SubCommand::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        SubCommand::Config => match Config::load(opts.env_file.as_deref().map(std::path::Path::new)) {
            Ok(config) => {
                println!("{config:#?}");
                ExitCode::SUCCESS
            }
            Err(err) => exit_for_config_error(err),
        },
        SubCommand::Serve(serve_opts) => {
            let config = match Config::load(opts.env_file.as_deref().map(std::path::Path::new)) {
                Ok(config) => config,
                Err(err) => return exit_for_config_error(err),
            };

            let rt = tokio::runtime::Runtime::new().expect("failed to build tokio runtime");
            match rt.block_on(serve(config, serve_opts.listen, serve_opts.port, serve_opts.max_broker_attempts)) {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    error!(error = %err, "unrecoverable broker failure");
                    ExitCode::from(2)
                }
            }
        }
    }
}

fn exit_for_config_error(err: ConfigError) -> ExitCode {
    error!(error = %err, "configuration error");
    ExitCode::from(1)
}

async fn serve(
    config: Config,
    listen_override: Option<std::net::IpAddr>,
    port_override: Option<u16>,
    max_broker_attempts: u32,
) -> eyre::Result<()> {
    let listen = listen_override.unwrap_or(config.listen);
    let port = port_override.unwrap_or(config.port);

    let (pipeline, mut broker_fatal) = swim_engine::spawn(&config, max_broker_attempts).await?;
    let pipeline = Arc::new(pipeline);
    let state = http::AppState::new(pipeline);
    let addr = http::socket_addr(listen, port);

    info!(%addr, "swimd listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Only a broker exhausting its reconnect attempts is fatal to the process (spec §6/§7).
    // The watcher below cancels the server's graceful shutdown and stashes the error for
    // `serve` to return once the server has actually stopped accepting connections.
    let shutdown = CancellationToken::new();
    let broker_failure: Arc<Mutex<Option<BrokerError>>> = Arc::new(Mutex::new(None));
    tokio::spawn({
        let shutdown = shutdown.clone();
        let broker_failure = broker_failure.clone();
        async move {
            if let Some(err) = broker_fatal.recv().await {
                *broker_failure.lock().expect("broker failure mutex poisoned") = Some(err);
                shutdown.cancel();
            }
        }
    });

    let server_shutdown = shutdown.clone();
    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
        .await?;

    let failure = broker_failure.lock().expect("broker failure mutex poisoned").take();
    match failure {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
