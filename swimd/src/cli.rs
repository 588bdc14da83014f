//! Module describing all possible commands and sub-commands to the `swimd` daemon.

use clap::{crate_authors, crate_description, crate_name, crate_version, Parser};

/// CLI options.
#[derive(Parser)]
#[command(disable_version_flag = true)]
#[clap(name = crate_name!(), about = crate_description!())]
#[clap(version = crate_version!(), author = crate_authors!())]
pub struct Opts {
    /// Optional explicit `.env` file, instead of the default upward search.
    #[clap(short = 'c', long)]
    pub env_file: Option<String>,
    /// Verbose mode, repeat for more (`-v` debug, `-vv` trace).
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Sub-commands (see below).
    #[clap(subcommand)]
    pub subcmd: SubCommand,
}

/// All sub-commands:
///
/// - `serve`
/// - `config`
/// - `version`
#[derive(Debug, Parser)]
pub enum SubCommand {
    /// Run the ingestion pipeline and the HTTP/WebSocket client surface.
    Serve(ServeOpts),
    /// Display the resolved configuration and exit.
    Config,
    /// Print version information.
    Version,
}

/// Options for `serve`.
#[derive(Debug, Parser)]
pub struct ServeOpts {
    /// API listening IP, overrides `SWIM_LISTEN`.
    #[clap(short = 'L', long)]
    pub listen: Option<std::net::IpAddr>,
    /// API port, overrides `SWIM_PORT`.
    #[clap(short = 'P', long)]
    pub port: Option<u16>,
    /// Maximum broker reconnect attempts; `0` means infinite.
    #[clap(long, default_value_t = 0)]
    pub max_broker_attempts: u32,
}
