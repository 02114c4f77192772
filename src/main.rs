//! kvdns-pipe: PowerDNS pipe/remote backend serving records from etcd.
//!
//! ## Usage
//!
//! ```text
//! kvdns-pipe [OPTIONS]
//!
//! Options:
//!     --log-level <LEVEL>  Log filter (trace, debug, info, warn, error) [default: info]
//! ```
//!
//! Requests are read from stdin and answered on stdout. Logs go to stderr.

use clap::Parser;
use kvdns::EtcdConnector;
use kvdns::PipeServer;
use tokio::io::BufReader;
use tracing::error;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "kvdns-pipe")]
#[command(about = "Name-server backend resolving DNS records from etcd", version)]
struct Args {
    /// Log filter directive, e.g. `info` or `kvdns_resolver=debug`.
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), pid = std::process::id(), "starting kvdns-pipe");

    let server = PipeServer::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
    if let Err(e) = server.run(&EtcdConnector).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
