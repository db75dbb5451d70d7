use clap::{Parser, Subcommand};
use tcpmeter::config::Settings;
use tcpmeter::network::{server, session, TransferRequest};
use tracing::error;

#[derive(Parser)]
#[command(name = "tcpmeter")]
#[command(about = "TCP throughput measurement tool")]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one measurement against a server
    Client {
        /// Server address as host:port
        address: String,
        /// Transfer direction, DL or UL
        direction: String,
        /// Payload length in bytes
        length: String,
    },
    /// Accept measurement sessions
    Server {
        /// Listen address, overrides the configured one
        listen: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("tcpmeter={}", log_level))
        .init();

    match cli.command {
        Command::Client {
            address,
            direction,
            length,
        } => run_client(&address, &direction, &length).await,
        Command::Server { listen } => {
            if let Err(e) = run_server(cli.config.as_deref(), listen).await {
                error!("server error: {}", e);
            }
        }
    }
}

/// Client errors of every class are reported on stdout and the process
/// still exits 0; the connection is torn down by drop on every path.
async fn run_client(address: &str, direction: &str, length: &str) {
    let request = match TransferRequest::parse(address, direction, length) {
        Ok(request) => request,
        Err(e) => {
            println!("{}", e);
            return;
        }
    };

    match session::run(request).await {
        Ok(report) => println!("throughput {} MiB/sec", report.throughput_mib_per_sec()),
        Err(e) => println!("{}", e),
    }
}

async fn run_server(config_path: Option<&str>, listen: Option<String>) -> tcpmeter::Result<()> {
    let settings = Settings::load(config_path)?;
    let bind_addr = listen.unwrap_or(settings.server.bind_address);
    server::run(&bind_addr).await
}
