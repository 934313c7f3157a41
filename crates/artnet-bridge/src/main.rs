mod config;
mod http;
mod translator;
mod transport;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use tracing::{error, info};

use crate::config::{BridgeConfig, ConfigError, Overrides};
use crate::translator::Translator;
use crate::transport::UdpTransport;

const AFTER_HELP: &str = "\
Examples:
  Start the HTTP server on the default port, sending ArtNet packets to localhost
    $ artnet-bridge -a 127.0.0.1

  Listen on port 9000, sending to a remote node, with verbose output
    $ artnet-bridge -v -a 10.0.1.17 -p 9000

HTTP interface:
  POST a JSON array of numbers between 0 and 255 to / to write those values to
  universe 0, starting with channel 1:
    $ curl -X POST 127.0.0.1:8000 -H \"Content-Type: application/json\" -d \"[255, 255, 255]\"

  A universe and starting channel can be given in the route. Set the first
  three channels of universe 2 to 255:
    $ curl -X POST 127.0.0.1:8000/2 -d \"[255, 255, 255]\"

  Set channels 12, 13 and 14 of universe 4 to 0:
    $ curl -X POST 127.0.0.1:8000/4/12 -d \"[0, 0, 0]\"";

#[derive(Parser, Debug)]
#[command(
    name = "artnet-bridge",
    version,
    about = "Bridges HTTP POST requests to ArtNet UDP",
    after_help = AFTER_HELP
)]
struct Args {
    /// IP address or host name of the ArtNet node
    #[arg(short = 'a', long, env = "ARTNET_HOST")]
    artnet_host: Option<String>,

    /// ArtNet UDP port [default: 6454]
    #[arg(long)]
    artnet_port: Option<u16>,

    /// HTTP port to listen on [default: 8000]
    #[arg(short = 'p', long)]
    listen_port: Option<u16>,

    /// HTTP bind address [default: 0.0.0.0]
    #[arg(long)]
    bind: Option<String>,

    /// Log transmitted packets and return send errors to HTTP clients
    #[arg(short, long)]
    verbose: bool,

    /// Path to an optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            artnet_host: self.artnet_host.clone(),
            artnet_port: self.artnet_port,
            bind: self.bind.clone(),
            listen_port: self.listen_port,
            verbose: self.verbose,
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let config = BridgeConfig::load(path)?;
            info!(path = %path.display(), "Loaded configuration from disk");
            config
        }
        None => BridgeConfig::default(),
    };
    config.apply(args.overrides());

    let settings = match config.settings() {
        Ok(settings) => settings,
        Err(ConfigError::MissingHost) => {
            Args::command().print_help()?;
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    let transport = Arc::new(UdpTransport::connect(&settings.artnet_host, settings.artnet_port).await?);
    info!(
        host = %settings.artnet_host,
        destination = %transport.destination(),
        verbose = settings.verbose,
        "ArtNet bridge starting"
    );

    let translator = Arc::new(Translator::new(Arc::clone(&transport), settings.verbose));
    let app = http::build_router(translator);

    let listener = tokio::net::TcpListener::bind(&settings.listen).await?;
    info!(addr = %settings.listen, "Listening for HTTP requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(last_sequence = ?transport.last_sequence().await, "ArtNet bridge stopped");
    Ok(())
}
