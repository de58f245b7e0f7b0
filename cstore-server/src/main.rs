mod config;
use clap::Parser;
use crate::config::Config;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod server;
use server::run_server;

#[derive(Parser)]
#[command(name = "cstore")]
#[command(about = "Distributed content-addressable blob store")]
struct Cli {
    /// Address to listen on, HOST:PORT
    addr: String,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Override the registry url from config
    #[arg(long)]
    registry_url: Option<String>,

    /// Hostname peers use to reach this server; defaults to the listen address
    #[arg(long)]
    advertise_addr: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cstore_server=info,cstore_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut cfg = match Config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(url) = cli.registry_url {
        cfg.registry.url = url;
    }

    let advertise_addr = cli.advertise_addr.unwrap_or_else(|| cli.addr.clone());
    tracing::info!(
        "Registry: {} (namespace {}), advertising {}",
        cfg.registry.url,
        cfg.registry.namespace,
        advertise_addr
    );

    if let Err(e) = run_server(cfg, &cli.addr, &advertise_addr).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
