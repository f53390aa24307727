use anyhow::{bail, Context};
use clap::Parser;
use dotenv::dotenv;
use entra_mcp_rs::entra::{self, config::Config, server};
use std::net::{IpAddr, SocketAddr};

/// MCP server for Microsoft Graph (Entra ID users and groups)
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Refuse to start when Graph credentials are incomplete
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    let config = Config::from_env().context("failed to load configuration")?;
    config.log_summary();

    if args.strict && !config.credentials.is_complete() {
        bail!(
            "missing credentials: {}",
            config.credentials.missing().join(", ")
        );
    }

    let state = entra::build_state(&config).context("failed to build Graph client")?;

    log::info!("Starting Microsoft Graph MCP Server...");
    let addr = SocketAddr::new(args.host, args.port);
    server::serve(addr, state)
        .await
        .with_context(|| format!("server on {} failed", addr))?;

    Ok(())
}
