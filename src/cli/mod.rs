//! Command-line interface for the server binary

use crate::config::ServerConfig;
use crate::models::ModelSpec;
use crate::server;
use anyhow::{Context, Result};
use clap::Parser;
use std::net::{IpAddr, Ipv4Addr};
use tracing_subscriber::EnvFilter;

/// Background removal HTTP service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgremove-server")]
pub struct Cli {
    /// Address to bind the listener to
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8000)]
    pub port: u16,

    /// Model URL or path to an `.onnx` file [default: bundled u2netp]
    #[arg(short, long)]
    pub model: Option<String>,

    /// Number of intra-op inference threads (0 = runtime default)
    #[arg(short, long, default_value_t = 0)]
    pub threads: usize,

    /// JPEG quality for composited output (1-100)
    #[arg(long, default_value_t = 95)]
    pub jpeg_quality: u8,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Convert CLI arguments into a validated server configuration
    pub fn to_config(&self) -> Result<ServerConfig> {
        let model = match &self.model {
            Some(arg) => ModelSpec::parse(arg).context("Invalid --model argument")?,
            None => ModelSpec::default_model(),
        };
        ServerConfig::builder()
            .host(self.host)
            .port(self.port)
            .intra_threads(self.threads)
            .jpeg_quality(self.jpeg_quality)
            .model(model)
            .build()
            .context("Invalid server configuration")
    }
}

/// Initialize tracing output. `RUST_LOG` overrides the verbosity flags.
pub fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bgremove_server={default_level},info")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Run the server until stopped
pub async fn run(cli: Cli) -> Result<()> {
    let config = cli.to_config()?;
    server::run(config).await.context("Server failed")
}
