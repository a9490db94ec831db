//! FAISS HTTP gateway (v1)
//!
//! Translates RESTful JSON requests into calls on the FAISS gRPC service.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────┐
//!                          │                  FAISS GATEWAY                   │
//!                          │                                                  │
//!     Client Request       │  ┌─────────┐   ┌────────────┐   ┌────────────┐   │
//!     ─────────────────────┼─▶│  http   │──▶│  routing   │──▶│   codec    │   │
//!                          │  │ server  │   │ route table│   │ JSON→typed │   │
//!                          │  └─────────┘   └────────────┘   └─────┬──────┘   │
//!                          │                                       │          │
//!                          │                                       ▼          │
//!     Client Response      │  ┌─────────┐   ┌────────────┐   ┌────────────┐   │
//!     ◀────────────────────┼──│response │◀──│ dispatcher │◀──│  backend   │◀──┼──── FAISS
//!                          │  │envelope │   │   state    │   │ gRPC pool  │   │     gRPC
//!                          │  └─────────┘   └────────────┘   └────────────┘   │     service
//!                          │                                                  │
//!                          │  config · observability · resilience · lifecycle │
//!                          └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use faiss_gateway::config::{resolve_config, Overrides};
use faiss_gateway::lifecycle::startup;
use faiss_gateway::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "faiss-gateway")]
#[command(about = "HTTP/JSON gateway for the FAISS gRPC service", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Endpoint of the FAISS gRPC service (host:port or URL)
    #[arg(long = "faiss-endpoint", alias = "faiss_endpoint")]
    faiss_endpoint: Option<String>,

    /// Port of the HTTP server
    #[arg(long = "http-port", alias = "http_port")]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let overrides = Overrides {
        faiss_endpoint: args.faiss_endpoint,
        http_port: args.http_port,
    };

    let config = resolve_config(args.config.as_deref(), &overrides)?;
    init_logging(&config.observability)?;

    tracing::info!("faiss-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    startup::run(config).await?;
    Ok(())
}
