//! Shared CLI parsing and setup code for all sequencer binaries.

use anyhow::Result;
use clap::Parser;

/// Common CLI arguments for all binaries.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CommonArgs {
    /// Address the order-admission HTTP server binds to.
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub admission_addr: String,

    /// Address the Prometheus metrics server binds to.
    #[arg(long, default_value = "0.0.0.0:9090")]
    pub metrics_addr: String,

    /// Run against a scripted mock chain client instead of a real RPC
    /// endpoint. Intended for local development only.
    #[arg(long)]
    pub mock_chain: bool,

    /// Log level, overridden by `RUST_LOG` if set.
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON instead of human-readable text.
    #[arg(long)]
    pub json_logs: bool,
}

/// Initialize tracing for this process.
pub fn init_logging(level: &str, json_logs: bool) -> Result<()> {
    sequencer_core::utils::logger::init_logger(level, json_logs);
    Ok(())
}
