use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use audiovault_core::Settings;

#[derive(Parser, Debug)]
#[command(name = "audiovault")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Accepts synthesized audio and stores it in MinIO and PostgreSQL")]
struct Args {
    /// TOML settings file; environment variables override its values
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Address to listen on, overrides settings and BIND_ADDR
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    audiovault_server::setup_tracing();

    let args = Args::parse();
    info!(config = ?args.config, bind = ?args.bind, "Startup");

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        settings.server.bind = bind;
    }

    audiovault_server::run(settings).await
}
