use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;
use log::info;

use rusty_scope::config::load_config_or_default;
use rusty_scope::service::handle_line;
use rusty_scope::visa::SocketBus;
use rusty_scope::ScopeClient;

/// Oscilloscope control service speaking line-delimited JSON on stdio
#[derive(Parser, Debug)]
#[command(name = "scope-serve")]
#[command(about = "VISA oscilloscope control over stdio", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config_or_default(args.config.as_deref());

    let level = args
        .log_level
        .unwrap_or_else(|| config.logging.log_level.clone());
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    info!("Starting oscilloscope control service on stdio");

    let bus = SocketBus::new(
        config.bus.resources.clone(),
        config.bus.connect_timeout(),
    );
    let mut client = ScopeClient::builder(Box::new(bus))
        .probe_timeout(config.session.probe_timeout())
        .session_timeout(config.session.session_timeout())
        .settle(config.session.auto_scale.strategy())
        .build();

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let reply = handle_line(&mut client, &line);
        serde_json::to_writer(&mut stdout, &reply)?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
    }

    info!("stdin closed, shutting down");
    if client.is_connected() {
        let _ = client.disconnect();
    }
    Ok(())
}
