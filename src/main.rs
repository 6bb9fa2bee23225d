//! webhub demo host.
//!
//! Serves a static directory, the built-in `/api` endpoints and one
//! WebSocket channel:
//!
//! ```text
//!   /ws1   greets on connect, echoes every frame, then broadcasts
//!          it as text to every client on /ws1
//! ```

use clap::Parser;
use std::path::PathBuf;

use webhub::config::{load_config, ServerConfig};
use webhub::observability::{logging::init_tracing, metrics::init_metrics};
use webhub::{HandlerError, Message, ServerHandle, WebServer, WsSession};

#[derive(Parser, Debug)]
#[command(name = "webhub")]
#[command(about = "Static files, REST endpoints and WebSocket channels on one port", long_about = None)]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory served as static content (overrides the config file).
    #[arg(short, long)]
    static_root: Option<PathBuf>,

    /// Plaintext HTTP port (overrides the config file).
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable permissive CORS headers.
    #[arg(long)]
    cors: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("webhub=debug,tower_http=debug");

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    tracing::info!(
        bind_host = %config.listener.bind_host,
        http_port = config.listener.http_port,
        tls = config.listener.tls_material().is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut builder = WebServer::builder(config)
        .log_sink(|line| println!("{line}"))
        .ws_route("/ws1", ws1);
    if let Some(root) = args.static_root {
        builder = builder.static_root(root);
    }
    if let Some(port) = args.port {
        builder = builder.http_port(port);
    }
    if args.cors {
        builder = builder.cors(true);
    }

    let server = builder.build()?;
    server.start().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    server.stop();
    server.wait_stopped().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn ws1(mut session: WsSession, server: ServerHandle) -> Result<(), HandlerError> {
    session.send_text("Welcome to ws1")?;

    while let Some(frame) = session.recv().await {
        let frame = frame?;
        let received = match &frame {
            Message::Text(text) => text.as_str().to_string(),
            Message::Binary(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => continue,
        };
        session.send(frame)?;

        let report = server.broadcast_text(session.path(), format!("Broadcast: {received}"));
        tracing::debug!(delivered = report.delivered, "Broadcast sent");
    }
    Ok(())
}
