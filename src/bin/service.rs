use faceguard::{
    common::DevMode,
    service::{AnalysisClient, EnvEndpoint, Gateway},
    storage::FileStore,
};
use anyhow::{Context as _, Result};
use clap::Parser;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::UnixListener;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "faceguard-service")]
#[command(about = "FaceGuard enrollment and verification service")]
struct Args {
    /// Run in development mode
    #[arg(long)]
    dev: bool,

    /// Explicit config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listening socket path
    #[arg(long)]
    socket: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting FaceGuard service (dev_mode: {})", args.dev);

    let dev_mode = DevMode::new(args.dev)?;
    let config = dev_mode
        .load_config(args.config.as_deref())
        .context("Failed to load configuration")?;
    let socket_path = args.socket.unwrap_or_else(|| config.service.socket_path.clone());

    let store = FileStore::open_configured(&config).context("Failed to open identity store")?;
    let analyzer = AnalysisClient::new(
        EnvEndpoint {
            var: "FACEGUARD_ANALYSIS_SOCKET",
            fallback: config.service.analysis_socket_path.clone(),
        },
        config.analysis_timeout(),
        config.request_timeout(),
    );
    let gateway = Arc::new(Gateway::new(Arc::new(analyzer), Arc::new(store)));

    // Clean up old socket if exists
    if socket_path.exists() {
        fs::remove_file(&socket_path)?;
    }
    if let Some(parent) = socket_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let listener = UnixListener::bind(&socket_path)
        .with_context(|| format!("Failed to bind Unix socket {}", socket_path.display()))?;

    // Allow all local users to connect
    fs::set_permissions(&socket_path, fs::Permissions::from_mode(0o666))?;

    tracing::info!("Listening on {}", socket_path.display());

    let request_timeout = config.request_timeout();
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let gateway = Arc::clone(&gateway);
                let spawned = std::thread::Builder::new()
                    .name("faceguard-request".to_string())
                    .spawn(move || {
                        if let Err(e) = gateway.serve_connection(stream, request_timeout) {
                            tracing::error!("Client error: {}", e);
                        }
                    });
                if let Err(e) = spawned {
                    tracing::error!("Failed to spawn request handler: {}", e);
                }
            }
            Err(e) => {
                tracing::error!("Connection error: {}", e);
            }
        }
    }

    Ok(())
}
