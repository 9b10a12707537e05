use faceguard::{
    camera::SnapshotCamera,
    common::DevMode,
    service::{EnvEndpoint, ServiceClient},
    CaptureLoop, CapturePhase, CaptureSettings, CaptureState, Config, FrameSource,
};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "faceguard")]
#[command(about = "Face enrollment and verification client")]
struct Cli {
    /// Enable development mode (local sockets and data directory)
    #[arg(long, global = true)]
    dev: bool,

    /// Explicit config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample the camera and print live capture guidance
    Watch {
        #[arg(short, long, default_value = "10")]
        seconds: u64,
    },
    /// Enroll a new identity once the capture quality gate passes
    Enroll {
        #[arg(short, long)]
        name: String,
        /// Give up waiting for a good capture after this many seconds
        #[arg(short, long, default_value = "30")]
        timeout: u64,
    },
    /// Verify the face currently in front of the camera
    Verify,
    /// Print the enrolled gallery as JSON
    Gallery,
    /// Show an identity's profile and login counts
    Profile {
        #[arg(short, long)]
        id: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.dev);

    let dev_mode = DevMode::new(cli.dev)?;
    let config = dev_mode
        .load_config(cli.config.as_deref())
        .context("Failed to load configuration")?;

    let client = Arc::new(ServiceClient::new(
        EnvEndpoint {
            var: "FACEGUARD_SOCKET",
            fallback: config.service.socket_path.clone(),
        },
        config.analysis_timeout(),
        config.request_timeout(),
    ));
    let camera = Arc::new(SnapshotCamera::new(config.capture.snapshot_path.clone()));

    match cli.command {
        Commands::Watch { seconds } => {
            let mut capture = capture_loop(&config, &camera, &client);
            capture.start()?;
            follow(&capture, Duration::from_secs(seconds), |_| false);
            capture.stop();
        }
        Commands::Enroll { name, timeout } => {
            println!("Enrolling: {}", name);
            let mut capture = capture_loop(&config, &camera, &client);
            capture.start()?;

            let state = follow(&capture, Duration::from_secs(timeout), |s| s.ready_to_enroll);
            if !state.ready_to_enroll {
                println!("Capture never became ready; submitting anyway to report why");
            }

            let response = capture.capture_for(|frame, state| client.enroll(&name, &frame, &state))?;
            capture.stop();

            if response.success {
                println!("✅ {}", response.message);
                if let Some(id) = response.identity_id {
                    println!("   identity id: {}", id);
                }
            } else {
                println!("❌ {}", response.message);
            }
        }
        Commands::Verify => {
            let frame = camera.capture_still()?;
            let response = client.verify(&frame)?;
            if response.success {
                println!("✅ {}", response.message);
            } else {
                println!("❌ {}", response.message);
            }
        }
        Commands::Gallery => {
            let records = client.list_encodings()?;
            let entries: Vec<_> = records
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "identityId": r.identity_id,
                        "name": r.name,
                        "encodingLength": r.encoding.len(),
                        "profilePictureBytes": r.profile_picture.len(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Commands::Profile { id } => {
            let profile = client.profile(id)?;
            let summary = serde_json::json!({
                "id": profile.identity.id,
                "name": profile.identity.name,
                "createdAt": profile.identity.created_at,
                "lastLoginAt": profile.identity.last_login_at,
                "hasProfilePicture": profile.profile_picture.is_some(),
                "totalLogins": profile.total_logins,
                "successfulLogins": profile.successful_logins,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

fn capture_loop(
    config: &Config,
    camera: &Arc<SnapshotCamera>,
    client: &Arc<ServiceClient>,
) -> CaptureLoop {
    CaptureLoop::new(camera.clone(), client.clone(), CaptureSettings::from(config))
}

/// Print each new guidance line until `done` holds, the loop leaves
/// sampling, or `limit` elapses. Returns the last state seen.
fn follow(capture: &CaptureLoop, limit: Duration, done: impl Fn(&CaptureState) -> bool) -> CaptureState {
    let started = Instant::now();
    let mut last_message = String::new();

    loop {
        let state = capture.state();
        if state.message != last_message {
            println!("{}", state.message);
            last_message = state.message.clone();
        }

        if done(&state) || capture.phase() != CapturePhase::Sampling || started.elapsed() >= limit {
            return state;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}

fn setup_logging(dev_mode: bool) {
    if dev_mode {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }
}
