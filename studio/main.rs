/// ferrite-digit Studio
///
/// Hosts one inference session behind a small JSON API so a drawing front end
/// (or curl) can classify digits.
/// Served by a synchronous tiny_http server.
///
/// Run with:
///   cargo run --bin studio --release -- --config studio.json
///
/// Endpoints:
///   GET  /status   engine state, device, latest stats
///   POST /predict  multipart image upload, or raw RGBA canvas bytes
///                    (application/octet-stream, canvas_size² × 4 bytes)
///   POST /reset    clear the latest prediction

mod handlers;
mod routes;
mod state;
mod util;

use std::sync::Arc;

use clap::Parser;
use tiny_http::Server;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ferrite_digit::{DirSource, EngineConfig, Session};

use state::StudioState;

#[derive(Parser, Debug)]
#[command(name = "studio", about = "HTTP host for the GPU digit classifier")]
struct Args {
    /// JSON engine configuration; defaults are used when omitted.
    #[arg(long)]
    config: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => match EngineConfig::load_json(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                error!(path = %path, error = %e, "cannot read config");
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    let server = match Server::http(config.bind_addr.as_str()) {
        Ok(s) => s,
        Err(e) => {
            error!(addr = %config.bind_addr, error = %e, "failed to bind HTTP server");
            std::process::exit(1);
        }
    };

    let source = DirSource::new(config.weights_dir.clone());
    let shared_state = Arc::new(StudioState::new(Session::new(config.clone())));

    // Initialize in the background so /status can report Probing/Loading
    // while weights are still being fetched.
    {
        let state = shared_state.clone();
        std::thread::spawn(move || {
            if let Err(e) = pollster::block_on(state.session.init(&source)) {
                error!(error = %e, "engine did not start");
            }
        });
    }

    info!(addr = %config.bind_addr, "studio listening");

    // One thread per request; the session itself rejects overlapping
    // inferences.
    for request in server.incoming_requests() {
        let state_clone = shared_state.clone();
        std::thread::spawn(move || {
            routes::dispatch(request, state_clone);
        });
    }
}
