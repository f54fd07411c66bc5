// Classifies a single image file with the GPU engine.
//
//   cargo run --release -- digit.png --weights assets/mnist-weights
//
// The image is resized to the configured canvas size and read like a drawing
// surface: white strokes on black.
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ferrite_digit::{DirSource, EngineConfig, EngineError, Session, Surface};

#[derive(Parser, Debug)]
#[command(name = "ferrite-digit", about = "Classify a hand-drawn digit on the GPU")]
struct Args {
    /// Image to classify (PNG/JPEG/BMP/GIF).
    image: PathBuf,

    /// JSON engine configuration.
    #[arg(long)]
    config: Option<String>,

    /// Directory holding layer{N}.weight.npy / layer{N}.bias.npy.
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Accept a software (CPU) adapter.
    #[arg(long)]
    allow_software: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            match e {
                EngineError::UnsupportedDevice(_) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(args: Args) -> Result<(), EngineError> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load_json(path)
            .map_err(|e| EngineError::Config(format!("{}: {}", path, e)))?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = args.weights {
        config.weights_dir = dir;
    }
    config.allow_software_adapter |= args.allow_software;

    let surface = load_surface(&args.image, config.canvas_size)?;

    let session = Session::new(config.clone());
    pollster::block_on(session.init(&DirSource::new(config.weights_dir.clone())))?;
    if let Some(info) = session.device_info() {
        println!("Device: {} ({}, {})", info.name, info.backend, info.device_type);
    }

    let result = pollster::block_on(session.classify(&surface))?;

    println!("{:>6}  {:>10}", "Digit", "Confidence");
    println!("{}", "-".repeat(20));
    for p in &result.predictions {
        let marker = if p.is_top { " <" } else { "" };
        println!("{:>6}  {:>9.2}%{}", p.label, p.confidence * 100.0, marker);
    }
    println!("\n{}", session.stats().prediction_label);

    session.teardown();
    Ok(())
}

fn load_surface(path: &PathBuf, canvas_size: u32) -> Result<Surface, EngineError> {
    let img = image::open(path)
        .map_err(|e| EngineError::Config(format!("cannot read image '{}': {}", path.display(), e)))?;
    let rgba = img
        .resize_exact(canvas_size, canvas_size, image::imageops::FilterType::Triangle)
        .to_rgba8();
    Ok(Surface::new(canvas_size as usize, rgba.into_raw())?)
}
