//! Lane Motion Counter CLI
//!
//! Counts vehicles in configured lanes of a raw grayscale video stream,
//! a live camera, or a synthetic demo scene.

use clap::Parser;
use lane_motion_counter::{
    capture::{
        ConfigError, FileConfig, FrameSource, RawVideoSource, ScaledSource, SourceError,
        SyntheticSource,
    },
    engine::{
        CancellationFlag, EngineConfig, EngineError, LoggingObserver, MotionCountingEngine,
        RunSummary,
    },
    metrics::{MetricsError, MetricsObserver, MetricsRegistry},
};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info, warn};

/// Frames generated when no input is given.
const DEMO_FRAMES: u64 = 300;

#[derive(Parser, Debug)]
#[command(name = "lane-motion-counter", version, about = "Count vehicles per lane from frame-to-frame motion")]
struct Args {
    /// TOML configuration file (defaults are used if omitted)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Raw 8-bit grayscale frames at the configured size; "-" reads stdin
    #[arg(short, long, value_name = "PATH", conflicts_with = "synthetic")]
    input: Option<PathBuf>,

    /// Generate this many synthetic frames instead of reading input
    #[arg(long, value_name = "FRAMES")]
    synthetic: Option<u64>,

    /// Read from the configured camera device
    #[cfg(feature = "camera")]
    #[arg(long, conflicts_with_all = ["input", "synthetic"])]
    camera: bool,

    /// Write the final counts to this file as TOML
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,

    /// Serve Prometheus metrics on this port (overrides the config file)
    #[arg(long, value_name = "PORT")]
    metrics_port: Option<u16>,

    /// Log every lane result, not only counted vehicles
    #[arg(long)]
    verbose_frames: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[cfg(feature = "metrics")]
    #[error(transparent)]
    MetricsServer(#[from] lane_motion_counter::metrics::ServerError),
    #[error("failed to install interrupt handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("failed to serialize summary: {0}")]
    Summary(#[from] toml::ser::Error),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    info!("Lane Motion Counter v{}", lane_motion_counter::VERSION);

    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let file = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            FileConfig::from_file(path)?
        }
        None => FileConfig::default(),
    };

    let config = EngineConfig::try_from(&file)?;
    let mut engine = MotionCountingEngine::from_config(&config)?;
    let lane_names = engine.lane_names();

    let verbose = args.verbose_frames || file.output.log_every_frame;
    engine.add_observer(Box::new(
        LoggingObserver::new(lane_names.clone()).verbose(verbose),
    ));

    let metrics_port = args.metrics_port.unwrap_or(file.output.metrics_port);
    if metrics_port != 0 {
        let registry = MetricsRegistry::new()?;
        engine.add_observer(Box::new(MetricsObserver::new(
            registry.clone(),
            lane_names,
        )));
        serve_metrics(registry, metrics_port)?;
    }

    let mut source = open_source(&args, &file, &config)?;

    let cancel = CancellationFlag::new();
    cancel.install_ctrlc_handler()?;

    info!("Processing frames...");
    let summary = engine.run(&mut source, &cancel)?;

    report(&summary);
    if let Some(path) = &args.summary {
        std::fs::write(path, toml::to_string(&summary)?)?;
        info!(path = %path.display(), "Summary written");
    }

    Ok(())
}

fn open_source(
    args: &Args,
    file: &FileConfig,
    config: &EngineConfig,
) -> Result<Box<dyn FrameSource>, CliError> {
    #[cfg(feature = "camera")]
    if args.camera {
        let mut camera = lane_motion_counter::capture::CameraSource::new();
        camera.open(&file.capture)?;
        return Ok(scaled(Box::new(camera), file));
    }

    if let Some(path) = &args.input {
        let reader: Box<dyn Read> = if path.as_os_str() == "-" {
            info!("Reading raw frames from stdin");
            Box::new(io::stdin().lock())
        } else {
            info!(path = %path.display(), "Reading raw frames");
            Box::new(BufReader::new(File::open(path)?))
        };
        let raw = RawVideoSource::new(reader, file.capture.width, file.capture.height);
        return Ok(scaled(Box::new(raw), file));
    }

    // Synthetic frames are generated directly at the engine's frame size
    let frames = args.synthetic.unwrap_or_else(|| {
        info!("No input given; this is a demonstration using synthetic traffic");
        DEMO_FRAMES
    });
    let regions: Vec<_> = config.lanes.iter().map(|lane| lane.region()).collect();
    Ok(Box::new(SyntheticSource::for_regions(
        config.frame_width,
        config.frame_height,
        &regions,
        frames,
    )))
}

fn scaled(source: Box<dyn FrameSource>, file: &FileConfig) -> Box<dyn FrameSource> {
    match file.capture.target() {
        Some((width, height)) => Box::new(ScaledSource::new(source, width, height)),
        None => source,
    }
}

#[cfg(feature = "metrics")]
fn serve_metrics(registry: MetricsRegistry, port: u16) -> Result<(), CliError> {
    use lane_motion_counter::metrics::{MetricsServer, MetricsServerConfig};

    // Detached: the exporter lives until the process exits
    MetricsServer::new(MetricsServerConfig::with_port(port), registry).spawn()?;
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn serve_metrics(_registry: MetricsRegistry, port: u16) -> Result<(), CliError> {
    warn!(
        port,
        "Built without the `metrics` feature; metrics are collected but not served"
    );
    Ok(())
}

fn report(summary: &RunSummary) {
    info!(
        "Processed {} frames, {} vehicles total",
        summary.frames_processed,
        summary.total_count()
    );
    if summary.lanes.is_empty() {
        warn!("No lanes configured");
    }
    for lane in &summary.lanes {
        println!("{}: {}", lane.name, lane.count);
    }
}
