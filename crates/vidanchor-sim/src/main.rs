//! vidanchor - Scripted AR session runner
//!
//! Feeds a scenario file through the overlay pipeline with a headless
//! scene graph and video renderer, then prints what happened.

mod bootstrap;
mod config;
mod renderer;
mod runner;
mod scenario;

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "vidanchor")]
#[command(about = "Image-target video overlay pipeline, driven by a scripted AR session")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "vidanchor.toml")]
    config: PathBuf,

    /// Scenario file describing resume attempts and tracked frames
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write a default configuration file and exit
    #[arg(long)]
    init: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("vidanchor v{}", env!("CARGO_PKG_VERSION"));

    if args.init {
        config::save_default_config(&args.config)?;
        println!("Wrote default configuration to {}", args.config.display());
        return Ok(());
    }

    let config = config::load_config(&args.config)?;
    let config_dir = args
        .config
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    info!(
        target_name = %config.overlay.target,
        references = config.reference_images.len(),
        "Configuration loaded"
    );

    let Some(scenario_path) = &args.scenario else {
        anyhow::bail!("No scenario given; pass --scenario <file>");
    };
    let scenario = scenario::load_scenario(scenario_path)?;

    let summary = runner::run(&config, config_dir, &scenario).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "Session: {}",
        if summary.session_started { "started" } else { "not started" }
    );
    println!(
        "Image tracking: {}",
        if summary.image_tracking { "enabled" } else { "disabled" }
    );
    println!("Ticks: {}", summary.ticks);
    println!(
        "Anchors: {} created, {} live, {} node(s) in scene ({} with model)",
        summary.anchors_created,
        summary.live_records,
        summary.scene_nodes,
        summary.nodes_with_renderable
    );
    println!(
        "Overlay: {} activation(s), {} ({}), {} frame(s) drawn",
        summary.activations,
        if summary.overlay_visible { "visible" } else { "hidden" },
        serde_json::to_value(summary.playback_state)?
            .as_str()
            .unwrap_or("unknown"),
        summary.frames_drawn
    );
    if !summary.diagnostics.is_empty() {
        println!("Diagnostics:");
        for d in &summary.diagnostics {
            println!("  - [{}] {:?}: {}", d.at.format("%H:%M:%S%.3f"), d.kind, d.message);
        }
    }

    Ok(())
}
