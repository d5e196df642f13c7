// SPDX-License-Identifier: MIT OR Apache-2.0
//! Trailmotion replay
//!
//! Plays a route file headlessly on a simulated clock and logs every motion
//! event. Detection halts are resumed automatically so the whole route runs.

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;
use trailmotion_sequencer::{
    Clock, ConfigError, EventSource, MotionContext, MotionEvent, MotionEventKind, Sequence, SequenceConfig,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "trailmotion-replay")]
#[command(about = "Replay a polyline motion route on a simulated clock")]
#[command(version)]
struct Args {
    /// Route file (.ron or .json)
    route: PathBuf,

    /// Simulated frames per second
    #[arg(long, default_value = "60")]
    fps: u32,

    /// Override every segment's speed (km/h)
    #[arg(long)]
    speed: Option<f64>,

    /// Pan the camera with the marker
    #[arg(long)]
    follow: bool,

    /// Give up after this much simulated time (seconds)
    #[arg(long, default_value = "3600")]
    max_seconds: f64,
}

#[derive(Debug, Error)]
enum ReplayError {
    /// Route could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Route did not finish in time
    #[error("Route still playing after {0} simulated seconds")]
    Timeout(f64),
}

fn describe(event: &MotionEvent) -> String {
    let source = match event.source {
        EventSource::Segment(id) => format!("segment {}", id.0),
        EventSource::Sequence(id) => format!("sequence {}", id.0),
    };
    match &event.kind {
        MotionEventKind::NearPoint(target) => format!(
            "{} {} ({}, {:.5}, {:.5})",
            source,
            event.kind.name(),
            target.label.as_deref().unwrap_or("unnamed"),
            target.coordinate.lat,
            target.coordinate.lng
        ),
        kind => format!("{} {}", source, kind.name()),
    }
}

fn replay(args: &Args) -> Result<(), ReplayError> {
    let mut config = SequenceConfig::load(&args.route)?;
    if let Some(speed) = args.speed {
        config.override_speed(speed);
    }
    if args.follow {
        config.follow_marker();
    }

    let (ctx, clock, surface) = MotionContext::manual();
    let mut sequence: Sequence = config.build(ctx)?;
    tracing::info!(
        "Replaying '{}': {} segments, {:.0} m",
        sequence.name,
        sequence.len(),
        sequence.total_length()
    );

    let frame_ms = 1000.0 / f64::from(args.fps.max(1));
    let limit_ms = args.max_seconds * 1000.0;

    sequence.start();
    loop {
        for event in sequence.take_events() {
            tracing::info!("[{:>9.0} ms] {}", clock.now_ms(), describe(&event));
        }
        if sequence.state().is_idle() {
            break;
        }
        if sequence.state().is_paused() {
            tracing::debug!("Resuming after detection halt");
            sequence.resume();
            continue;
        }
        if clock.now_ms() >= limit_ms {
            return Err(ReplayError::Timeout(args.max_seconds));
        }
        clock.advance(frame_ms);
        sequence.tick();
    }

    tracing::info!(
        "Finished in {:.1} s simulated, {} camera pans",
        clock.now_ms() / 1000.0,
        surface.pan_count()
    );
    Ok(())
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    tracing::info!("Starting trailmotion-replay v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = replay(&args) {
        tracing::error!("Replay failed: {e}");
        std::process::exit(1);
    }
}
