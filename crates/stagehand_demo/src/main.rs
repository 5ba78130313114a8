// SPDX-License-Identifier: MIT OR Apache-2.0
//! `stagehand` - timeline script player.
//!
//! Loads a RON timeline script (or the bundled intro), plays it against an
//! in-memory stage and logs every property write.
//!
//! ```text
//! stagehand [script.ron]
//! RUST_LOG=stagehand_timeline=trace stagehand
//! ```

mod script;

use script::{Script, ScriptError};
use stagehand_timeline::{PlayOutcome, StyleRecorder, Timeline, TimelineError, TimelineOptions};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Notify;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const INTRO_SCRIPT: &str = include_str!("../scripts/intro.ron");

/// Player errors
#[derive(Debug, Error)]
enum PlayerError {
    /// Script could not be loaded
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    /// Timeline could not be created
    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn main() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stagehand=debug,stagehand_timeline=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting stagehand v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run() {
        tracing::error!("Playback failed: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), PlayerError> {
    let script = match std::env::args_os().nth(1) {
        Some(path) => Script::load(Path::new(&path))?,
        None => Script::from_ron(INTRO_SCRIPT)?,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(play(script))
}

async fn play(script: Script) -> Result<(), PlayerError> {
    let stage = Arc::new(StyleRecorder::new());
    let completed = Arc::new(AtomicU32::new(0));
    let pass_done = Arc::new(Notify::new());

    let options = {
        let completed = Arc::clone(&completed);
        let pass_done = Arc::clone(&pass_done);
        TimelineOptions::from_config(&script.timeline)
            .on_start(|| tracing::info!("timeline started"))
            .on_repeat(|| tracing::info!("timeline repeating"))
            .on_complete(move || {
                let passes = completed.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::info!(passes, "pass complete");
                pass_done.notify_one();
            })
    };

    let timeline = Timeline::new(Arc::clone(&stage), options)?;
    script.build(&timeline);
    tracing::info!(
        script = %script.name,
        steps = timeline.len(),
        groups = timeline.pending_groups(),
        labels = ?timeline.labels(),
        "script loaded"
    );

    let outcome = timeline.play().await;
    if outcome == PlayOutcome::Completed && script.timeline.repeat {
        while completed.load(Ordering::SeqCst) < script.passes {
            pass_done.notified().await;
        }
        timeline.stop();
    }

    for mutation in stage.journal() {
        tracing::debug!(
            target_name = %mutation.target,
            kind = ?mutation.kind,
            properties = ?mutation.properties,
            "recorded write"
        );
    }
    for target in stage.targets() {
        let style: Vec<String> = stage
            .style(&target)
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect();
        tracing::info!("{target} {{ {} }}", style.join("; "));
    }
    Ok(())
}
