//! deskwatchd - desk intrusion-alert daemon
//!
//! This daemon:
//! 1. Loads configuration (secret code, alert endpoint, countdown window)
//! 2. Opens a detection source for the configured stream URL
//! 3. Filters detections by model confidence
//! 4. Feeds each frame to the coordinator, which arms on presence and
//!    disarms on the correct code sequence
//! 5. Lets the countdown worker POST the intrusion alert on expiry

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use deskwatch::detect::{filter_confident, source_for_url};
use deskwatch::{Coordinator, DeskwatchConfig, NtfyNotifier, UiState};

#[derive(Parser, Debug)]
#[command(author, version, about = "Camera-secured desk intrusion alerting")]
struct Args {
    /// Path to the TOML config file.
    #[arg(long, env = "DESKWATCH_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Stream URL override. Defaults to the RTSP URL built from the config,
    /// or a synthetic stub scene when no camera is configured.
    #[arg(long, env = "DESKWATCH_STREAM_URL")]
    stream_url: Option<String>,

    /// Target frames per second for the processing loop.
    #[arg(long, env = "DESKWATCH_TARGET_FPS", default_value_t = 10)]
    fps: u32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = DeskwatchConfig::load_from(&args.config)?;

    let stream_url = args.stream_url.unwrap_or_else(|| {
        if cfg.rtsp.camera_ip.is_empty() {
            "stub://desk".to_string()
        } else {
            cfg.rtsp.url()
        }
    });

    let notifier = Arc::new(NtfyNotifier::new(cfg.app.alert_endpoint.clone()));
    let mut coordinator = Coordinator::from_config(&cfg, notifier)?;
    let mut source = source_for_url(
        &stream_url,
        cfg.app.code.clone(),
        cfg.app.presence.clone(),
    )?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })
        .expect("error setting Ctrl-C handler");
    }

    let frame_interval = Duration::from_millis(1000 / u64::from(args.fps.max(1)));
    let mut last_health_log = Instant::now();
    let mut last_ui = UiState::default();

    log::info!(
        "deskwatchd running. source={} window={}s sequence_len={}",
        source.name(),
        cfg.app.window_ticks,
        cfg.app.code.len()
    );

    while running.load(Ordering::SeqCst) {
        let frame = source.next_frame()?;
        let frame = filter_confident(frame, cfg.app.min_confidence);
        let ui = coordinator.on_detections(&frame)?;

        // Sequence progress is logged by the coordinator; the alarm line is
        // the countdown readout, so only transitions are worth a log line.
        if ui.alarm_message != last_ui.alarm_message && !ui.alarm_message.is_empty() {
            log::info!("alarm: {}", ui.alarm_message);
        }
        last_ui = ui;

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            let stats = source.stats();
            log::info!(
                "source health={} frames={} url={} alarm={:?}",
                source.is_healthy(),
                stats.frames_emitted,
                stats.url,
                coordinator.alarm_state()?
            );
            last_health_log = Instant::now();
        }

        std::thread::sleep(frame_interval);
    }

    log::info!("shutdown signal received, stopping deskwatchd");
    Ok(())
}
