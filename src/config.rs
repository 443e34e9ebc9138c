//! Daemon configuration.
//!
//! Loaded from a TOML file (`config.toml` next to the binary unless
//! `DESKWATCH_CONFIG` points elsewhere), then overridden from the
//! environment, then validated. The secret code and the alert endpoint have
//! no defaults: a deskwatch deployment without them is a startup error, not
//! a silently disarmed camera.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::Symbol;

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const DEFAULT_PRESENCE: &str = "person";
const DEFAULT_WINDOW_SECS: u32 = 30;
const DEFAULT_TICK_MILLIS: u64 = 1000;
const DEFAULT_MIN_CONFIDENCE: f32 = 0.75;
const DEFAULT_RTSP_PORT: u16 = 554;
const DEFAULT_RTSP_PATH: &str = "h264Preview_01_main";

#[derive(Debug, Deserialize, Default)]
struct DeskwatchConfigFile {
    app: Option<AppConfigFile>,
    rtsp: Option<RtspConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct AppConfigFile {
    code: Option<Vec<Symbol>>,
    presence: Option<Symbol>,
    alert_endpoint: Option<String>,
    window_secs: Option<u32>,
    tick_millis: Option<u64>,
    min_confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct RtspConfigFile {
    user: Option<String>,
    password: Option<String>,
    camera_ip: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct DeskwatchConfig {
    pub app: AppSettings,
    pub rtsp: RtspSettings,
}

#[derive(Debug, Clone)]
pub struct AppSettings {
    /// Secret unlock sequence. Never empty after validation.
    pub code: Vec<Symbol>,
    /// Symbol that marks a human in frame and arms the countdown.
    pub presence: Symbol,
    /// ntfy-style endpoint the intrusion alert is POSTed to.
    pub alert_endpoint: String,
    /// Countdown length in ticks.
    pub window_ticks: u32,
    /// Countdown tick duration.
    pub tick: Duration,
    /// Detections below this score are dropped before the tracker.
    pub min_confidence: f32,
}

#[derive(Debug, Clone, Default)]
pub struct RtspSettings {
    pub user: String,
    pub password: String,
    pub camera_ip: String,
    pub port: u16,
}

impl RtspSettings {
    /// Stream URL for the ingest collaborator.
    pub fn url(&self) -> String {
        format!(
            "rtsp://{}:{}@{}:{}/{}",
            self.user, self.password, self.camera_ip, self.port, DEFAULT_RTSP_PATH
        )
    }
}

impl DeskwatchConfig {
    /// Load from `DESKWATCH_CONFIG` (or `config.toml`), apply environment
    /// overrides, validate.
    pub fn load() -> Result<Self> {
        let path =
            std::env::var("DESKWATCH_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let file_cfg = read_config_file(path)?;
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: DeskwatchConfigFile) -> Result<Self> {
        let app_file = file.app.unwrap_or_default();
        let rtsp_file = file.rtsp.unwrap_or_default();

        let code = app_file
            .code
            .ok_or_else(|| anyhow!("config is missing the [app] code sequence"))?;
        let alert_endpoint = app_file
            .alert_endpoint
            .ok_or_else(|| anyhow!("config is missing the [app] alert_endpoint"))?;

        let app = AppSettings {
            code,
            presence: app_file
                .presence
                .unwrap_or_else(|| Symbol::from(DEFAULT_PRESENCE)),
            alert_endpoint,
            window_ticks: app_file.window_secs.unwrap_or(DEFAULT_WINDOW_SECS),
            tick: Duration::from_millis(app_file.tick_millis.unwrap_or(DEFAULT_TICK_MILLIS)),
            min_confidence: app_file.min_confidence.unwrap_or(DEFAULT_MIN_CONFIDENCE),
        };
        let rtsp = RtspSettings {
            user: rtsp_file.user.unwrap_or_default(),
            password: rtsp_file.password.unwrap_or_default(),
            camera_ip: rtsp_file.camera_ip.unwrap_or_default(),
            port: rtsp_file.port.unwrap_or(DEFAULT_RTSP_PORT),
        };
        Ok(Self { app, rtsp })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(endpoint) = std::env::var("DESKWATCH_ALERT_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.app.alert_endpoint = endpoint;
            }
        }
        if let Ok(window) = std::env::var("DESKWATCH_WINDOW_SECS") {
            let secs: u32 = window.parse().map_err(|_| {
                anyhow!("DESKWATCH_WINDOW_SECS must be an integer number of seconds")
            })?;
            self.app.window_ticks = secs;
        }
        if let Ok(confidence) = std::env::var("DESKWATCH_MIN_CONFIDENCE") {
            let score: f32 = confidence
                .parse()
                .map_err(|_| anyhow!("DESKWATCH_MIN_CONFIDENCE must be a number in 0..=1"))?;
            self.app.min_confidence = score;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.app.code.is_empty() {
            return Err(anyhow!("secret code sequence must not be empty"));
        }
        let endpoint = url::Url::parse(&self.app.alert_endpoint)
            .map_err(|e| anyhow!("invalid alert_endpoint '{}': {}", self.app.alert_endpoint, e))?;
        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            return Err(anyhow!(
                "alert_endpoint must be http(s), got '{}'",
                endpoint.scheme()
            ));
        }
        if self.app.window_ticks == 0 {
            return Err(anyhow!("window_secs must be at least 1"));
        }
        if self.app.tick.is_zero() {
            return Err(anyhow!("tick_millis must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.app.min_confidence) {
            return Err(anyhow!(
                "min_confidence must be within 0..=1, got {}",
                self.app.min_confidence
            ));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<DeskwatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let cfg: DeskwatchConfigFile = toml::from_str(&raw)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    Ok(cfg)
}
