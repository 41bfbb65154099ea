use crate::error::BridgeError;
use crate::ingest::{IngestConfig, DEFAULT_INGEST_PORT};
use crate::pointer::{BackendKind, ControlConfig, ScreenSize};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BridgeSettings {
    /// Loopback endpoint the recognizer sends to. Port `0` picks any free
    /// port.
    #[serde(default = "default_ingest_addr")]
    pub ingest_addr: String,
    /// Pointer loop cadence.
    #[serde(default = "default_tick_rate")]
    pub tick_rate_hz: u32,
    /// Weight of the newest sample in the exponential filter, in `(0, 1]`.
    #[serde(default = "default_smoothing")]
    pub smoothing_factor: f64,
    #[serde(default)]
    pub backend: BackendKind,
    /// Screen extent assumed by the no-op backend, which has no display to
    /// query.
    #[serde(default = "default_fallback_screen")]
    pub fallback_screen: (i32, i32),
    #[serde(default = "default_ingest_poll")]
    pub ingest_poll_ms: u64,
    /// Bounded wait for each worker during teardown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_ms: u64,
    #[serde(default = "default_max_datagram")]
    pub max_datagram_bytes: usize,
    /// When enabled the logger runs at debug level and honours `RUST_LOG`.
    #[serde(default)]
    pub debug_logging: bool,
    /// Also write logs to this file.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_ingest_addr() -> String {
    format!("127.0.0.1:{DEFAULT_INGEST_PORT}")
}

fn default_tick_rate() -> u32 {
    120
}

fn default_smoothing() -> f64 {
    0.3
}

fn default_fallback_screen() -> (i32, i32) {
    (1920, 1080)
}

fn default_ingest_poll() -> u64 {
    50
}

fn default_shutdown_timeout() -> u64 {
    2000
}

fn default_max_datagram() -> usize {
    4096
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            ingest_addr: default_ingest_addr(),
            tick_rate_hz: default_tick_rate(),
            smoothing_factor: default_smoothing(),
            backend: BackendKind::default(),
            fallback_screen: default_fallback_screen(),
            ingest_poll_ms: default_ingest_poll(),
            shutdown_timeout_ms: default_shutdown_timeout(),
            max_datagram_bytes: default_max_datagram(),
            debug_logging: false,
            log_file: None,
        }
    }
}

impl BridgeSettings {
    /// Missing or empty files yield the defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("parse settings file {}", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("write settings file {}", path.display()))?;
        Ok(())
    }

    pub fn ingest_config(&self) -> Result<IngestConfig, BridgeError> {
        let bind_addr: SocketAddr = self.ingest_addr.trim().parse().map_err(|_| {
            BridgeError::InvalidSettings(format!(
                "ingest_addr '{}' is not host:port",
                self.ingest_addr
            ))
        })?;
        if !bind_addr.ip().is_loopback() {
            tracing::warn!(%bind_addr, "gesture endpoint is not loopback");
        }
        Ok(IngestConfig {
            bind_addr,
            poll_interval: Duration::from_millis(self.ingest_poll_ms.max(1)),
            join_timeout: self.shutdown_timeout(),
            max_datagram_bytes: self.max_datagram_bytes.max(64),
        })
    }

    pub fn control_config(&self) -> Result<ControlConfig, BridgeError> {
        if self.tick_rate_hz == 0 {
            return Err(BridgeError::InvalidSettings(
                "tick_rate_hz must be positive".to_string(),
            ));
        }
        if !self.smoothing_factor.is_finite()
            || self.smoothing_factor <= 0.0
            || self.smoothing_factor > 1.0
        {
            tracing::warn!(
                smoothing_factor = self.smoothing_factor,
                "smoothing_factor outside (0, 1]; it will be clamped"
            );
        }
        Ok(ControlConfig {
            tick_rate_hz: self.tick_rate_hz,
            smoothing_factor: self.smoothing_factor,
            join_timeout: self.shutdown_timeout(),
        })
    }

    pub fn fallback_screen(&self) -> ScreenSize {
        ScreenSize::new(self.fallback_screen.0, self.fallback_screen.1)
    }

    fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_recognizer_contract() {
        let settings = BridgeSettings::default();
        let ingest = settings.ingest_config().unwrap();
        assert_eq!(ingest.bind_addr.port(), 12345);
        assert!(ingest.bind_addr.ip().is_loopback());

        let control = settings.control_config().unwrap();
        assert_eq!(control.tick_rate_hz, 120);
        assert_eq!(control.smoothing_factor, 0.3);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: BridgeSettings =
            serde_json::from_str(r#"{"tick_rate_hz": 60, "backend": "noop"}"#).unwrap();
        assert_eq!(settings.tick_rate_hz, 60);
        assert_eq!(settings.backend, BackendKind::Noop);
        assert_eq!(settings.ingest_addr, "127.0.0.1:12345");
        assert!(!settings.debug_logging);
    }

    #[test]
    fn rejects_bad_values() {
        let settings = BridgeSettings {
            ingest_addr: "localhost".into(),
            tick_rate_hz: 0,
            ..BridgeSettings::default()
        };
        assert!(matches!(
            settings.ingest_config(),
            Err(BridgeError::InvalidSettings(_))
        ));
        assert!(matches!(
            settings.control_config(),
            Err(BridgeError::InvalidSettings(_))
        ));
    }
}
