//! Environment-driven configuration for the embedding process.
//!
//! The engine itself takes explicit arguments; this module is the standard
//! way a host wires it from `PRENOTA_*` environment variables.

use std::path::PathBuf;

use crate::engine::BookingPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the WAL. Created by the host if missing.
    pub data_dir: PathBuf,
    /// WAL appends between automatic compactions.
    pub compact_threshold: u64,
    /// Prometheus exporter port; None disables the exporter.
    pub metrics_port: Option<u16>,
    pub policy: BookingPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            compact_threshold: 1000,
            metrics_port: None,
            policy: BookingPolicy::default(),
        }
    }
}

impl Config {
    /// Read configuration from the environment, falling back to defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_dir: std::env::var("PRENOTA_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            compact_threshold: std::env::var("PRENOTA_COMPACT_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.compact_threshold),
            metrics_port: std::env::var("PRENOTA_METRICS_PORT")
                .ok()
                .and_then(|s| s.parse().ok()),
            policy: BookingPolicy {
                reject_midnight_crossing: std::env::var("PRENOTA_ALLOW_MIDNIGHT_CROSSING")
                    .map(|s| !matches!(s.as_str(), "1" | "true" | "yes"))
                    .unwrap_or(defaults.policy.reject_midnight_crossing),
            },
        }
    }

    /// Path of the single club WAL inside `data_dir`.
    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("club.wal")
    }
}
