//! Shared configuration for the deformation workspace
//!
//! This crate provides the single source of truth for scheduler, worker pool
//! and normal-welding settings shared by every crate that drives deformables.

use serde::{Deserialize, Serialize};

/// Default welding tolerance (five decimal digits).
pub const DEFAULT_WELD_EPSILON: f32 = 1e-5;

/// Default smoothing angle in degrees for normal recalculation.
pub const DEFAULT_SMOOTHING_ANGLE: f32 = 60.0;

/// Environment variable overriding the worker thread count.
pub const WORKER_THREADS_ENV: &str = "DEFORM_WORKER_THREADS";

/// Environment variable toggling the scheduler gate (`0`/`false` disables).
pub const ENABLED_ENV: &str = "DEFORM_ENABLED";

/// When a deformable's results become visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Issued this tick, completed and committed at the start of the next one
    #[default]
    Deferred,
    /// Issued, completed and committed inside the same tick
    Immediate,
    /// Skipped entirely until switched back
    Paused,
}

/// Scheduler and recalculation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeformConfig {
    /// Gate checked at the top of every tick
    pub enabled: bool,
    /// Worker pool size (0 = one per available core)
    pub worker_threads: usize,
    /// Quantization step used to weld coincident vertices
    pub weld_epsilon: f32,
    /// Default smoothing angle (degrees) for new normal stages
    pub smoothing_angle: f32,
    /// Update mode given to deformables that don't pick one
    pub default_update_mode: UpdateMode,
}

impl Default for DeformConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            worker_threads: 0,
            weld_epsilon: DEFAULT_WELD_EPSILON,
            smoothing_angle: DEFAULT_SMOOTHING_ANGLE,
            default_update_mode: UpdateMode::Deferred,
        }
    }
}

impl DeformConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Parse a JSON document; missing fields fall back to defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Resolved worker count, never zero
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads > 0 {
            self.worker_threads
        } else {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        }
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(WORKER_THREADS_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(threads) => self.worker_threads = threads,
                Err(_) => tracing::warn!("Ignoring invalid {}={:?}", WORKER_THREADS_ENV, raw),
            }
        }
        if let Some(raw) = lookup(ENABLED_ENV) {
            match raw.trim() {
                "0" | "false" | "off" => self.enabled = false,
                "1" | "true" | "on" => self.enabled = true,
                _ => tracing::warn!("Ignoring invalid {}={:?}", ENABLED_ENV, raw),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DeformConfig::default();
        assert!(config.enabled);
        assert_eq!(config.weld_epsilon, DEFAULT_WELD_EPSILON);
        assert_eq!(config.smoothing_angle, DEFAULT_SMOOTHING_ANGLE);
        assert_eq!(config.default_update_mode, UpdateMode::Deferred);
        assert!(config.resolved_worker_threads() >= 1);
    }

    #[test]
    fn test_json_partial_document() {
        let config = DeformConfig::from_json(r#"{ "worker_threads": 3, "default_update_mode": "immediate" }"#)
            .unwrap();
        assert_eq!(config.worker_threads, 3);
        assert_eq!(config.resolved_worker_threads(), 3);
        assert_eq!(config.default_update_mode, UpdateMode::Immediate);
        assert!(config.enabled);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = DeformConfig::default();
        config.apply_env_overrides(|key| match key {
            WORKER_THREADS_ENV => Some("2".to_string()),
            ENABLED_ENV => Some("false".to_string()),
            _ => None,
        });
        assert_eq!(config.worker_threads, 2);
        assert!(!config.enabled);
    }

    #[test]
    fn test_env_overrides_ignore_garbage() {
        let mut config = DeformConfig::default();
        config.apply_env_overrides(|key| match key {
            WORKER_THREADS_ENV => Some("many".to_string()),
            ENABLED_ENV => Some("maybe".to_string()),
            _ => None,
        });
        assert_eq!(config.worker_threads, 0);
        assert!(config.enabled);
    }
}
