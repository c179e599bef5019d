// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Runtime configuration.
//!
//! Every field has a default, so a config file only needs to list what it
//! changes. The startup backend can also be overridden through the
//! [`BACKEND_ENV`] environment variable.

use anyhow::{ensure, Context as _};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use warden_control::DEFAULT_ENTROPY_THRESHOLD;
use warden_infra::{DEFAULT_FLAT_TEXTURE, DEFAULT_OVERRIDES};
use warden_lanes::QueryPollConfig;

/// Environment variable overriding [`WardenConfig::startup_backend`].
///
/// Set it to `none` to start without a backend.
pub const BACKEND_ENV: &str = "WARDEN_BACKEND";

/// Bounds for waiting on pipeline-statistics queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryPollSettings {
    /// Maximum number of readiness polls.
    pub max_polls: u32,
    /// First sleep between polls, in microseconds.
    pub initial_backoff_us: u64,
    /// Upper bound for the sleep between polls, in microseconds.
    pub max_backoff_us: u64,
}

impl Default for QueryPollSettings {
    fn default() -> Self {
        Self {
            max_polls: 10_000,
            initial_backoff_us: 1,
            max_backoff_us: 1_000,
        }
    }
}

impl From<&QueryPollSettings> for QueryPollConfig {
    fn from(settings: &QueryPollSettings) -> Self {
        QueryPollConfig {
            max_polls: settings.max_polls,
            initial_backoff: Duration::from_micros(settings.initial_backoff_us),
            max_backoff: Duration::from_micros(settings.max_backoff_us),
        }
    }
}

/// Configuration of a stability-layer instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WardenConfig {
    /// Sleep target between orchestrator frames, in milliseconds.
    pub tick_interval_ms: u64,
    /// Run the statistics probe every N frames. `0` disables it.
    pub monitor_every_frames: u64,
    /// Initial draw-suppression threshold.
    pub entropy_threshold: f32,
    /// Whether draw routing starts enabled.
    pub routing_enabled: bool,
    /// Whether the jitter estimator starts enabled.
    pub estimator_enabled: bool,
    /// Locator of the backend registered and activated at startup.
    pub startup_backend: Option<String>,
    /// Capacity of the intercept-event queue.
    pub intercept_buffer_size: usize,
    /// Texture substituted for every overridden name.
    pub flat_texture: String,
    /// Texture names redirected to the flat texture.
    pub texture_overrides: Vec<String>,
    /// Statistics query wait bounds.
    pub query_poll: QueryPollSettings,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 4,
            monitor_every_frames: 60,
            entropy_threshold: DEFAULT_ENTROPY_THRESHOLD,
            routing_enabled: true,
            estimator_enabled: true,
            startup_backend: Some("builtin:console".to_string()),
            intercept_buffer_size: 256,
            flat_texture: DEFAULT_FLAT_TEXTURE.to_string(),
            texture_overrides: DEFAULT_OVERRIDES.iter().map(|s| s.to_string()).collect(),
            query_poll: QueryPollSettings::default(),
        }
    }
}

impl WardenConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json).context("Invalid configuration JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the JSON configuration at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&json)
            .with_context(|| format!("Failed to load config file {}", path.display()))
    }

    /// Loads `path` if given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Applies the [`BACKEND_ENV`] override from the process environment.
    pub fn apply_env_override(self) -> Self {
        self.with_backend_override(std::env::var(BACKEND_ENV).ok())
    }

    /// Replaces the startup backend with `value`, if present.
    ///
    /// An empty value is ignored; `none` clears the startup backend.
    pub fn with_backend_override(mut self, value: Option<String>) -> Self {
        if let Some(value) = value {
            let value = value.trim();
            if value.eq_ignore_ascii_case("none") {
                log::info!("WardenConfig: {} disables the startup backend.", BACKEND_ENV);
                self.startup_backend = None;
            } else if !value.is_empty() {
                log::info!("WardenConfig: Startup backend overridden by {}: {}", BACKEND_ENV, value);
                self.startup_backend = Some(value.to_string());
            }
        }
        self
    }

    /// Checks value ranges.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.tick_interval_ms > 0, "tick_interval_ms must be at least 1");
        ensure!(
            self.entropy_threshold.is_finite() && self.entropy_threshold >= 0.0,
            "entropy_threshold must be a finite, non-negative number (got {})",
            self.entropy_threshold
        );
        ensure!(
            self.intercept_buffer_size > 0,
            "intercept_buffer_size must be at least 1"
        );
        ensure!(self.query_poll.max_polls > 0, "query_poll.max_polls must be at least 1");
        ensure!(
            self.query_poll.initial_backoff_us <= self.query_poll.max_backoff_us,
            "query_poll.initial_backoff_us must not exceed query_poll.max_backoff_us"
        );
        if let Some(locator) = &self.startup_backend {
            ensure!(!locator.trim().is_empty(), "startup_backend must not be empty");
        }
        Ok(())
    }

    /// The tick interval as a duration.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = WardenConfig::default();
        assert_eq!(config.tick_interval_ms, 4);
        assert_eq!(config.monitor_every_frames, 60);
        assert_eq!(config.entropy_threshold, 0.01);
        assert_eq!(config.startup_backend.as_deref(), Some("builtin:console"));
        assert_eq!(config.texture_overrides.len(), 6);
        assert_eq!(config.query_poll.max_polls, 10_000);
        config.validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            WardenConfig::from_json_str(r#"{ "entropy_threshold": 0.02, "query_poll": { "max_polls": 5 } }"#)
                .unwrap();
        assert_eq!(config.entropy_threshold, 0.02);
        assert_eq!(config.query_poll.max_polls, 5);
        assert_eq!(config.query_poll.max_backoff_us, 1_000);
        assert!(config.routing_enabled);
    }

    #[test]
    fn rejects_unknown_fields_and_bad_values() {
        assert!(WardenConfig::from_json_str(r#"{ "entropy_treshold": 0.5 }"#).is_err());
        assert!(WardenConfig::from_json_str(r#"{ "entropy_threshold": -1.0 }"#).is_err());
        assert!(WardenConfig::from_json_str(r#"{ "tick_interval_ms": 0 }"#).is_err());
        assert!(WardenConfig::from_json_str(
            r#"{ "query_poll": { "initial_backoff_us": 10, "max_backoff_us": 1 } }"#
        )
        .is_err());
    }

    #[test]
    fn backend_override() {
        let base = WardenConfig::default();
        let journal = base
            .clone()
            .with_backend_override(Some("builtin:journal".into()));
        assert_eq!(journal.startup_backend.as_deref(), Some("builtin:journal"));

        let none = base.clone().with_backend_override(Some("NONE".into()));
        assert_eq!(none.startup_backend, None);

        let blank = base.clone().with_backend_override(Some("  ".into()));
        assert_eq!(blank.startup_backend, base.startup_backend);
    }

    #[test]
    fn poll_settings_convert() {
        let poll = QueryPollConfig::from(&QueryPollSettings::default());
        assert_eq!(poll, QueryPollConfig::default());
    }
}
