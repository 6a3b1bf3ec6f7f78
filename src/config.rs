//! Engine configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! TOML/JSON/YAML file, then `AUTOPILOT__SECTION__KEY` environment variables.
//! Durations are humantime strings such as `"10s"` or `"25ms"`.

use std::path::Path;
use std::time::Duration;

use action_automations::AutomationPolicy;
use anyhow::{Context, Result};
use autopilot_core_types::Point;
use config::{Config, Environment, File};
use cursor_controller::CursorConfig;
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "AUTOPILOT";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub automation: AutomationSection,
    pub cursor: CursorSection,
    pub logging: LoggingSection,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationSection {
    #[serde(with = "duration_str")]
    pub selector_timeout: Duration,
    #[serde(with = "duration_str")]
    pub poll_interval: Duration,
    #[serde(with = "duration_str")]
    pub step_delay: Duration,
    #[serde(with = "duration_str")]
    pub typing_delay: Duration,
    /// Upper bound for one command, resolution included.
    #[serde(with = "duration_str")]
    pub command_timeout: Duration,
    pub default_speed: f64,
    pub strict_element_check: bool,
    pub wheel_step_px: f64,
}

impl Default for AutomationSection {
    fn default() -> Self {
        let policy = AutomationPolicy::default();
        Self {
            selector_timeout: policy.selector_timeout(),
            poll_interval: policy.poll_interval(),
            step_delay: Duration::from_millis(policy.step_delay_ms),
            typing_delay: Duration::from_millis(policy.typing_delay_ms),
            command_timeout: Duration::from_secs(30),
            default_speed: policy.default_speed,
            strict_element_check: policy.strict_element_check,
            wheel_step_px: policy.wheel_step_px,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorSection {
    pub render: bool,
    #[serde(with = "duration_str")]
    pub move_duration: Duration,
    #[serde(with = "duration_str")]
    pub frame_interval: Duration,
    pub start_x: f64,
    pub start_y: f64,
}

impl Default for CursorSection {
    fn default() -> Self {
        let cursor = CursorConfig::default();
        Self {
            render: cursor.render,
            move_duration: cursor.move_duration(),
            frame_interval: cursor.frame_interval(),
            start_x: cursor.start.x,
            start_y: cursor.start.y,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl EngineConfig {
    /// Defaults, then `path` if given, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults =
            Config::try_from(&EngineConfig::default()).context("encoding default configuration")?;
        let mut builder = Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let loaded = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| match path {
                Some(path) => format!("loading configuration from {}", path.display()),
                None => "loading configuration".to_string(),
            })?;
        loaded
            .try_deserialize()
            .context("configuration does not match the expected shape")
    }

    pub fn policy(&self) -> AutomationPolicy {
        let automation = &self.automation;
        AutomationPolicy {
            selector_timeout_ms: millis(automation.selector_timeout),
            poll_interval_ms: millis(automation.poll_interval),
            step_delay_ms: millis(automation.step_delay),
            typing_delay_ms: millis(automation.typing_delay),
            default_speed: automation.default_speed,
            strict_element_check: automation.strict_element_check,
            wheel_step_px: automation.wheel_step_px,
        }
    }

    pub fn cursor_config(&self) -> CursorConfig {
        CursorConfig {
            render: self.cursor.render,
            move_duration_ms: millis(self.cursor.move_duration),
            frame_interval_ms: millis(self.cursor.frame_interval),
            start: Point::new(self.cursor.start_x, self.cursor.start_y),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

mod duration_str {
    use std::time::Duration;

    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(raw.trim()).map_err(de::Error::custom)
    }
}
