use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Slowest accepted action speed.
pub const MIN_SPEED: f64 = 0.01;

/// Timing knobs shared by every automation in a browsing context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationPolicy {
    pub selector_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Delay between consecutive input steps at speed 1.0.
    pub step_delay_ms: u64,
    /// Delay between typed characters at speed 1.0.
    pub typing_delay_ms: u64,
    pub default_speed: f64,
    pub strict_element_check: bool,
    /// Pixels per wheel step when scrolling.
    pub wheel_step_px: f64,
}

impl AutomationPolicy {
    /// No pauses between steps; used by tests and headless scenario runs.
    pub fn immediate() -> Self {
        Self {
            step_delay_ms: 0,
            typing_delay_ms: 0,
            poll_interval_ms: 5,
            ..Self::default()
        }
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_millis(self.selector_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn step_delay(&self, speed: f64) -> Duration {
        scale(self.step_delay_ms, speed)
    }

    pub fn typing_delay(&self, speed: f64) -> Duration {
        scale(self.typing_delay_ms, speed)
    }
}

impl Default for AutomationPolicy {
    fn default() -> Self {
        Self {
            selector_timeout_ms: 10_000,
            poll_interval_ms: 50,
            step_delay_ms: 10,
            typing_delay_ms: 15,
            default_speed: 1.0,
            strict_element_check: true,
            wheel_step_px: 100.0,
        }
    }
}

fn scale(base_ms: u64, speed: f64) -> Duration {
    if base_ms == 0 {
        return Duration::ZERO;
    }
    let speed = if speed.is_finite() && speed > 0.0 {
        speed.clamp(MIN_SPEED, 1.0)
    } else {
        1.0
    };
    Duration::try_from_secs_f64(base_ms as f64 / 1000.0 / speed).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slower_speed_stretches_delays() {
        let policy = AutomationPolicy::default();
        assert_eq!(policy.step_delay(1.0), Duration::from_millis(10));
        assert_eq!(policy.step_delay(0.5), Duration::from_millis(20));
        assert_eq!(AutomationPolicy::immediate().typing_delay(0.1), Duration::ZERO);
    }

    #[test]
    fn speed_below_the_floor_saturates() {
        let policy = AutomationPolicy::default();
        assert_eq!(policy.step_delay(MIN_SPEED), Duration::from_secs(1));
        assert_eq!(policy.step_delay(1e-30), Duration::from_secs(1));
        let typing = policy.typing_delay(f64::MIN_POSITIVE);
        assert!(typing > Duration::from_millis(1499) && typing < Duration::from_millis(1501));
        assert_eq!(policy.step_delay(f64::NAN), Duration::from_millis(10));

        let slow = AutomationPolicy {
            step_delay_ms: u64::MAX,
            ..AutomationPolicy::default()
        };
        assert!(slow.step_delay(MIN_SPEED) >= Duration::from_secs(u64::MAX / 1000));
    }
}
