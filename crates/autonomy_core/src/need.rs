//! The BDI engine's need vector: time-decaying metabolic drives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `{name, value, decay_rate_per_hour, trigger_threshold, last_satisfied, last_decay}`.
///
/// `value = 0` is satisfied, `value = 1` is critical. Decay is pure
/// addition of `decay_rate * delta_hours`; satisfaction is pure subtraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Need {
    pub name: String,
    pub value: f32,
    pub decay_rate_per_hour: f32,
    pub trigger_threshold: f32,
    pub last_satisfied: DateTime<Utc>,
    pub last_decay: DateTime<Utc>,
}

impl Need {
    pub fn new(name: impl Into<String>, decay_rate_per_hour: f32, trigger_threshold: f32) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            value: 0.0,
            decay_rate_per_hour,
            trigger_threshold,
            last_satisfied: now,
            last_decay: now,
        }
    }

    /// Apply decay for the elapsed time since `last_decay`, clamped to [0,1].
    /// `last_decay` only ever advances (monotonically non-decreasing).
    pub fn decay(&mut self, now: DateTime<Utc>) {
        if now <= self.last_decay {
            return;
        }
        let delta_hours = (now - self.last_decay).num_milliseconds() as f32 / 3_600_000.0;
        if delta_hours < 0.01 {
            return;
        }
        self.value = (self.value + self.decay_rate_per_hour * delta_hours).clamp(0.0, 1.0);
        self.last_decay = now;
    }

    /// Unconditionally reduce the need by `amount` (subtraction, clamped).
    pub fn satisfy(&mut self, amount: f32, now: DateTime<Utc>) {
        self.value = (self.value - amount).clamp(0.0, 1.0);
        self.last_satisfied = now;
    }

    /// Increase the need by `amount` (clamped). Used for externally observed
    /// need-raising events (e.g. a Think stage reporting growing curiosity).
    pub fn raise(&mut self, amount: f32) {
        self.value = (self.value + amount).clamp(0.0, 1.0);
    }

    /// `update_need(delta)`: negative deltas satisfy, positive deltas raise.
    pub fn update(&mut self, delta: f32, now: DateTime<Utc>) {
        if delta < 0.0 {
            self.satisfy(-delta, now);
        } else if delta > 0.0 {
            self.raise(delta);
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.value >= self.trigger_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn decay_is_additive_and_clamped() {
        let mut need = Need::new("social", 0.5, 0.7);
        let t0 = need.last_decay;
        need.decay(t0 + Duration::hours(3));
        assert!((need.value - 1.0).abs() < 1e-6); // 0 + 0.5*3 = 1.5 -> clamp 1.0
    }

    #[test]
    fn decay_below_threshold_is_noop() {
        let mut need = Need::new("social", 0.5, 0.7);
        let t0 = need.last_decay;
        need.decay(t0 + Duration::seconds(10));
        assert_eq!(need.value, 0.0);
        assert_eq!(need.last_decay, t0);
    }

    #[test]
    fn last_decay_never_goes_backwards() {
        let mut need = Need::new("social", 0.1, 0.7);
        let t0 = need.last_decay;
        need.decay(t0 - Duration::hours(1));
        assert_eq!(need.last_decay, t0);
    }

    #[test]
    fn satisfy_subtracts_and_clamps_at_zero() {
        let mut need = Need::new("social", 0.1, 0.7);
        need.value = 0.2;
        need.satisfy(0.5, Utc::now());
        assert_eq!(need.value, 0.0);
    }

    #[test]
    fn update_negative_satisfies_positive_raises() {
        let mut need = Need::new("curiosity", 0.1, 0.7);
        need.value = 0.5;
        need.update(-0.3, Utc::now());
        assert!((need.value - 0.2).abs() < 1e-6);
        need.update(0.3, Utc::now());
        assert!((need.value - 0.5).abs() < 1e-6);
    }

    #[test]
    fn trigger_threshold() {
        let mut need = Need::new("social", 0.1, 0.7);
        need.value = 0.69;
        assert!(!need.is_triggered());
        need.value = 0.7;
        assert!(need.is_triggered());
    }
}
