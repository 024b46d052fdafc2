use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tuning for an [`Animator`](crate::Animator), provided by the embedding application.
///
/// Every field has a default, so a JSON document only needs the keys it overrides:
///
/// ```
/// # use zap_motion::AnimatorConfig;
/// let config = AnimatorConfig::from_json(r#"{ "max_duration_s": 10.0 }"#).unwrap();
/// assert_eq!(config.position_epsilon, 1e-4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimatorConfig {
    /// A spring field settles once `|x - target|` drops below this (default: 1e-4).
    pub position_epsilon: f64,
    /// ...and `|v|` drops below this (default: 1e-4). Also bounds orientation
    /// direction speed (squared) and roll speed.
    pub velocity_epsilon: f64,
    /// An orientation settles once `|q · target|` exceeds this (default: 0.999).
    pub orientation_dot_threshold: f64,
    /// Force-complete any animation older than this many seconds (default: none).
    pub max_duration_s: Option<f64>,
    /// Step size used by the first `tick()`, which has no previous frame to measure from
    /// (default: 1/60).
    pub first_tick_dt: f64,
}

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self {
            position_epsilon: 1e-4,
            velocity_epsilon: 1e-4,
            orientation_dot_threshold: 0.999,
            max_duration_s: None,
            first_tick_dt: 1.0 / 60.0,
        }
    }
}

impl AnimatorConfig {
    /// Parse from a JSON document; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builder: force-complete animations older than `seconds`.
    pub fn with_max_duration(mut self, seconds: f64) -> Self {
        self.max_duration_s = Some(seconds);
        self
    }

    /// Builder: override both settling epsilons.
    pub fn with_epsilons(mut self, position: f64, velocity: f64) -> Self {
        self.position_epsilon = position;
        self.velocity_epsilon = velocity;
        self
    }
}
