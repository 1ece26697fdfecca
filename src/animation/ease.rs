use crate::foundation::error::TextmorphError;
use std::f64::consts::FRAC_PI_2;
use std::str::FromStr;

/// Easing functions used to map normalized transition progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ease {
    /// Linear interpolation.
    Linear,
    /// `sin(pi/2 * t)^2`: zero velocity at both ends.
    #[default]
    #[serde(rename = "sine")]
    InOutSine,
}

impl Ease {
    /// Apply this easing function to normalized progress `t` in `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InOutSine => (FRAC_PI_2 * t).sin().powi(2),
        }
    }

    /// Weight for step `i` of a transition with `steps` steps (`i / steps` eased).
    pub fn weight(self, i: u64, steps: u64) -> f64 {
        if steps == 0 {
            return 1.0;
        }
        self.apply(i as f64 / steps as f64)
    }
}

impl FromStr for Ease {
    type Err = TextmorphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Self::Linear),
            "sine" => Ok(Self::InOutSine),
            _ => Err(TextmorphError::validation(format!(
                "unknown ease '{s}' (expected 'sine' or 'linear')"
            ))),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
