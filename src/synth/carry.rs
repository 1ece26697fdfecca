use crate::foundation::error::TextmorphResult;
use crate::params::tensor::ImageParams;
use crate::synth::config::CarryMode;

/// Carry-over state threaded between phrases.
///
/// Owns the phrase-0 baseline and, for [`CarryMode::All`], the running average
/// of phrase results. [`CarryOver::after_phrase`] returns the tensor that the
/// next phrase starts from.
#[derive(Clone, Debug)]
pub struct CarryOver {
    mode: CarryMode,
    baseline: ImageParams,
    carried: ImageParams,
}

impl CarryOver {
    pub fn new(mode: CarryMode, baseline: ImageParams) -> Self {
        Self {
            mode,
            carried: baseline.clone(),
            baseline,
        }
    }

    pub fn mode(&self) -> CarryMode {
        self.mode
    }

    pub fn baseline(&self) -> &ImageParams {
        &self.baseline
    }

    pub fn carried(&self) -> &ImageParams {
        &self.carried
    }

    /// Fold in the result of phrase `index` (zero-based) and return the next start.
    pub fn after_phrase(
        &mut self,
        index: usize,
        result: &ImageParams,
    ) -> TextmorphResult<ImageParams> {
        match self.mode {
            CarryMode::Reset => Ok(self.baseline.clone()),
            CarryMode::All => {
                self.carried = cumulative_average(&self.carried, result, index)?;
                Ok(self.carried.clone())
            }
            CarryMode::Last => self.baseline.blend(0.5, result, 0.5),
        }
    }
}

/// Running mean update: weight `1/(k+1)` on `next`, `k/(k+1)` on `prev`.
pub fn cumulative_average(
    prev: &ImageParams,
    next: &ImageParams,
    k: usize,
) -> TextmorphResult<ImageParams> {
    let w = 1.0 / (k as f32 + 1.0);
    prev.blend(1.0 - w, next, w)
}

#[cfg(test)]
#[path = "../../tests/unit/synth/carry.rs"]
mod tests;
