use crate::animation::ease::Ease;
use crate::checkpoint::store::load_params;
use crate::encode::frames::FrameDir;
use crate::foundation::core::{FrameIndex, Resolution};
use crate::foundation::error::{TextmorphError, TextmorphResult};
use crate::model::encoder::ImageGenerator;
use crate::synth::progress::ProgressLog;
use std::path::PathBuf;

/// Renders the eased, looping transition sequence between phrase snapshots.
///
/// Transition `p` blends snapshot `p` towards snapshot `(p + 1) % n`, so the
/// last transition returns to the first phrase. Frame `i` of transition `p`
/// is written as global frame `p * steps + i`.
pub struct InterpolationRenderer<'a> {
    generator: &'a dyn ImageGenerator,
    size: Resolution,
    steps: u64,
    ease: Ease,
}

impl<'a> InterpolationRenderer<'a> {
    pub fn new(generator: &'a dyn ImageGenerator, size: Resolution, steps: u64, ease: Ease) -> Self {
        Self {
            generator,
            size,
            steps,
            ease,
        }
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Render every transition into `out`; returns the number of frames written.
    #[tracing::instrument(skip_all, fields(phrases = snapshots.len(), steps = self.steps))]
    pub fn render(&self, snapshots: &[PathBuf], out: &mut FrameDir) -> TextmorphResult<u64> {
        if snapshots.is_empty() {
            return Err(TextmorphError::validation(
                "nothing to interpolate: no phrase snapshots",
            ));
        }
        if self.steps == 0 {
            return Err(TextmorphError::validation(
                "transition length rounds to zero frames; increase length or fps",
            ));
        }

        let mut progress = ProgressLog::new("interpolation", snapshots.len() as u64 * self.steps);
        for (p, q) in transition_pairs(snapshots.len()) {
            let from = load_params(&snapshots[p])?;
            let to = load_params(&snapshots[q])?;
            let delta = to.sub(&from)?;
            tracing::debug!(from = p, to = q, "transition");

            for i in 0..self.steps {
                let w = self.ease.weight(i, self.steps) as f32;
                let params = from.add_scaled(&delta, w)?;
                let frame = self.generator.render(params.tensor(), self.size, None, 1.0)?;
                out.write(FrameIndex(frame_index(p, i, self.steps)), &frame)?;
                progress.advance();
            }
        }
        Ok(out.written())
    }
}

/// `(p, (p + 1) % n)` for every transition of an `n`-phrase loop.
pub fn transition_pairs(n: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..n).map(move |p| (p, (p + 1) % n))
}

/// Global frame number of step `i` in transition `p`.
pub fn frame_index(p: usize, i: u64, steps: u64) -> u64 {
    p as u64 * steps + i
}

#[cfg(test)]
#[path = "../../tests/unit/synth/interpolate.rs"]
mod tests;
