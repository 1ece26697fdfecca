use crate::checkpoint::store::{CheckpointStore, load_params, phrase_output_name};
use crate::encode::frames::{FrameDir, PHRASE_FRAME_DIGITS};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{TextmorphError, TextmorphResult};
use crate::model::encoder::{SynthBackend, ViewRequest};
use crate::model::translate::Translator;
use crate::objective::similarity::{Embedding, SimilarityObjective};
use crate::params::tensor::{ImageParams, NoiseField, all_finite};
use crate::synth::config::PhraseConfig;
use crate::synth::progress::ProgressLog;
use candle_core::Var;
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use std::path::{Path, PathBuf};

/// AdamW settings for image search; weight decay stays off.
pub(crate) fn adam_params(lr: f32) -> ParamsAdamW {
    ParamsAdamW {
        lr: f64::from(lr),
        beta1: 0.9,
        beta2: 0.999,
        eps: 1e-8,
        weight_decay: 0.0,
    }
}

/// Result of optimizing one phrase.
#[derive(Clone, Debug)]
pub struct PhraseOutcome {
    pub index: usize,
    /// Phrase text as sent to the encoder (trimmed, translated if enabled).
    pub text: String,
    /// Output name, `NN-<clean text>[-<variant>]`.
    pub name: String,
    pub frames_dir: PathBuf,
    /// Parameters the phrase started from.
    pub initial: ImageParams,
    /// Final parameters.
    pub params: ImageParams,
    pub last_frame: Option<PathBuf>,
    pub frames_written: u64,
    pub final_loss: f32,
}

/// Gradient search shaping one image towards one phrase.
#[derive(Clone, Debug)]
pub struct PhraseOptimizer<'a> {
    cfg: &'a PhraseConfig,
    store: &'a CheckpointStore,
    resume: Option<&'a Path>,
    translate_to: Option<&'a str>,
    name_suffix: Option<&'a str>,
    anti_target: Option<&'a Embedding>,
}

impl<'a> PhraseOptimizer<'a> {
    pub fn new(cfg: &'a PhraseConfig, store: &'a CheckpointStore) -> Self {
        Self {
            cfg,
            store,
            resume: None,
            translate_to: None,
            name_suffix: None,
            anti_target: None,
        }
    }

    /// Start phrase 0 from this snapshot instead of a random initialization.
    pub fn with_resume(mut self, path: Option<&'a Path>) -> Self {
        self.resume = path;
        self
    }

    /// Translate phrases to `lang` before encoding and naming.
    pub fn with_translation(mut self, lang: Option<&'a str>) -> Self {
        self.translate_to = lang;
        self
    }

    pub fn with_name_suffix(mut self, suffix: Option<&'a str>) -> Self {
        self.name_suffix = suffix;
        self
    }

    /// Embedding whose similarity is added to the loss.
    pub fn with_anti_target(mut self, anti: Option<&'a Embedding>) -> Self {
        self.anti_target = anti;
        self
    }

    #[tracing::instrument(skip(self, backend, translator, rng), fields(steps = self.cfg.steps))]
    pub fn run(
        &self,
        text: &str,
        index: usize,
        backend: &mut dyn SynthBackend,
        translator: &dyn Translator,
        rng: &mut dyn rand::RngCore,
    ) -> TextmorphResult<PhraseOutcome> {
        let cfg = self.cfg;
        if cfg.steps == 0 || cfg.fstep == 0 || cfg.samples == 0 {
            return Err(TextmorphError::validation(
                "steps, fstep and samples must be > 0",
            ));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(TextmorphError::validation(format!(
                "phrase {index} is empty"
            )));
        }

        let initial = self.starting_params(index, backend, rng)?;

        tracing::info!("ref text: {text}");
        let text = match self.translate_to {
            Some(lang) => {
                let translated = translator.translate(text, lang)?.trim().to_string();
                tracing::info!("translated to: {translated}");
                translated
            }
            None => text.to_string(),
        };
        let target = backend.encode_text(&text)?;
        let var = Var::from_tensor(initial.tensor())?;
        let objective = SimilarityObjective::new(&target, self.anti_target, var.device())?;

        let name = phrase_output_name(index, &text, self.name_suffix);
        let mut frames = FrameDir::create(self.store.root().join(&name), PHRASE_FRAME_DIGITS)?;

        let mut adam = AdamW::new(vec![var.clone()], adam_params(cfg.lrate))?;
        let request = ViewRequest {
            resolution: cfg.size,
            samples: cfg.samples,
            overscan: cfg.overscan,
        };
        let exports = u64::from(cfg.steps.div_ceil(cfg.fstep));
        let mut progress = ProgressLog::new(name.clone(), exports);

        let mut loss = f32::NAN;
        for i in 0..cfg.steps {
            let noise = if cfg.noise > 0.0 {
                Some(NoiseField::sample(initial.shape(), cfg.noise, rng)?)
            } else {
                None
            };

            let step = descend(
                backend,
                &objective,
                &mut adam,
                &var,
                noise.as_ref(),
                &request,
                rng,
            );
            // Reclaim even when the step failed; the error still aborts the phrase.
            backend.reclaim();
            loss = step?;
            if !all_finite(var.as_tensor())? {
                return Err(TextmorphError::objective(format!(
                    "parameters diverged at step {i}"
                )));
            }
            tracing::trace!(step = i, loss, "descent step");

            if i % cfg.fstep == 0 {
                let preview = backend.render(var.as_tensor(), cfg.size, None, cfg.contrast)?;
                frames.write(FrameIndex(u64::from(i / cfg.fstep)), &preview)?;
                progress.advance();
            }
        }
        tracing::info!(loss, frames = frames.written(), "phrase done");
        let params = ImageParams::from_tensor(var.as_tensor())?;

        Ok(PhraseOutcome {
            index,
            text,
            name,
            frames_dir: frames.dir().to_path_buf(),
            initial,
            params,
            last_frame: frames.last_path().map(Path::to_path_buf),
            frames_written: frames.written(),
            final_loss: loss,
        })
    }

    fn starting_params(
        &self,
        index: usize,
        backend: &mut dyn SynthBackend,
        rng: &mut dyn rand::RngCore,
    ) -> TextmorphResult<ImageParams> {
        let expected = backend.param_shape(self.cfg.size);
        if index == 0 {
            let params = match self.resume {
                Some(path) => {
                    tracing::info!(path = %path.display(), "resuming from snapshot");
                    load_params(path)?
                }
                None => backend.random_params(self.cfg.size, rng)?,
            };
            check_shape(&params, &expected)?;
            self.store.save_scratch(&params)?;
            return Ok(params);
        }
        let params = self.store.load_scratch()?;
        check_shape(&params, &expected)?;
        Ok(params)
    }
}

fn descend(
    backend: &mut dyn SynthBackend,
    objective: &SimilarityObjective,
    adam: &mut AdamW,
    var: &Var,
    noise: Option<&NoiseField>,
    request: &ViewRequest,
    rng: &mut dyn rand::RngCore,
) -> TextmorphResult<f32> {
    let views = backend.embed_views(var.as_tensor(), noise, request, rng)?;
    let loss = objective.loss(&views)?;
    let value = loss.to_vec0::<f32>()?;
    if !value.is_finite() {
        return Err(TextmorphError::objective("loss is not finite"));
    }
    adam.backward_step(&loss)?;
    Ok(value)
}

fn check_shape(params: &ImageParams, expected: &[usize]) -> TextmorphResult<()> {
    if params.shape() != expected {
        return Err(TextmorphError::validation(format!(
            "parameter shape {:?} does not match {:?} expected for this resolution",
            params.shape(),
            expected
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/synth/optimizer.rs"]
mod tests;
