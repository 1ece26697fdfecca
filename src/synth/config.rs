use crate::animation::ease::Ease;
use crate::foundation::core::Resolution;
use crate::foundation::error::{TextmorphError, TextmorphResult};
use crate::model::variant::ModelVariant;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How one phrase's result seeds the next phrase's starting parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CarryMode {
    /// Every phrase restarts from the phrase-0 random initialization.
    #[default]
    #[serde(rename = "none")]
    Reset,
    /// Running average of all phrase results so far.
    #[serde(rename = "all")]
    All,
    /// Average of the phrase-0 baseline and the latest phrase result.
    #[serde(rename = "last")]
    Last,
}

impl FromStr for CarryMode {
    type Err = TextmorphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::Reset),
            "all" => Ok(Self::All),
            "last" => Ok(Self::Last),
            _ => Err(TextmorphError::validation(format!(
                "unknown carry-over mode '{s}' (expected none, all or last)"
            ))),
        }
    }
}

impl fmt::Display for CarryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reset => "none",
            Self::All => "all",
            Self::Last => "last",
        })
    }
}

/// Settings for the per-phrase optimizer loop.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PhraseConfig {
    pub size: Resolution,
    pub steps: u32,
    /// Views per step after variant scaling.
    pub samples: usize,
    pub lrate: f32,
    pub noise: f32,
    pub contrast: f32,
    pub fstep: u32,
    pub overscan: bool,
}

/// Full configuration of one run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub in_txt: PathBuf,
    pub out_dir: PathBuf,
    pub size: Resolution,
    /// Snapshot used instead of a random phrase-0 initialization.
    pub resume: Option<PathBuf>,
    /// Total length of the final video in seconds.
    pub length: u32,
    pub fstep: u32,
    pub translate: bool,
    pub target_lang: String,
    /// Phrase whose similarity is subtracted from the loss.
    pub anti_text: Option<String>,
    /// Keep the scratch checkpoint after the run.
    pub save_checkpoints: bool,
    pub fps: u32,
    pub verbose: bool,
    pub model: ModelVariant,
    pub steps: u32,
    pub samples: usize,
    pub lrate: f32,
    pub overscan: bool,
    pub keep: CarryMode,
    pub contrast: f32,
    pub noise: f32,
    pub seed: Option<u64>,
    pub ease: Ease,
    pub skip_video: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            in_txt: PathBuf::new(),
            out_dir: PathBuf::from("_out"),
            size: Resolution {
                width: 1280,
                height: 720,
            },
            resume: None,
            length: 180,
            fstep: 1,
            translate: false,
            target_lang: "en".to_string(),
            anti_text: None,
            save_checkpoints: false,
            fps: 25,
            verbose: true,
            model: ModelVariant::default(),
            steps: 200,
            samples: 200,
            lrate: 0.05,
            overscan: false,
            keep: CarryMode::default(),
            contrast: 1.0,
            noise: 0.02,
            seed: None,
            ease: Ease::default(),
            skip_video: false,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> TextmorphResult<()> {
        if self.size.width == 0 || self.size.height == 0 {
            return Err(TextmorphError::validation("size must be non-zero"));
        }
        for (name, v) in [
            ("steps", self.steps),
            ("fstep", self.fstep),
            ("fps", self.fps),
            ("length", self.length),
        ] {
            if v == 0 {
                return Err(TextmorphError::validation(format!("{name} must be > 0")));
            }
        }
        if self.samples == 0 {
            return Err(TextmorphError::validation("samples must be > 0"));
        }
        if !(self.lrate > 0.0) || !self.lrate.is_finite() {
            return Err(TextmorphError::validation(
                "learning rate must be positive and finite",
            ));
        }
        if !self.noise.is_finite() || self.noise < 0.0 {
            return Err(TextmorphError::validation("noise must be >= 0"));
        }
        if !self.contrast.is_finite() {
            return Err(TextmorphError::validation("contrast must be finite"));
        }
        if self.anti_text.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(TextmorphError::validation("anti-target text is empty"));
        }
        Ok(())
    }

    /// Run-level work directory: `<out_dir>/<input stem>[-<variant>]`.
    pub fn work_dir(&self) -> PathBuf {
        let mut name = input_basename(&self.in_txt);
        if let Some(suffix) = self.model.output_suffix() {
            name.push('-');
            name.push_str(suffix);
        }
        self.out_dir.join(name)
    }

    /// Path of the final interpolation video: `<out_dir>/<input stem>.mp4`.
    pub fn final_video_path(&self) -> PathBuf {
        self.out_dir
            .join(format!("{}.mp4", input_basename(&self.in_txt)))
    }

    pub fn phrase_config(&self) -> PhraseConfig {
        PhraseConfig {
            size: self.size,
            steps: self.steps,
            samples: self.model.effective_samples(self.samples),
            lrate: self.lrate,
            noise: self.noise,
            contrast: self.contrast,
            fstep: self.fstep,
            overscan: self.overscan,
        }
    }

    /// Frames per transition: `round(length * fps / phrases)`.
    pub fn transition_frames(&self, phrases: usize) -> u64 {
        transition_frames(self.length, self.fps, phrases)
    }
}

/// `round(length * fps / phrases)`; zero when there are no phrases.
pub fn transition_frames(length: u32, fps: u32, phrases: usize) -> u64 {
    if phrases == 0 {
        return 0;
    }
    (f64::from(length) * f64::from(fps) / phrases as f64).round() as u64
}

fn input_basename(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "phrases".to_string())
}

#[cfg(test)]
#[path = "../../tests/unit/synth/config.rs"]
mod tests;
