use crate::animation::ease::Ease;
use crate::checkpoint::store::CheckpointStore;
use crate::encode::ffmpeg::{MuxJob, VideoMuxer};
use crate::encode::frames::{FINAL_FRAME_DIGITS, FrameDir, PHRASE_FRAME_DIGITS};
use crate::foundation::core::Resolution;
use crate::foundation::error::{TextmorphError, TextmorphResult};
use crate::model::encoder::{ImageGenerator, SynthBackend};
use crate::model::translate::Translator;
use crate::objective::similarity::Embedding;
use crate::synth::carry::CarryOver;
use crate::synth::config::{RunConfig, transition_frames};
use crate::synth::interpolate::InterpolationRenderer;
use crate::synth::optimizer::PhraseOptimizer;
use anyhow::Context as _;
use rand::SeedableRng as _;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write as _};
use std::path::{Path, PathBuf};

/// Effective configuration written into every work directory.
pub const RUN_CONFIG_FILE: &str = "run.json";
/// Phrase artifact listing consumed by the `interpolate` command.
pub const MANIFEST_FILE: &str = "manifest.json";
/// Subdirectory holding the globally numbered interpolation frames.
pub const FINAL_DIR: &str = "_final";

/// Non-empty lines of a phrase file, trimmed, in file order.
///
/// A line is a comment only when `#` is its very first character.
pub fn parse_phrases(text: &str) -> Vec<String> {
    text.lines()
        .filter(|l| !l.starts_with('#'))
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn read_phrases(path: &Path) -> TextmorphResult<Vec<String>> {
    if !path.is_file() {
        return Err(TextmorphError::validation(format!(
            "phrase file '{}' does not exist",
            path.display()
        )));
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read phrase file '{}'", path.display()))?;
    Ok(parse_phrases(&text))
}

/// Everything one finished phrase left on disk.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PhraseArtifact {
    pub index: usize,
    pub text: String,
    pub name: String,
    pub snapshot: PathBuf,
    pub poster: Option<PathBuf>,
    pub video: PathBuf,
}

/// What the final interpolation stage needs to (re)render a run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Manifest {
    pub size: Resolution,
    pub length: u32,
    pub fps: u32,
    #[serde(default)]
    pub ease: Ease,
    pub final_video: PathBuf,
    pub phrases: Vec<PhraseArtifact>,
}

impl Manifest {
    pub fn load(path: &Path) -> TextmorphResult<Self> {
        let f = File::open(path).with_context(|| format!("open manifest '{}'", path.display()))?;
        serde_json::from_reader(BufReader::new(f))
            .map_err(|e| TextmorphError::serde(format!("parse '{}': {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> TextmorphResult<()> {
        write_json(path, self)
    }

    pub fn transition_frames(&self) -> u64 {
        transition_frames(self.length, self.fps, self.phrases.len())
    }

    pub fn snapshots(&self) -> Vec<PathBuf> {
        self.phrases.iter().map(|p| p.snapshot.clone()).collect()
    }
}

/// Outcome of a full run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub work_dir: PathBuf,
    pub phrases: Vec<PhraseArtifact>,
    pub final_frames: u64,
    pub final_video: PathBuf,
}

/// Drives the phrases of one input file through optimization, carry-over and
/// the final interpolation.
pub struct Pipeline<'a> {
    cfg: &'a RunConfig,
    backend: &'a mut dyn SynthBackend,
    translator: &'a dyn Translator,
    muxer: &'a dyn VideoMuxer,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        cfg: &'a RunConfig,
        backend: &'a mut dyn SynthBackend,
        translator: &'a dyn Translator,
        muxer: &'a dyn VideoMuxer,
    ) -> Self {
        Self {
            cfg,
            backend,
            translator,
            muxer,
        }
    }

    #[tracing::instrument(skip_all, fields(input = %self.cfg.in_txt.display()))]
    pub fn run(&mut self) -> TextmorphResult<RunSummary> {
        let cfg = self.cfg;
        cfg.validate()?;
        let phrases = read_phrases(&cfg.in_txt)?;
        if phrases.is_empty() {
            return Err(TextmorphError::validation(format!(
                "no phrases in '{}'",
                cfg.in_txt.display()
            )));
        }
        // Fail before any phrase is optimized, not after.
        if cfg.transition_frames(phrases.len()) == 0 {
            return Err(TextmorphError::validation(format!(
                "{} phrases over {}s at {} fps leave zero frames per transition",
                phrases.len(),
                cfg.length,
                cfg.fps
            )));
        }

        let work_dir = cfg.work_dir();
        std::fs::create_dir_all(&work_dir)
            .with_context(|| format!("create work dir '{}'", work_dir.display()))?;
        write_json(&work_dir.join(RUN_CONFIG_FILE), cfg)?;
        tracing::info!(
            phrases = phrases.len(),
            work_dir = %work_dir.display(),
            model = %cfg.model,
            keep = %cfg.keep,
            "starting run"
        );

        let mut rng = match cfg.seed {
            Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
            None => rand::rngs::StdRng::from_entropy(),
        };
        let store = CheckpointStore::new(&work_dir);
        let translate_to = cfg.translate.then_some(cfg.target_lang.as_str());
        let anti = self.anti_target(translate_to)?;
        let phrase_cfg = cfg.phrase_config();

        let mut carry: Option<CarryOver> = None;
        let mut artifacts = Vec::with_capacity(phrases.len());
        for (index, text) in phrases.iter().enumerate() {
            let resume = if index == 0 { cfg.resume.as_deref() } else { None };
            let outcome = PhraseOptimizer::new(&phrase_cfg, &store)
                .with_resume(resume)
                .with_translation(translate_to)
                .with_name_suffix(cfg.model.output_suffix())
                .with_anti_target(anti.as_ref())
                .run(text, index, &mut *self.backend, self.translator, &mut rng)?;

            let next = carry
                .get_or_insert_with(|| CarryOver::new(cfg.keep, outcome.initial.clone()))
                .after_phrase(index, &outcome.params)?;
            store.save_scratch(&next)?;

            let poster = match &outcome.last_frame {
                Some(frame) => {
                    let poster = work_dir.join(format!("{}-{}.jpg", outcome.name, cfg.steps));
                    std::fs::copy(frame, &poster)
                        .with_context(|| format!("copy poster to '{}'", poster.display()))?;
                    Some(poster)
                }
                None => None,
            };
            let snapshot = store.save_snapshot(&outcome.name, &outcome.params)?;
            let video = work_dir.join(format!("{}.mp4", outcome.name));
            self.muxer.mux(&MuxJob {
                frames_dir: outcome.frames_dir.clone(),
                digits: PHRASE_FRAME_DIGITS,
                fps: cfg.fps,
                out_path: video.clone(),
            });

            artifacts.push(PhraseArtifact {
                index,
                text: outcome.text,
                name: outcome.name,
                snapshot,
                poster,
                video,
            });
        }

        let manifest = Manifest {
            size: cfg.size,
            length: cfg.length,
            fps: cfg.fps,
            ease: cfg.ease,
            final_video: cfg.final_video_path(),
            phrases: artifacts,
        };
        manifest.save(&work_dir.join(MANIFEST_FILE))?;

        let final_frames = render_final(&manifest, &work_dir, &*self.backend, self.muxer)?;

        if !cfg.save_checkpoints {
            store.clear_scratch()?;
        }
        tracing::info!(final_frames, video = %manifest.final_video.display(), "run complete");

        Ok(RunSummary {
            work_dir,
            phrases: manifest.phrases,
            final_frames,
            final_video: manifest.final_video,
        })
    }

    /// Resolved once per run and shared by every phrase.
    fn anti_target(&mut self, translate_to: Option<&str>) -> TextmorphResult<Option<Embedding>> {
        let Some(text) = self.cfg.anti_text.as_deref().map(str::trim) else {
            return Ok(None);
        };
        let text = match translate_to {
            Some(lang) => self.translator.translate(text, lang)?.trim().to_string(),
            None => text.to_string(),
        };
        tracing::info!("anti-target: {text}");
        Ok(Some(self.backend.encode_text(&text)?))
    }
}

/// Render the looping transition video of `manifest` into `<work_dir>/_final`
/// and mux it. Returns the number of frames written.
pub fn render_final(
    manifest: &Manifest,
    work_dir: &Path,
    generator: &dyn ImageGenerator,
    muxer: &dyn VideoMuxer,
) -> TextmorphResult<u64> {
    let final_dir = work_dir.join(FINAL_DIR);
    if final_dir.exists() {
        std::fs::remove_dir_all(&final_dir)
            .with_context(|| format!("clear '{}'", final_dir.display()))?;
    }
    let mut frames = FrameDir::create(&final_dir, FINAL_FRAME_DIGITS)?;
    let steps = manifest.transition_frames();
    let written = InterpolationRenderer::new(generator, manifest.size, steps, manifest.ease)
        .render(&manifest.snapshots(), &mut frames)?;

    muxer.mux(&MuxJob {
        frames_dir: final_dir,
        digits: FINAL_FRAME_DIGITS,
        fps: manifest.fps,
        out_path: manifest.final_video.clone(),
    });
    Ok(written)
}

/// Re-render the final video of a finished run from its manifest.
pub fn interpolate_from_manifest(
    work_dir: &Path,
    generator: &dyn ImageGenerator,
    muxer: &dyn VideoMuxer,
    adjust: impl FnOnce(&mut Manifest),
) -> TextmorphResult<u64> {
    let mut manifest = Manifest::load(&work_dir.join(MANIFEST_FILE))?;
    adjust(&mut manifest);
    if manifest.fps == 0 || manifest.length == 0 {
        return Err(TextmorphError::validation("fps and length must be > 0"));
    }
    manifest.size = Resolution::new(manifest.size.width, manifest.size.height)?;
    render_final(&manifest, work_dir, generator, muxer)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> TextmorphResult<()> {
    let f = File::create(path).with_context(|| format!("create '{}'", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, value)
        .map_err(|e| TextmorphError::serde(format!("write '{}': {e}", path.display())))?;
    w.flush()
        .with_context(|| format!("flush '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/synth/sequence.rs"]
mod tests;
