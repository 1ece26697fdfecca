//! Textmorph turns a file of text phrases into a looping video.
//!
//! Each phrase drives one gradient search over differentiable image parameters
//! towards its text embedding. Phrase results are chained through a carry-over
//! policy, and the final video eases between the per-phrase snapshots:
//!
//! - Describe a run with a [`RunConfig`]
//! - Drive it with a [`Pipeline`] over a [`SynthBackend`]
//! - Re-render the transition video later with [`interpolate_from_manifest`]
#![forbid(unsafe_code)]

mod foundation;

pub(crate) mod animation;
/// Reference CPU backend.
pub mod backend;
pub(crate) mod checkpoint;
/// Frame export and video muxing.
pub mod encode;
/// Generator, encoder and translation seams.
pub mod model;
pub(crate) mod objective;
pub(crate) mod params;
pub(crate) mod synth;

pub use crate::foundation::core::{FrameIndex, Resolution, RgbFrame};
pub use crate::foundation::error::{TextmorphError, TextmorphResult};

pub use crate::animation::ease::Ease;
pub use crate::backend::reference::ReferenceBackend;
pub use crate::backend::spectral::SpectralGenerator;
pub use crate::checkpoint::store::{CheckpointStore, clean_phrase, load_params, save_params};
pub use crate::encode::ffmpeg::{FfmpegMuxer, MuxJob, NullMuxer, VideoMuxer, is_ffmpeg_on_path};
pub use crate::encode::frames::FrameDir;
pub use crate::model::encoder::{
    ImageGenerator, SynthBackend, TextEncoder, ViewEncoder, ViewRequest,
};
pub use crate::model::translate::{CommandTranslator, NoopTranslator, Translator};
pub use crate::model::variant::ModelVariant;
pub use crate::objective::similarity::{Embedding, SimilarityObjective};
pub use crate::params::tensor::{ImageParams, NoiseField};
pub use crate::synth::carry::CarryOver;
pub use crate::synth::config::{CarryMode, PhraseConfig, RunConfig};
pub use crate::synth::interpolate::InterpolationRenderer;
pub use crate::synth::optimizer::{PhraseOptimizer, PhraseOutcome};
pub use crate::synth::sequence::{
    Manifest, PhraseArtifact, Pipeline, RunSummary, interpolate_from_manifest, parse_phrases,
    read_phrases,
};
