//! Deterministic CPU backend: spectral generator, random-crop augmentation and a
//! fixed random-projection encoder.
//!
//! It exists so the pipeline runs end to end without an accelerator-resident
//! vision-language model. Text and views land in the same space because both
//! sides are seeded from the model variant name.

use crate::backend::spectral::{CHANNELS, SpectralGenerator, basis_values, synthesize};
use crate::foundation::core::Resolution;
use crate::foundation::error::{TextmorphError, TextmorphResult};
use crate::model::encoder::{ImageGenerator, TextEncoder, ViewEncoder, ViewRequest};
use crate::model::variant::ModelVariant;
use crate::objective::similarity::Embedding;
use crate::params::tensor::{ImageParams, NoiseField};
use candle_core::{Device, Tensor};
use rand::{Rng as _, SeedableRng as _};
use rayon::prelude::*;

/// Dimension of the shared embedding space.
pub const EMBED_DIM: usize = 64;
/// Encoder input pixels per view grid point.
const PATCH: u32 = 14;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Crop {
    y0: f32,
    x0: f32,
    side: f32,
}

/// Tensors kept alive by the last forward pass.
#[derive(Debug)]
struct ForwardCache {
    pixels: Tensor,
}

pub struct ReferenceBackend {
    variant: ModelVariant,
    generator: SpectralGenerator,
    grid: usize,
    /// `(3 * grid^2, EMBED_DIM)`.
    projection: Tensor,
    seed: u64,
    cache: Option<ForwardCache>,
}

impl ReferenceBackend {
    pub fn new(variant: ModelVariant) -> TextmorphResult<Self> {
        let grid = (variant.input_size() / PATCH) as usize;
        Self::with_parts(variant, SpectralGenerator::default(), grid)
    }

    /// Build with an explicit generator and view grid (points per side).
    pub fn with_parts(
        variant: ModelVariant,
        generator: SpectralGenerator,
        grid: usize,
    ) -> TextmorphResult<Self> {
        let grid = grid.max(1);
        let seed = xxhash_rust::xxh3::xxh3_64(variant.name().as_bytes());
        let inputs = CHANNELS * grid * grid;
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let std = 1.0 / (inputs as f32).sqrt();
        let weights: Vec<f32> = (0..inputs * EMBED_DIM)
            .map(|_| std * rng.sample::<f32, _>(rand_distr::StandardNormal))
            .collect();
        let projection = Tensor::from_vec(weights, (inputs, EMBED_DIM), &Device::Cpu)?;
        Ok(Self {
            variant,
            generator,
            grid,
            projection,
            seed,
            cache: None,
        })
    }

    pub fn variant(&self) -> ModelVariant {
        self.variant
    }

    pub fn has_cached_forward(&self) -> bool {
        self.cache.is_some()
    }

    /// Number of views whose pixels the last forward pass still holds.
    pub fn cached_views(&self) -> Option<usize> {
        self.cache.as_ref().map(|c| c.pixels.dims()[0])
    }

    fn sample_crop(&self, res: Resolution, overscan: bool, rng: &mut dyn rand::RngCore) -> Crop {
        let min_side = res.min_side() as f32;
        let side = rng.gen_range(0.5 * min_side..=min_side);
        let (h, w) = (res.height as f32, res.width as f32);
        let (y0, x0) = if overscan {
            (
                rng.gen_range(-0.5 * side..=h - 0.5 * side),
                rng.gen_range(-0.5 * side..=w - 0.5 * side),
            )
        } else {
            (rng.gen_range(0.0..=h - side), rng.gen_range(0.0..=w - side))
        };
        Crop { y0, x0, side }
    }

    fn crop_coords(&self, start: f32, side: f32) -> Vec<f32> {
        let step = side / self.grid as f32;
        (0..self.grid)
            .map(|j| start + (j as f32 + 0.5) * step)
            .collect()
    }

    /// `(views, grid, k)` basis samples along one axis of every crop.
    fn crop_basis(
        &self,
        crops: &[Crop],
        k: usize,
        extent: f32,
        start: impl Fn(&Crop) -> f32 + Sync,
        device: &Device,
    ) -> TextmorphResult<Tensor> {
        let values: Vec<f32> = crops
            .par_iter()
            .flat_map_iter(|c| basis_values(&self.crop_coords(start(c), c.side), k, extent))
            .collect();
        Ok(Tensor::from_vec(values, (crops.len(), self.grid, k), device)?)
    }
}

impl ImageGenerator for ReferenceBackend {
    fn param_shape(&self, res: Resolution) -> Vec<usize> {
        self.generator.param_shape(res)
    }

    fn random_params(
        &self,
        res: Resolution,
        rng: &mut dyn rand::RngCore,
    ) -> TextmorphResult<ImageParams> {
        self.generator.random_params(res, rng)
    }

    fn image(
        &self,
        params: &Tensor,
        res: Resolution,
        noise: Option<&NoiseField>,
        contrast: f32,
    ) -> TextmorphResult<Tensor> {
        self.generator.image(params, res, noise, contrast)
    }
}

impl ViewEncoder for ReferenceBackend {
    fn embed_views(
        &mut self,
        params: &Tensor,
        noise: Option<&NoiseField>,
        request: &ViewRequest,
        rng: &mut dyn rand::RngCore,
    ) -> TextmorphResult<Tensor> {
        if request.samples == 0 {
            return Err(TextmorphError::validation("view request needs samples > 0"));
        }
        let res = request.resolution;
        let coeffs = self.generator.coefficients(params, res, noise)?;
        let (kh, kw) = self.generator.dims(res);
        let crops: Vec<Crop> = (0..request.samples)
            .map(|_| self.sample_crop(res, request.overscan, rng))
            .collect();

        let device = params.device();
        let rows = self.crop_basis(&crops, kh, res.height as f32, |c| c.y0, device)?;
        let cols = self.crop_basis(&crops, kw, res.width as f32, |c| c.x0, device)?;
        let z = synthesize(&coeffs, &rows, &cols)?;
        let pixels = candle_nn::ops::sigmoid(&z)?.flatten_from(1)?;
        let embeddings = (&pixels - 0.5)?.matmul(&self.projection)?;
        tracing::trace!(views = crops.len(), %res, "reference forward");

        self.cache = Some(ForwardCache { pixels });
        Ok(embeddings)
    }

    fn reclaim(&mut self) {
        self.cache = None;
    }
}

impl TextEncoder for ReferenceBackend {
    fn encode_text(&mut self, text: &str) -> TextmorphResult<Embedding> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TextmorphError::encoder("cannot encode empty text"));
        }
        let lower = text.to_lowercase();
        let mut tokens: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        // Punctuation-only text still gets a stable embedding of its own.
        if tokens.is_empty() {
            tokens.push(lower.as_str());
        }

        let mut out = vec![0.0f32; EMBED_DIM];
        for token in tokens {
            let seed = xxhash_rust::xxh3::xxh3_64(token.as_bytes()) ^ self.seed;
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            for o in out.iter_mut() {
                *o += rng.sample::<f32, _>(rand_distr::StandardNormal);
            }
        }
        Ok(Embedding(out))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/reference.rs"]
mod tests;
