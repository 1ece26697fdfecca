//! Small deterministic backend for exercising the synthesis loop.

use crate::foundation::core::Resolution;
use crate::foundation::error::{TextmorphError, TextmorphResult};
use crate::model::encoder::{ImageGenerator, TextEncoder, ViewEncoder, ViewRequest};
use crate::objective::similarity::Embedding;
use crate::params::tensor::{ImageParams, NoiseField};
use candle_core::Tensor;
use std::path::PathBuf;

pub const DIM: usize = 4;

/// Views embed the raw parameter vector (plus mean noise); text maps to a basis vector.
#[derive(Debug, Default)]
pub struct FakeBackend {
    pub forwards: usize,
    pub reclaims: usize,
    pub encoded: Vec<String>,
    pub live_forward: bool,
    pub fail_forward_at: Option<usize>,
    pub last_noise: Option<NoiseField>,
    /// Parameters seen by the first forward pass after each text encoding.
    pub starts: Vec<ImageParams>,
    pub mark_start: bool,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ImageGenerator for FakeBackend {
    fn param_shape(&self, _res: Resolution) -> Vec<usize> {
        vec![1, 1, 1, DIM, 1]
    }

    fn random_params(
        &self,
        res: Resolution,
        rng: &mut dyn rand::RngCore,
    ) -> TextmorphResult<ImageParams> {
        use rand::Rng as _;
        let data = (0..DIM).map(|_| rng.gen_range(-0.1f32..0.1)).collect();
        ImageParams::new(self.param_shape(res), data)
    }

    fn image(
        &self,
        params: &Tensor,
        res: Resolution,
        _noise: Option<&NoiseField>,
        contrast: f32,
    ) -> TextmorphResult<Tensor> {
        let level = params
            .flatten_all()?
            .narrow(0, 0, 1)?
            .affine(0.1 * f64::from(contrast), 0.5)?;
        let shape = (res.height as usize, res.width as usize, 3);
        Ok(level.reshape((1, 1, 1))?.broadcast_as(shape)?.contiguous()?)
    }
}

impl ViewEncoder for FakeBackend {
    fn embed_views(
        &mut self,
        params: &Tensor,
        noise: Option<&NoiseField>,
        request: &ViewRequest,
        _rng: &mut dyn rand::RngCore,
    ) -> TextmorphResult<Tensor> {
        self.forwards += 1;
        self.live_forward = true;
        if self.fail_forward_at == Some(self.forwards - 1) {
            return Err(TextmorphError::encoder("device lost"));
        }
        self.last_noise = noise.cloned();
        if std::mem::take(&mut self.mark_start) {
            self.starts.push(ImageParams::from_tensor(params)?);
        }
        let mut row = params.flatten_all()?;
        if let Some(n) = noise {
            row = row.broadcast_add(&n.tensor().mean_all()?)?;
        }
        let rows = vec![row.unsqueeze(0)?; request.samples];
        Ok(Tensor::cat(&rows, 0)?)
    }

    fn reclaim(&mut self) {
        self.reclaims += 1;
        self.live_forward = false;
    }
}

impl TextEncoder for FakeBackend {
    fn encode_text(&mut self, text: &str) -> TextmorphResult<Embedding> {
        self.encoded.push(text.to_string());
        self.mark_start = true;
        let slot = text.len() % DIM;
        let mut v = vec![0.0; DIM];
        v[slot] = 1.0;
        Ok(Embedding(v))
    }
}

/// Fresh directory under `target/` for one test.
pub fn test_dir(group: &str, name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join(group).join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
