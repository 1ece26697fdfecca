//! Seams to the image generator and the frozen vision-language encoder.
//!
//! The synthesis loop only talks to these traits. Everything that depends on the
//! image parameters is built from tensor ops on the tensor it is handed, so
//! autodiff reaches the parameters from the loss. [`ViewEncoder::reclaim`] is
//! called after every optimizer step and must drop whatever the last forward pass
//! kept alive.

use crate::foundation::core::{Resolution, RgbFrame};
use crate::foundation::error::TextmorphResult;
use crate::objective::similarity::Embedding;
use crate::params::tensor::{ImageParams, NoiseField};
use candle_core::Tensor;

/// Differentiable image parameterization.
pub trait ImageGenerator {
    /// Parameter shape for images of `res`.
    fn param_shape(&self, res: Resolution) -> Vec<usize>;

    /// Fresh random parameters for images of `res`.
    fn random_params(
        &self,
        res: Resolution,
        rng: &mut dyn rand::RngCore,
    ) -> TextmorphResult<ImageParams>;

    /// `(height, width, 3)` image in `[0, 1]` for `params` (plus optional noise).
    fn image(
        &self,
        params: &Tensor,
        res: Resolution,
        noise: Option<&NoiseField>,
        contrast: f32,
    ) -> TextmorphResult<Tensor>;

    /// Render `params` to a displayable frame.
    fn render(
        &self,
        params: &Tensor,
        res: Resolution,
        noise: Option<&NoiseField>,
        contrast: f32,
    ) -> TextmorphResult<RgbFrame> {
        let image = self.image(params, res, noise, contrast)?;
        let data = image.contiguous()?.flatten_all()?.to_vec1::<f32>()?;
        RgbFrame::new(res.width, res.height, data)
    }
}

/// How many augmented views to draw per step and how.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewRequest {
    pub resolution: Resolution,
    pub samples: usize,
    /// Allow crops to extend past the frame edge (seamless tiling).
    pub overscan: bool,
}

/// Render -> augment -> encode.
pub trait ViewEncoder {
    /// Draw `request.samples` augmented views of the image and embed them as a
    /// `(samples, dim)` tensor that stays connected to `params`.
    fn embed_views(
        &mut self,
        params: &Tensor,
        noise: Option<&NoiseField>,
        request: &ViewRequest,
        rng: &mut dyn rand::RngCore,
    ) -> TextmorphResult<Tensor>;

    /// Release intermediate tensors held since the last forward pass.
    fn reclaim(&mut self);
}

/// Text side of the shared embedding space.
pub trait TextEncoder {
    fn encode_text(&mut self, text: &str) -> TextmorphResult<Embedding>;
}

/// Everything the synthesis loop needs from a model backend.
pub trait SynthBackend: ImageGenerator + ViewEncoder + TextEncoder {}

impl<T: ImageGenerator + ViewEncoder + TextEncoder> SynthBackend for T {}
