//! Low-frequency cosine-spectrum image parameterization.
//!
//! Parameters are `[1, 3, kh, kw, 1]` coefficients per colour channel. A pixel at
//! continuous position `(y, x)` is `sigmoid(contrast * z)` with
//! `z = sum_uv s(u, v) * (P[c, u, v] + n[u, v]) * cos(pi*y*u/H) * cos(pi*x*v/W)`
//! and `s(u, v) = 1 / max(1, |(u, v)|)^decay`.

use crate::foundation::core::Resolution;
use crate::foundation::error::{TextmorphError, TextmorphResult};
use crate::model::encoder::ImageGenerator;
use crate::params::tensor::{ImageParams, NoiseField};
use candle_core::{Device, Tensor};
use std::f32::consts::PI;

pub(crate) const CHANNELS: usize = 3;

#[derive(Clone, Debug, PartialEq)]
pub struct SpectralGenerator {
    bands: usize,
    decay: f32,
    init_std: f32,
}

impl Default for SpectralGenerator {
    fn default() -> Self {
        Self {
            bands: 32,
            decay: 1.0,
            init_std: 0.01,
        }
    }
}

impl SpectralGenerator {
    pub fn new(bands: usize, decay: f32, init_std: f32) -> TextmorphResult<Self> {
        if bands == 0 {
            return Err(TextmorphError::validation("spectral bands must be non-zero"));
        }
        if !decay.is_finite() || decay < 0.0 || !init_std.is_finite() || init_std < 0.0 {
            return Err(TextmorphError::validation(
                "spectral decay/init_std must be finite and non-negative",
            ));
        }
        Ok(Self {
            bands,
            decay,
            init_std,
        })
    }

    pub(crate) fn dims(&self, res: Resolution) -> (usize, usize) {
        (
            self.bands.min(res.height as usize),
            self.bands.min(res.width as usize),
        )
    }

    fn scales(&self, kh: usize, kw: usize, device: &Device) -> TextmorphResult<Tensor> {
        let mut out = Vec::with_capacity(kh * kw);
        for u in 0..kh {
            for v in 0..kw {
                let f = ((u * u + v * v) as f32).sqrt().max(1.0);
                out.push(1.0 / f.powf(self.decay));
            }
        }
        Ok(Tensor::from_vec(out, (kh, kw), device)?)
    }

    /// Effective coefficients `s * (P + n)` as a `(3, kh, kw)` tensor.
    pub(crate) fn coefficients(
        &self,
        params: &Tensor,
        res: Resolution,
        noise: Option<&NoiseField>,
    ) -> TextmorphResult<Tensor> {
        let (kh, kw) = self.dims(res);
        let expected = self.param_shape(res);
        if params.dims() != expected.as_slice() {
            return Err(TextmorphError::validation(format!(
                "spectral params shape {:?} does not match {:?} for {res}",
                params.dims(),
                expected
            )));
        }
        let planes = params.reshape((CHANNELS, kh, kw))?;
        let planes = match noise {
            Some(n) if n.rows != kh || n.cols != kw => {
                return Err(TextmorphError::validation(format!(
                    "noise field {}x{} does not match spectrum {kh}x{kw}",
                    n.rows, n.cols
                )));
            }
            Some(n) => planes.broadcast_add(n.tensor())?,
            None => planes,
        };
        let scales = self.scales(kh, kw, params.device())?;
        Ok(planes.broadcast_mul(&scales)?)
    }
}

/// Cosine basis `cos(pi * p * f / extent)` at every coordinate, laid out `[p][f]`.
pub(crate) fn basis_values(coords: &[f32], k: usize, extent: f32) -> Vec<f32> {
    let mut out = Vec::with_capacity(coords.len() * k);
    for &p in coords {
        for f in 0..k {
            out.push((PI * p * f as f32 / extent).cos());
        }
    }
    out
}

/// Pre-sigmoid values for a batch of sampling grids.
///
/// `rows` is `(n, r, kh)` and `cols` is `(n, c, kw)` basis samples; the result is
/// `(n, r, 3, c)`.
pub(crate) fn synthesize(coeffs: &Tensor, rows: &Tensor, cols: &Tensor) -> TextmorphResult<Tensor> {
    let (n, r, kh) = rows.dims3()?;
    let (_, c, kw) = cols.dims3()?;
    // [u][c][v] so one matmul covers every channel.
    let flat = coeffs
        .transpose(0, 1)?
        .contiguous()?
        .reshape((kh, CHANNELS * kw))?;
    let partial = rows
        .reshape((n * r, kh))?
        .matmul(&flat)?
        .reshape((n, r * CHANNELS, kw))?;
    let z = partial.matmul(&cols.transpose(1, 2)?.contiguous()?)?;
    Ok(z.reshape((n, r, CHANNELS, c))?)
}

impl ImageGenerator for SpectralGenerator {
    fn param_shape(&self, res: Resolution) -> Vec<usize> {
        let (kh, kw) = self.dims(res);
        vec![1, CHANNELS, kh, kw, 1]
    }

    fn random_params(
        &self,
        res: Resolution,
        rng: &mut dyn rand::RngCore,
    ) -> TextmorphResult<ImageParams> {
        use rand::Rng as _;

        let shape = self.param_shape(res);
        let n = shape.iter().product::<usize>();
        let data = (0..n)
            .map(|_| self.init_std * rng.sample::<f32, _>(rand_distr::StandardNormal))
            .collect();
        ImageParams::new(shape, data)
    }

    fn image(
        &self,
        params: &Tensor,
        res: Resolution,
        noise: Option<&NoiseField>,
        contrast: f32,
    ) -> TextmorphResult<Tensor> {
        let coeffs = self.coefficients(params, res, noise)?;
        let (kh, kw) = self.dims(res);
        let (w, h) = (res.width as usize, res.height as usize);
        let device = params.device();

        let ys: Vec<f32> = (0..h).map(|y| y as f32 + 0.5).collect();
        let xs: Vec<f32> = (0..w).map(|x| x as f32 + 0.5).collect();
        let rows = Tensor::from_vec(basis_values(&ys, kh, h as f32), (1, h, kh), device)?;
        let cols = Tensor::from_vec(basis_values(&xs, kw, w as f32), (1, w, kw), device)?;

        let z = synthesize(&coeffs, &rows, &cols)?
            .reshape((h, CHANNELS, w))?
            .permute((0, 2, 1))?
            .contiguous()?
            .affine(f64::from(contrast), 0.0)?;
        Ok(candle_nn::ops::sigmoid(&z)?)
    }
}
