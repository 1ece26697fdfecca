//! Cosine-similarity objective between text references and image-view embeddings.
//!
//! `loss = -mean(cos(t, e_i)) + mean(cos(t0, e_i))`, the second term only when an
//! anti-target `t0` is configured. The loss is built from tensor ops on the view
//! batch, so calling `backward` on it reaches the image parameters.

use crate::foundation::error::{TextmorphError, TextmorphResult};
use candle_core::{Device, Tensor};

const NORM_EPS: f32 = 1e-8;

/// Fixed-length embedding vector in the shared text/image space.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn norm(&self) -> f32 {
        self.0.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Unit-length `(dim, 1)` column on `device`.
    fn unit_column(&self, device: &Device) -> TextmorphResult<Tensor> {
        let t = Tensor::from_vec(self.0.clone(), (self.dim(), 1), device)?;
        Ok(t.affine(f64::from(1.0 / self.norm()), 0.0)?)
    }
}

/// Reference embeddings for one phrase.
#[derive(Clone, Debug)]
pub struct SimilarityObjective {
    dim: usize,
    target: Tensor,
    anti_target: Option<Tensor>,
}

impl SimilarityObjective {
    pub fn new(
        target: &Embedding,
        anti_target: Option<&Embedding>,
        device: &Device,
    ) -> TextmorphResult<Self> {
        if target.norm() == 0.0 {
            return Err(TextmorphError::objective("target embedding has zero norm"));
        }
        let anti_target = match anti_target {
            Some(anti) => {
                if anti.dim() != target.dim() {
                    return Err(TextmorphError::objective(format!(
                        "anti-target dim {} != target dim {}",
                        anti.dim(),
                        target.dim()
                    )));
                }
                if anti.norm() == 0.0 {
                    return Err(TextmorphError::objective(
                        "anti-target embedding has zero norm",
                    ));
                }
                Some(anti.unit_column(device)?)
            }
            None => None,
        };
        Ok(Self {
            dim: target.dim(),
            target: target.unit_column(device)?,
            anti_target,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Scalar loss over a `(views, dim)` embedding batch.
    pub fn loss(&self, views: &Tensor) -> TextmorphResult<Tensor> {
        let (n, d) = views.dims2().map_err(|_| {
            TextmorphError::objective(format!(
                "view embeddings must be (views, dim), got {:?}",
                views.dims()
            ))
        })?;
        if n == 0 {
            return Err(TextmorphError::objective("no view embeddings to score"));
        }
        if d != self.dim {
            return Err(TextmorphError::objective(format!(
                "view dim {d} != target dim {}",
                self.dim
            )));
        }

        let unit = unit_rows(views)?;
        let mut loss = unit.matmul(&self.target)?.mean_all()?.neg()?;
        if let Some(anti) = &self.anti_target {
            loss = (&loss + &unit.matmul(anti)?.mean_all()?)?;
        }
        Ok(loss)
    }
}

fn unit_rows(views: &Tensor) -> TextmorphResult<Tensor> {
    let norms = views.sqr()?.sum_keepdim(1)?.sqrt()?.maximum(NORM_EPS)?;
    Ok(views.broadcast_div(&norms)?)
}

#[cfg(test)]
#[path = "../../tests/unit/objective/similarity.rs"]
mod tests;
