use crate::foundation::error::{TextmorphError, TextmorphResult};
use candle_core::{DType, Device, Tensor};

/// Image parameters held as a CPU `f32` tensor.
///
/// Generators in this crate use 5-D shapes `[1, 3, a, b, c]`; only axes 2 and 3
/// carry spatial/frequency structure. Snapshots serialize as `{shape, data}`
/// with `data` in row-major order.
#[derive(Clone, Debug)]
pub struct ImageParams {
    tensor: Tensor,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct ParamsFile {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl ImageParams {
    /// Build a tensor, checking that `data` matches `shape`.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> TextmorphResult<Self> {
        let expected = shape.iter().product::<usize>();
        if shape.is_empty() || data.len() != expected {
            return Err(TextmorphError::validation(format!(
                "tensor data has {} values, shape {:?} needs {}",
                data.len(),
                shape,
                expected
            )));
        }
        let tensor = Tensor::from_vec(data, shape, &Device::Cpu)?;
        Ok(Self { tensor })
    }

    /// Detached copy of `tensor`; the result shares no storage or graph with it.
    pub fn from_tensor(tensor: &Tensor) -> TextmorphResult<Self> {
        let shape = tensor.dims().to_vec();
        let data = tensor
            .to_dtype(DType::F32)?
            .flatten_all()?
            .to_vec1::<f32>()?;
        Self::new(shape, data)
    }

    pub fn zeros(shape: Vec<usize>) -> TextmorphResult<Self> {
        let n = shape.iter().product::<usize>();
        Self::new(shape, vec![0.0; n])
    }

    pub fn shape(&self) -> &[usize] {
        self.tensor.dims()
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    /// Values in row-major order.
    pub fn to_vec(&self) -> TextmorphResult<Vec<f32>> {
        Ok(self.tensor.flatten_all()?.to_vec1::<f32>()?)
    }

    pub fn len(&self) -> usize {
        self.tensor.elem_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the two interior axes `(shape[2], shape[3])` that noise is applied along.
    pub fn interior_dims(&self) -> TextmorphResult<(usize, usize)> {
        interior_dims(self.shape())
    }

    pub fn ensure_same_shape(&self, other: &Self) -> TextmorphResult<()> {
        if self.shape() != other.shape() {
            return Err(TextmorphError::validation(format!(
                "tensor shape mismatch: {:?} vs {:?}",
                self.shape(),
                other.shape()
            )));
        }
        Ok(())
    }

    /// `self + other * k`.
    pub fn add_scaled(&self, other: &Self, k: f32) -> TextmorphResult<Self> {
        self.ensure_same_shape(other)?;
        let scaled = other.tensor.affine(f64::from(k), 0.0)?;
        Ok(Self {
            tensor: (&self.tensor + &scaled)?,
        })
    }

    /// `self - other`.
    pub fn sub(&self, other: &Self) -> TextmorphResult<Self> {
        self.ensure_same_shape(other)?;
        Ok(Self {
            tensor: (&self.tensor - &other.tensor)?,
        })
    }

    /// `self * a + other * b`.
    pub fn blend(&self, a: f32, other: &Self, b: f32) -> TextmorphResult<Self> {
        self.ensure_same_shape(other)?;
        let lhs = self.tensor.affine(f64::from(a), 0.0)?;
        let rhs = other.tensor.affine(f64::from(b), 0.0)?;
        Ok(Self {
            tensor: (&lhs + &rhs)?,
        })
    }

    pub fn is_finite(&self) -> TextmorphResult<bool> {
        all_finite(&self.tensor)
    }
}

impl PartialEq for ImageParams {
    fn eq(&self, other: &Self) -> bool {
        self.shape() == other.shape()
            && matches!((self.to_vec(), other.to_vec()), (Ok(a), Ok(b)) if a == b)
    }
}

impl serde::Serialize for ImageParams {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let data = self.to_vec().map_err(serde::ser::Error::custom)?;
        let file = ParamsFile {
            shape: self.shape().to_vec(),
            data,
        };
        serde::Serialize::serialize(&file, serializer)
    }
}

impl<'de> serde::Deserialize<'de> for ImageParams {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let file = <ParamsFile as serde::Deserialize>::deserialize(deserializer)?;
        Self::new(file.shape, file.data).map_err(serde::de::Error::custom)
    }
}

/// Whether every element of an `f32` tensor is finite.
pub(crate) fn all_finite(tensor: &Tensor) -> TextmorphResult<bool> {
    let values = tensor.flatten_all()?.to_vec1::<f32>()?;
    Ok(values.iter().all(|v| v.is_finite()))
}

pub(crate) fn interior_dims(shape: &[usize]) -> TextmorphResult<(usize, usize)> {
    if shape.len() < 4 {
        return Err(TextmorphError::validation(format!(
            "tensor of shape {shape:?} has no interior axes"
        )));
    }
    Ok((shape[2], shape[3]))
}

/// Additive noise over the two interior axes of a parameter tensor.
///
/// Stored as a `(rows, cols)` tensor and broadcast over every other axis when applied.
#[derive(Clone, Debug)]
pub struct NoiseField {
    pub rows: usize,
    pub cols: usize,
    tensor: Tensor,
}

impl NoiseField {
    /// Sample `scale * N(0, 1)` for every interior cell of a tensor shaped `shape`.
    pub fn sample(
        shape: &[usize],
        scale: f32,
        rng: &mut dyn rand::RngCore,
    ) -> TextmorphResult<Self> {
        use rand::Rng as _;

        let (rows, cols) = interior_dims(shape)?;
        let data: Vec<f32> = (0..rows * cols)
            .map(|_| scale * rng.sample::<f32, _>(rand_distr::StandardNormal))
            .collect();
        let tensor = Tensor::from_vec(data, (rows, cols), &Device::Cpu)?;
        Ok(Self { rows, cols, tensor })
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    pub fn to_vec(&self) -> TextmorphResult<Vec<f32>> {
        Ok(self.tensor.flatten_all()?.to_vec1::<f32>()?)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/params/tensor.rs"]
mod tests;
