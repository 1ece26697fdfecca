use crate::foundation::error::{TextmorphError, TextmorphResult};
use std::fmt;
use std::str::FromStr;

/// Sequential frame number inside one exported frame directory.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

impl FrameIndex {
    /// File name for this frame, zero-padded to `digits`.
    pub fn file_name(self, digits: usize) -> String {
        format!("{:0width$}.jpg", self.0, width = digits)
    }
}

/// Output resolution in pixels.
///
/// Parsed from `"W-H"` (e.g. `"1280-720"`); a single value broadcasts to a square.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> TextmorphResult<Self> {
        if width == 0 || height == 0 {
            return Err(TextmorphError::validation(
                "resolution width/height must be non-zero",
            ));
        }
        Ok(Self { width, height })
    }

    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn min_side(self) -> u32 {
        self.width.min(self.height)
    }
}

impl FromStr for Resolution {
    type Err = TextmorphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .trim()
            .split('-')
            .map(|p| {
                p.trim().parse::<u32>().map_err(|_| {
                    TextmorphError::validation(format!("invalid resolution '{s}'"))
                })
            })
            .collect::<TextmorphResult<Vec<_>>>()?;
        match parts.as_slice() {
            [side] => Self::new(*side, *side),
            [w, h] => Self::new(*w, *h),
            _ => Err(TextmorphError::validation(format!(
                "invalid resolution '{s}' (expected W-H or a single size)"
            ))),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.width, self.height)
    }
}

/// Rendered image, interleaved RGB with nominal range `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct RgbFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<f32>,
}

impl RgbFrame {
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> TextmorphResult<Self> {
        if data.len() != width as usize * height as usize * 3 {
            return Err(TextmorphError::validation(format!(
                "frame data has {} values, expected {}x{}x3",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Quantize to RGB8, clamping to the displayable range.
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.data
            .iter()
            .map(|v| {
                let v = if v.is_finite() { *v } else { 0.0 };
                (v * 255.0).round().clamp(0.0, 255.0) as u8
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
