use crate::foundation::core::{FrameIndex, RgbFrame};
use crate::foundation::error::{TextmorphError, TextmorphResult};
use anyhow::Context as _;
use std::path::{Path, PathBuf};

/// Digits used for per-phrase preview frames.
pub const PHRASE_FRAME_DIGITS: usize = 4;
/// Digits used for the final interpolation frames.
pub const FINAL_FRAME_DIGITS: usize = 5;

/// Writes sequentially numbered JPEG frames into one directory.
///
/// Indices must be strictly increasing across `write` calls.
#[derive(Debug)]
pub struct FrameDir {
    dir: PathBuf,
    digits: usize,
    last_idx: Option<FrameIndex>,
    last_path: Option<PathBuf>,
    written: u64,
}

impl FrameDir {
    /// Create (or reuse) `dir` for frames named with `digits` zero-padded digits.
    pub fn create(dir: impl Into<PathBuf>, digits: usize) -> TextmorphResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create frame dir '{}'", dir.display()))?;
        Ok(Self {
            dir,
            digits,
            last_idx: None,
            last_path: None,
            written: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn digits(&self) -> usize {
        self.digits
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Path of the most recently written frame.
    pub fn last_path(&self) -> Option<&Path> {
        self.last_path.as_deref()
    }

    pub fn write(&mut self, idx: FrameIndex, frame: &RgbFrame) -> TextmorphResult<PathBuf> {
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(TextmorphError::validation(format!(
                "frame index {} is not after {}",
                idx.0, last.0
            )));
        }
        let path = self.dir.join(idx.file_name(self.digits));
        write_jpeg(&path, frame)?;
        tracing::debug!(path = %path.display(), "wrote frame");

        self.last_idx = Some(idx);
        self.last_path = Some(path.clone());
        self.written += 1;
        Ok(path)
    }
}

/// Encode `frame` as JPEG at `path`, clamping to the displayable range.
pub fn write_jpeg(path: &Path, frame: &RgbFrame) -> TextmorphResult<()> {
    image::save_buffer_with_format(
        path,
        &frame.to_rgb8(),
        frame.width,
        frame.height,
        image::ColorType::Rgb8,
        image::ImageFormat::Jpeg,
    )
    .with_context(|| format!("write jpeg '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/frames.rs"]
mod tests;
