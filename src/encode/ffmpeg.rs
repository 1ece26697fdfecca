use crate::foundation::error::TextmorphResult;
use anyhow::Context as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// One directory of numbered frames to mux into an MP4.
#[derive(Clone, Debug, PartialEq)]
pub struct MuxJob {
    pub frames_dir: PathBuf,
    /// Zero-padded digits in the frame file names (`%0Nd.jpg`).
    pub digits: usize,
    pub fps: u32,
    pub out_path: PathBuf,
}

/// Turns a directory of numbered frames into a video.
///
/// Muxing is fire-and-forget: implementations report problems through logs and
/// never fail the run.
pub trait VideoMuxer {
    fn mux(&self, job: &MuxJob);
}

/// Skips muxing entirely.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullMuxer;

impl VideoMuxer for NullMuxer {
    fn mux(&self, job: &MuxJob) {
        tracing::debug!(out = %job.out_path.display(), "video muxing skipped");
    }
}

/// Invokes the system `ffmpeg` over a frame directory.
#[derive(Clone, Debug)]
pub struct FfmpegMuxer {
    program: String,
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
        }
    }
}

impl FfmpegMuxer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments passed to `ffmpeg` for `job`.
    pub fn args(job: &MuxJob) -> Vec<String> {
        let pattern = job.frames_dir.join(format!("%0{}d.jpg", job.digits));
        vec![
            "-v".into(),
            "warning".into(),
            "-y".into(),
            "-framerate".into(),
            job.fps.to_string(),
            "-i".into(),
            pattern.to_string_lossy().into_owned(),
            // yuv420p needs even dimensions.
            "-vf".into(),
            "pad=ceil(iw/2)*2:ceil(ih/2)*2".into(),
            "-c:v".into(),
            "libx264".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-movflags".into(),
            "+faststart".into(),
            job.out_path.to_string_lossy().into_owned(),
        ]
    }
}

impl VideoMuxer for FfmpegMuxer {
    #[tracing::instrument(skip(self), fields(out = %job.out_path.display()))]
    fn mux(&self, job: &MuxJob) {
        if let Err(e) = ensure_parent_dir(&job.out_path) {
            tracing::warn!("cannot prepare video output: {e}");
            return;
        }
        let status = Command::new(&self.program)
            .args(Self::args(job))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status();
        match status {
            Ok(s) if s.success() => tracing::info!("wrote video"),
            Ok(s) => tracing::warn!("{} exited with status {s}", self.program),
            Err(e) => tracing::warn!("failed to spawn {} (is it on PATH?): {e}", self.program),
        }
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> TextmorphResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
