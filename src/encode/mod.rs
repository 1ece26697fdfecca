//! Frame export and video muxing.

/// `ffmpeg`-based muxing over numbered frame directories.
pub mod ffmpeg;
/// Numbered JPEG frame directories.
pub mod frames;
