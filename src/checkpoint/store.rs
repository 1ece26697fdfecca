use crate::foundation::error::{TextmorphError, TextmorphResult};
use crate::params::tensor::ImageParams;
use anyhow::Context as _;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write as _};
use std::path::{Path, PathBuf};

/// File name of the scratch slot inside a work directory.
pub const SCRATCH_FILE: &str = "_scratch.json";
/// Extension used for parameter snapshots.
pub const SNAPSHOT_EXT: &str = "json";

const MAX_NAME_CHARS: usize = 64;

/// Persist one parameter tensor to `path`, creating parent directories.
pub fn save_params(params: &ImageParams, path: &Path) -> TextmorphResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create snapshot dir '{}'", parent.display()))?;
    }
    let f = File::create(path).with_context(|| format!("create snapshot '{}'", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer(&mut w, params)
        .map_err(|e| TextmorphError::serde(format!("write '{}': {e}", path.display())))?;
    w.flush()
        .with_context(|| format!("flush snapshot '{}'", path.display()))?;
    Ok(())
}

/// Load one parameter tensor from `path`.
///
/// Fails with [`TextmorphError::MissingCheckpoint`] when the file does not exist.
pub fn load_params(path: &Path) -> TextmorphResult<ImageParams> {
    if !path.is_file() {
        return Err(TextmorphError::missing_checkpoint(path));
    }
    let f = File::open(path).with_context(|| format!("open snapshot '{}'", path.display()))?;
    serde_json::from_reader(BufReader::new(f))
        .map_err(|e| TextmorphError::serde(format!("parse '{}': {e}", path.display())))
}

/// Filesystem-safe, deterministic form of a phrase.
///
/// Keeps alphanumerics, `-` and `_`; whitespace runs become a single `_`;
/// everything else is dropped.
pub fn clean_phrase(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_sep = false;
    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            pending_sep = !out.is_empty();
        } else if ch.is_alphanumeric() || ch == '-' || ch == '_' {
            if pending_sep {
                out.push('_');
                pending_sep = false;
            }
            out.push(ch);
        }
    }
    out.chars().take(MAX_NAME_CHARS).collect()
}

/// Checkpoint store rooted at one work directory.
///
/// Holds the single scratch slot (starting parameters for the next phrase)
/// and names the per-phrase snapshots.
#[derive(Clone, Debug)]
pub struct CheckpointStore {
    root: PathBuf,
}

impl CheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scratch_path(&self) -> PathBuf {
        self.root.join(SCRATCH_FILE)
    }

    pub fn save_scratch(&self, params: &ImageParams) -> TextmorphResult<()> {
        let path = self.scratch_path();
        tracing::debug!(path = %path.display(), "write scratch checkpoint");
        save_params(params, &path)
    }

    pub fn load_scratch(&self) -> TextmorphResult<ImageParams> {
        load_params(&self.scratch_path())
    }

    /// Remove the scratch slot if present.
    pub fn clear_scratch(&self) -> TextmorphResult<()> {
        let path = self.scratch_path();
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("remove scratch '{}'", path.display()))?;
        }
        Ok(())
    }

    /// Snapshot path for the phrase output named `name` (see [`phrase_output_name`]).
    pub fn snapshot_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{SNAPSHOT_EXT}"))
    }

    pub fn save_snapshot(&self, name: &str, params: &ImageParams) -> TextmorphResult<PathBuf> {
        let path = self.snapshot_path(name);
        save_params(params, &path)?;
        Ok(path)
    }
}

/// Output name for phrase `index`: `NN-<clean text>[-<suffix>]`.
pub fn phrase_output_name(index: usize, text: &str, suffix: Option<&str>) -> String {
    let mut name = format!("{:02}-{}", index, clean_phrase(text));
    if let Some(suffix) = suffix {
        name.push('-');
        name.push_str(suffix);
    }
    name
}

#[cfg(test)]
#[path = "../../tests/unit/checkpoint/store.rs"]
mod tests;
