use crate::foundation::error::{TextmorphError, TextmorphResult};
use std::io::Write as _;
use std::process::{Command, Stdio};

/// Phrase translation capability.
pub trait Translator {
    fn translate(&self, text: &str, target_lang: &str) -> TextmorphResult<String>;
}

/// Returns text unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTranslator;

impl Translator for NoopTranslator {
    fn translate(&self, text: &str, _target_lang: &str) -> TextmorphResult<String> {
        Ok(text.to_string())
    }
}

/// Translates by piping text through an external program.
///
/// Invoked as `<program> <args...> <target_lang>` with the text on stdin; the
/// translation is read from stdout.
#[derive(Clone, Debug)]
pub struct CommandTranslator {
    program: String,
    args: Vec<String>,
}

impl CommandTranslator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parse a whitespace-separated command line (`"trans -b"`).
    pub fn from_command_line(line: &str) -> TextmorphResult<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| TextmorphError::validation("translate command is empty"))?;
        Ok(Self::new(program, parts.collect()))
    }
}

impl Translator for CommandTranslator {
    fn translate(&self, text: &str, target_lang: &str) -> TextmorphResult<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(target_lang)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                TextmorphError::encoder(format!(
                    "failed to spawn translator '{}': {e}",
                    self.program
                ))
            })?;

        {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| TextmorphError::encoder("failed to open translator stdin"))?;
            stdin.write_all(text.as_bytes()).map_err(|e| {
                TextmorphError::encoder(format!("failed to write to translator: {e}"))
            })?;
        }

        let out = child
            .wait_with_output()
            .map_err(|e| TextmorphError::encoder(format!("translator did not finish: {e}")))?;
        if !out.status.success() {
            return Err(TextmorphError::encoder(format!(
                "translator exited with status {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let translated = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if translated.is_empty() {
            return Err(TextmorphError::encoder("translator returned empty output"));
        }
        Ok(translated)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/translate.rs"]
mod tests;
