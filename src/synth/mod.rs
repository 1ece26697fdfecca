pub(crate) mod carry;
pub(crate) mod config;
pub(crate) mod interpolate;
pub(crate) mod optimizer;
pub(crate) mod progress;
pub(crate) mod sequence;

#[cfg(test)]
#[path = "../../tests/unit/synth/support.rs"]
pub(crate) mod support;
