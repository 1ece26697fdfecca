use crate::foundation::error::{TextmorphError, TextmorphResult};
use std::fmt;
use std::str::FromStr;

/// Vision-language encoder variants and their per-variant settings.
///
/// Lookup is by exact name; see [`ModelVariant::ALL`].
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum ModelVariant {
    #[default]
    #[serde(rename = "ViT-B/32")]
    VitB32,
    #[serde(rename = "RN50")]
    Rn50,
    #[serde(rename = "RN50x4")]
    Rn50x4,
    #[serde(rename = "RN101")]
    Rn101,
}

struct VariantSpec {
    variant: ModelVariant,
    name: &'static str,
    sample_scale: f64,
    input_size: u32,
    tag_outputs: bool,
}

const TABLE: [VariantSpec; 4] = [
    VariantSpec {
        variant: ModelVariant::VitB32,
        name: "ViT-B/32",
        sample_scale: 1.0,
        input_size: 224,
        tag_outputs: false,
    },
    VariantSpec {
        variant: ModelVariant::Rn50,
        name: "RN50",
        sample_scale: 0.5,
        input_size: 224,
        tag_outputs: true,
    },
    VariantSpec {
        variant: ModelVariant::Rn50x4,
        name: "RN50x4",
        sample_scale: 0.16,
        input_size: 288,
        tag_outputs: true,
    },
    VariantSpec {
        variant: ModelVariant::Rn101,
        name: "RN101",
        sample_scale: 0.33,
        input_size: 224,
        tag_outputs: true,
    },
];

impl ModelVariant {
    pub const ALL: [ModelVariant; 4] = [Self::VitB32, Self::Rn50, Self::Rn50x4, Self::Rn101];

    fn spec(self) -> &'static VariantSpec {
        // TABLE is ordered like ALL.
        &TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Fraction of the configured sample count this variant can afford per step.
    pub fn sample_scale(self) -> f64 {
        self.spec().sample_scale
    }

    /// Square input side (pixels) the encoder expects for each view.
    pub fn input_size(self) -> u32 {
        self.spec().input_size
    }

    /// Effective number of views per step for a configured `samples`.
    pub fn effective_samples(self, samples: usize) -> usize {
        ((samples as f64 * self.sample_scale()).floor() as usize).max(1)
    }

    /// Suffix appended to work-dir and output names, if this variant tags them.
    pub fn output_suffix(self) -> Option<&'static str> {
        self.spec().tag_outputs.then_some(self.spec().name)
    }
}

impl FromStr for ModelVariant {
    type Err = TextmorphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TABLE
            .iter()
            .find(|spec| spec.name == s)
            .map(|spec| spec.variant)
            .ok_or_else(|| {
                let names: Vec<_> = TABLE.iter().map(|spec| spec.name).collect();
                TextmorphError::validation(format!(
                    "unknown model '{s}' (expected one of: {})",
                    names.join(", ")
                ))
            })
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/variant.rs"]
mod tests;
