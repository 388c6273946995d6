//! Relabel rules carried verbatim into generated scrape configs.

use serde::{Deserialize, Serialize};

/// Label the scrape target address is stored in.
pub const ADDRESS_LABEL: &str = "__address__";
/// Label holding the logical instance of a target.
pub const INSTANCE_LABEL: &str = "instance";

/// Relabel action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelabelAction {
    #[default]
    Replace,
    Keep,
    Drop,
    HashMod,
    LabelMap,
    LabelDrop,
    LabelKeep,
}

/// A single relabel rule.
///
/// `regex` is kept as its source text; evaluation belongs to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelabelConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_labels: Vec<String>,
    pub separator: String,
    pub regex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modulus: Option<u64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_label: String,
    pub replacement: String,
    pub action: RelabelAction,
}

impl Default for RelabelConfig {
    fn default() -> Self {
        Self {
            source_labels: Vec::new(),
            separator: ";".to_string(),
            regex: "(.*)".to_string(),
            modulus: None,
            target_label: String::new(),
            replacement: "$1".to_string(),
            action: RelabelAction::Replace,
        }
    }
}

impl RelabelConfig {
    /// Rule that rewrites the target address into `instance` as `replacement`.
    pub fn replace_instance(replacement: impl Into<String>) -> Self {
        Self {
            source_labels: vec![ADDRESS_LABEL.to_string()],
            target_label: INSTANCE_LABEL.to_string(),
            replacement: replacement.into(),
            ..Self::default()
        }
    }
}
