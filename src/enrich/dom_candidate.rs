use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A live element observed on the current page. Produced fresh for every
/// capture and never persisted on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomCandidate {
    pub tag_name: String,
    pub text: String,
    pub placeholder: String,
    pub value: String,
    pub class: String,
    pub id: String,
    #[serde(rename = "type")]
    pub input_type: String,
    pub enabled: Option<bool>,
    pub visible: Option<bool>,
    pub editable: Option<bool>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub data_attrs: BTreeMap<String, String>,
}

impl DomCandidate {
    /// Text the candidate is matched on: the first non-blank of text,
    /// placeholder and value.
    pub fn candidate_text(&self) -> &str {
        [&self.text, &self.placeholder, &self.value]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or_default()
    }
}
