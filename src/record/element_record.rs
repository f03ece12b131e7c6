use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::naming::unique_name;

// ============================================================================
// ElementRecord: one observed, addressable UI element
// ============================================================================

/// Where a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    /// Produced by the vision extraction pipeline.
    #[default]
    Ocr,
    /// Registered by hand; never touched by the enricher.
    External,
}

/// Persisted element metadata.
///
/// The flat JSON layout matches what downstream code generation reads:
/// geometry is stored both as numbers and as a `"x,y,w,h"` string, and
/// `data_attrs` is a JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ElementRecord {
    pub id: String,
    pub page_name: String,
    pub unique_name: String,

    pub label_text: String,
    pub placeholder: String,
    pub text: String,
    pub value: String,

    pub tag_name: String,
    pub ocr_type: String,
    pub intent: String,
    pub input_type: String,

    pub dom_id: String,
    pub dom_class: String,
    #[serde(with = "data_attrs_json")]
    pub data_attrs: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editable: Option<bool>,

    #[serde(flatten)]
    pub geometry: Geometry,

    pub confidence_score: UnitScore,
    pub visibility_score: UnitScore,
    pub locator_stability_score: UnitScore,
    pub healing_success_rate: UnitScore,

    pub dom_matched: bool,
    pub match_timestamp: Option<DateTime<Utc>>,
    pub external: bool,
    pub source: RecordSource,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl ElementRecord {
    /// Build a record and derive its `unique_name` from the naming parts.
    pub fn new(id: &str, page_name: &str, intent: &str, label_text: &str, ocr_type: &str) -> Self {
        let mut record = ElementRecord {
            id: id.to_string(),
            page_name: page_name.to_string(),
            intent: intent.to_string(),
            label_text: label_text.to_string(),
            ocr_type: ocr_type.to_string(),
            ..ElementRecord::default()
        };
        record.refresh_unique_name();
        record
    }

    /// Recompute `unique_name` after any of its naming parts changed.
    pub fn refresh_unique_name(&mut self) {
        self.unique_name = unique_name(&self.page_name, &self.intent, &self.label_text, &self.ocr_type);
    }

    /// Clamp and store geometry; keeps the `bbox` string in sync.
    pub fn set_geometry(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.geometry = Geometry::new(x, y, width, height);
    }

    /// The enricher only looks at OCR records that are still unbound and
    /// carry a label.
    pub fn is_enrichable(&self) -> bool {
        !self.external && !self.dom_matched && !self.label_text.trim().is_empty()
    }

    /// Flag the record as bound to a live element. One-way.
    pub fn mark_dom_matched(&mut self, at: DateTime<Utc>) {
        if !self.dom_matched {
            self.dom_matched = true;
            self.match_timestamp = Some(at);
        }
    }

    /// Take over what a live-page merge stored on `matched`, for an unbound
    /// copy of the same record (e.g. from re-ingesting vision output).
    pub fn inherit_dom_match(&mut self, matched: &ElementRecord) {
        if self.dom_matched || !matched.dom_matched {
            return;
        }
        self.tag_name = matched.tag_name.clone();
        self.dom_id = matched.dom_id.clone();
        self.dom_class = matched.dom_class.clone();
        self.value = matched.value.clone();
        self.placeholder = matched.placeholder.clone();
        self.input_type = matched.input_type.clone();
        if self.text.trim().is_empty() {
            self.text = matched.text.clone();
        }
        self.enabled = matched.enabled;
        self.visible = matched.visible;
        self.editable = matched.editable;
        self.geometry = matched.geometry;
        for (k, v) in &matched.data_attrs {
            self.data_attrs.entry(k.clone()).or_insert_with(|| v.clone());
        }
        if self.source_url.is_none() {
            self.source_url = matched.source_url.clone();
        }
        self.dom_matched = true;
        self.match_timestamp = matched.match_timestamp;
    }
}

// ============================================================================
// Scores
// ============================================================================

/// A score clamped into `[0, 1]`. NaN becomes 0.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct UnitScore(f32);

impl UnitScore {
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            UnitScore(0.0)
        } else {
            UnitScore(value.clamp(0.0, 1.0))
        }
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl From<f32> for UnitScore {
    fn from(value: f32) -> Self {
        UnitScore::new(value)
    }
}

impl From<UnitScore> for f32 {
    fn from(score: UnitScore) -> Self {
        score.0
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Non-negative bounding box.
///
/// Serialized flat as `x`, `y`, `width`, `height` plus the derived `bbox`
/// string. On read, numeric fields win; a record that only carries `bbox`
/// is parsed from the string.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "GeometryRepr", into = "GeometryRepr")]
pub struct Geometry {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl Geometry {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Geometry {
            x: non_negative(x),
            y: non_negative(y),
            width: non_negative(width),
            height: non_negative(height),
        }
    }

    /// Parse `"x,y,w,h"`. Returns `None` unless there are exactly four numbers.
    pub fn parse_bbox(bbox: &str) -> Option<Self> {
        let parts: Vec<f64> = bbox
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;
        match parts.as_slice() {
            [x, y, w, h] => Some(Geometry::new(*x, *y, *w, *h)),
            _ => None,
        }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Canonical comma-joined form.
    pub fn bbox(&self) -> String {
        format!(
            "{},{},{},{}",
            fmt_coord(self.x),
            fmt_coord(self.y),
            fmt_coord(self.width),
            fmt_coord(self.height)
        )
    }
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { 0.0 }
}

// Integral coordinates print without a trailing ".0".
fn fmt_coord(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct GeometryRepr {
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default)]
    width: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
    #[serde(default)]
    bbox: Option<String>,
}

impl From<GeometryRepr> for Geometry {
    fn from(repr: GeometryRepr) -> Self {
        let from_string = repr.bbox.as_deref().and_then(Geometry::parse_bbox).unwrap_or_default();
        Geometry::new(
            repr.x.unwrap_or(from_string.x),
            repr.y.unwrap_or(from_string.y),
            repr.width.unwrap_or(from_string.width),
            repr.height.unwrap_or(from_string.height),
        )
    }
}

impl From<Geometry> for GeometryRepr {
    fn from(g: Geometry) -> Self {
        GeometryRepr {
            x: Some(g.x),
            y: Some(g.y),
            width: Some(g.width),
            height: Some(g.height),
            bbox: Some(g.bbox()),
        }
    }
}

// ============================================================================
// data_attrs <-> JSON string
// ============================================================================

mod data_attrs_json {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(
        attrs: &BTreeMap<String, String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let encoded = serde_json::to_string(attrs).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&encoded)
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stored {
        Encoded(String),
        Inline(serde_json::Map<String, Value>),
        Missing(()),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, String>, D::Error> {
        let map = match Stored::deserialize(deserializer)? {
            Stored::Encoded(s) if s.trim().is_empty() => return Ok(BTreeMap::new()),
            Stored::Encoded(s) => {
                serde_json::from_str::<serde_json::Map<String, Value>>(&s).map_err(serde::de::Error::custom)?
            }
            Stored::Inline(map) => map,
            Stored::Missing(()) => return Ok(BTreeMap::new()),
        };
        Ok(map
            .into_iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, v)
            })
            .collect())
    }
}
