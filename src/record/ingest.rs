use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::record::element_record::{ElementRecord, Geometry, RecordSource, UnitScore};
use crate::record::naming::{slugify, text_fingerprint};

// ============================================================================
// Vision collaborator output
// ============================================================================

/// One element as reported by the vision extraction collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionElement {
    pub label_text: String,
    pub ocr_type: String,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub bbox: Option<BboxInput>,
    #[serde(default = "default_confidence")]
    pub confidence_score: f32,
}

fn default_confidence() -> f32 {
    1.0
}

/// Bounding boxes arrive in several shapes depending on the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BboxInput {
    Text(String),
    Array([f64; 4]),
    Object {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

impl BboxInput {
    pub fn to_geometry(&self) -> Option<Geometry> {
        match self {
            BboxInput::Text(s) => Geometry::parse_bbox(s),
            BboxInput::Array([x, y, w, h]) => Some(Geometry::new(*x, *y, *w, *h)),
            BboxInput::Object { x, y, width, height } => Some(Geometry::new(*x, *y, *width, *height)),
        }
    }
}

/// Parse the line format produced by the vision prompt:
/// `<label text> - <element type> - <intent>` (intent optional).
/// Lines without a ` - ` separator are ignored.
pub fn parse_vision_lines(raw: &str) -> Vec<VisionElement> {
    raw.lines()
        .map(str::trim)
        .filter(|line| line.contains(" - "))
        .filter_map(|line| {
            let parts: Vec<&str> = line.rsplitn(3, " - ").map(str::trim).collect();
            // rsplitn yields right-to-left
            let (label, ocr_type, intent) = match parts.as_slice() {
                [intent, ocr_type, label] => (*label, *ocr_type, Some(*intent)),
                [ocr_type, label] => (*label, *ocr_type, None),
                _ => return None,
            };
            Some(VisionElement {
                label_text: label.to_string(),
                ocr_type: ocr_type.to_lowercase(),
                intent: intent.filter(|i| !i.is_empty()).map(str::to_string),
                bbox: None,
                confidence_score: default_confidence(),
            })
        })
        .collect()
}

// ============================================================================
// Intent assignment
// ============================================================================

/// Assigns a semantic intent to a label when the extractor gave none.
pub trait IntentClassifier {
    fn classify(&self, label_text: &str, ocr_type: &str) -> String;
}

/// Keyword table with a slug fallback.
pub struct KeywordIntentClassifier;

const INTENT_KEYWORDS: &[(&[&str], &str)] = &[
    (&["username", "user name", "user id"], "username"),
    (&["password", "passcode"], "password"),
    (&["log in", "login", "sign in", "signin"], "login"),
    (&["log out", "logout", "sign out"], "logout"),
    (&["first name"], "first_name"),
    (&["last name", "surname"], "last_name"),
    (&["zip", "postal"], "zip_code"),
    (&["e-mail", "email"], "email"),
    (&["search"], "search"),
    (&["add to cart"], "add_to_cart"),
    (&["remove"], "remove"),
    (&["checkout"], "checkout"),
    (&["continue", "next"], "continue"),
    (&["cancel", "back"], "cancel"),
    (&["submit", "save", "finish"], "submit"),
];

impl IntentClassifier for KeywordIntentClassifier {
    fn classify(&self, label_text: &str, _ocr_type: &str) -> String {
        let lowered = label_text.to_lowercase();
        for (keywords, intent) in INTENT_KEYWORDS {
            if keywords.iter().any(|k| lowered.contains(k)) {
                return intent.to_string();
            }
        }
        slugify(label_text)
    }
}

// ============================================================================
// Record construction
// ============================================================================

/// Turn vision output for one page into element records.
///
/// Ids derive from page, ordinal, label and type, so re-ingesting the same
/// capture produces the same ids and upserts in place. Blank labels are
/// dropped.
pub fn ingest_vision(
    page_name: &str,
    elements: &[VisionElement],
    classifier: &dyn IntentClassifier,
) -> Vec<ElementRecord> {
    elements
        .iter()
        .enumerate()
        .filter(|(_, el)| !el.label_text.trim().is_empty())
        .map(|(ordinal, el)| {
            let label = el.label_text.trim();
            let ocr_type = el.ocr_type.trim().to_lowercase();
            let intent = match el.intent.as_deref().map(str::trim) {
                Some(i) if !i.is_empty() => i.to_string(),
                _ => classifier.classify(label, &ocr_type),
            };
            let id = text_fingerprint(&format!("{}|{}|{}|{}", page_name, ordinal, label, ocr_type));

            let mut record = ElementRecord::new(&id, page_name, &intent, label, &ocr_type);
            record.source = RecordSource::Ocr;
            record.confidence_score = UnitScore::new(el.confidence_score);
            if let Some(geometry) = el.bbox.as_ref().and_then(BboxInput::to_geometry) {
                record.geometry = geometry;
            }
            debug!(unique_name = %record.unique_name, "ingested vision element");
            record
        })
        .collect()
}

/// Manual registration input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalElement {
    pub page_name: String,
    pub ocr_type: String,
    pub tag_name: String,
    pub intent: String,
    pub label_text: String,
    pub placeholder: String,
    pub text: String,
    pub value: String,
    pub dom_id: String,
    pub dom_class: String,
    pub test_id: Option<String>,
    pub custom_selector: Option<String>,
    pub sample_value: Option<String>,
}

/// Build a record for an element registered by hand.
///
/// The label falls back through `label_text`, `placeholder`, `text` and
/// `value`. External records never go through enrichment.
pub fn register_external(input: &ExternalElement, classifier: &dyn IntentClassifier) -> ElementRecord {
    let label = [&input.label_text, &input.placeholder, &input.text, &input.value]
        .into_iter()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .unwrap_or_default();
    let ocr_type = input.ocr_type.trim().to_lowercase();
    let intent = if input.intent.trim().is_empty() {
        classifier.classify(label, &ocr_type)
    } else {
        input.intent.trim().to_string()
    };

    let mut record = ElementRecord::new("", &input.page_name, &intent, label, &ocr_type);
    record.id = text_fingerprint(&format!("external|{}", record.unique_name));
    record.tag_name = input.tag_name.trim().to_lowercase();
    record.placeholder = input.placeholder.clone();
    record.text = input.text.clone();
    record.value = input.value.clone();
    record.dom_id = input.dom_id.clone();
    record.dom_class = input.dom_class.clone();
    if let Some(test_id) = input.test_id.as_deref().filter(|t| !t.is_empty()) {
        record.data_attrs.insert("data-test".to_string(), test_id.to_string());
    }
    record.custom_selector = input.custom_selector.clone();
    record.sample_value = input.sample_value.clone();
    record.set_geometry(0.0, 0.0, 100.0, 40.0);
    record.confidence_score = UnitScore::new(1.0);
    record.visibility_score = UnitScore::new(1.0);
    record.locator_stability_score = UnitScore::new(1.0);
    record.healing_success_rate = UnitScore::new(1.0);
    record.external = true;
    record.dom_matched = false;
    record.source = RecordSource::External;
    record
}
