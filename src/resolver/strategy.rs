use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::browser::locator::{ElementFacts, Locator};
use crate::browser::page::LivePage;
use crate::error::SessionError;
use crate::record::ElementRecord;

// ============================================================================
// Strategy descriptors
// ============================================================================

/// Direct lookup strategies in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    TestId,
    Role,
    Label,
    Placeholder,
    Text,
    DisplayValue,
    IdExact,
    IdPartial,
    ClassExact,
    ClassPartial,
    ClassList,
    Custom,
}

impl StrategyKind {
    pub const ORDERED: [StrategyKind; 12] = [
        StrategyKind::TestId,
        StrategyKind::Role,
        StrategyKind::Label,
        StrategyKind::Placeholder,
        StrategyKind::Text,
        StrategyKind::DisplayValue,
        StrategyKind::IdExact,
        StrategyKind::IdPartial,
        StrategyKind::ClassExact,
        StrategyKind::ClassPartial,
        StrategyKind::ClassList,
        StrategyKind::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::TestId => "test_id",
            StrategyKind::Role => "role",
            StrategyKind::Label => "label",
            StrategyKind::Placeholder => "placeholder",
            StrategyKind::Text => "text",
            StrategyKind::DisplayValue => "display_value",
            StrategyKind::IdExact => "id_exact",
            StrategyKind::IdPartial => "id_partial",
            StrategyKind::ClassExact => "class_exact",
            StrategyKind::ClassPartial => "class_partial",
            StrategyKind::ClassList => "class_list",
            StrategyKind::Custom => "custom",
        }
    }

    /// Locators this strategy derives from a record. Empty when the record
    /// lacks the data the strategy needs.
    pub fn locators(&self, record: &ElementRecord) -> Vec<Locator> {
        match self {
            StrategyKind::TestId => record
                .data_attrs
                .iter()
                .filter(|(k, v)| is_test_id_attribute(k) && !v.trim().is_empty())
                .map(|(k, v)| Locator::TestId {
                    attribute: k.clone(),
                    value: v.trim().to_string(),
                })
                .collect(),
            StrategyKind::Role => role_for(record)
                .map(|role| Locator::Role {
                    role: role.to_string(),
                    name: non_blank(&record.label_text),
                })
                .into_iter()
                .collect(),
            StrategyKind::Label => non_blank(&record.label_text)
                .map(|text| Locator::Label { text })
                .into_iter()
                .collect(),
            StrategyKind::Placeholder => non_blank(&record.placeholder)
                .map(|text| Locator::Placeholder { text })
                .into_iter()
                .collect(),
            StrategyKind::Text => non_blank(&record.text)
                .or_else(|| non_blank(&record.label_text))
                .map(|text| Locator::Text { text })
                .into_iter()
                .collect(),
            StrategyKind::DisplayValue => non_blank(&record.value)
                .or_else(|| record.sample_value.as_deref().and_then(non_blank))
                .map(|value| Locator::DisplayValue { value })
                .into_iter()
                .collect(),
            StrategyKind::IdExact => css_attr(&record.dom_id, "id", "="),
            StrategyKind::IdPartial => css_attr(&record.dom_id, "id", "*="),
            StrategyKind::ClassExact => css_attr(&record.dom_class, "class", "="),
            StrategyKind::ClassPartial => css_attr(&record.dom_class, "class", "*="),
            StrategyKind::ClassList => {
                let classes: Vec<String> = record.dom_class.split_whitespace().map(escape_ident).collect();
                if classes.is_empty() {
                    Vec::new()
                } else {
                    vec![Locator::Css {
                        selector: format!(".{}", classes.join(".")),
                    }]
                }
            }
            StrategyKind::Custom => record
                .custom_selector
                .as_deref()
                .and_then(non_blank)
                .map(|selector| Locator::Css { selector })
                .into_iter()
                .collect(),
        }
    }
}

/// One concrete lookup to try.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyAttempt {
    pub kind: StrategyKind,
    pub locator: Locator,
}

/// Every lookup a record supports, in precedence order.
pub fn strategy_chain(record: &ElementRecord) -> Vec<StrategyAttempt> {
    StrategyKind::ORDERED
        .iter()
        .flat_map(|kind| {
            kind.locators(record)
                .into_iter()
                .map(move |locator| StrategyAttempt { kind: *kind, locator })
        })
        .collect()
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

fn is_test_id_attribute(key: &str) -> bool {
    let key = key.to_lowercase();
    key.contains("test") || key.contains("qa")
}

/// ARIA role implied by the record's tag.
pub fn role_for(record: &ElementRecord) -> Option<&'static str> {
    let tag = record.tag_name.trim().to_lowercase();
    if tag == "input" && record.input_type.eq_ignore_ascii_case("checkbox") {
        return Some("checkbox");
    }
    match tag.as_str() {
        "button" => Some("button"),
        "input" => Some("textbox"),
        "select" => Some("combobox"),
        "textarea" => Some("textbox"),
        "checkbox" => Some("checkbox"),
        _ => None,
    }
}

fn css_attr(value: &str, attribute: &str, op: &str) -> Vec<Locator> {
    match non_blank(value) {
        Some(v) => vec![Locator::Css {
            selector: format!("[{}{}\"{}\"]", attribute, op, escape_attr_value(&v)),
        }],
        None => Vec::new(),
    }
}

fn escape_attr_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Escape a class name for use in a `.class` selector.
fn escape_ident(ident: &str) -> String {
    let leading_hyphen = ident.starts_with('-');
    let mut out = String::with_capacity(ident.len());
    for (i, c) in ident.chars().enumerate() {
        // an identifier may not start with a digit, nor with a hyphen then a digit
        let digit_at_start = c.is_ascii_digit() && (i == 0 || (i == 1 && leading_hyphen));
        if digit_at_start {
            out.push_str(&format!("\\3{} ", c));
        } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}
