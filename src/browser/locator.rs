use std::fmt;

use serde::{Deserialize, Serialize};

/// How the browser server should find an element. Sent as-is over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Locator {
    TestId { attribute: String, value: String },
    Role {
        role: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Label { text: String },
    Placeholder { text: String },
    Text { text: String },
    DisplayValue { value: String },
    Css { selector: String },
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::TestId { attribute, value } => write!(f, "[{}=\"{}\"]", attribute, value),
            Locator::Role { role, name: Some(name) } => write!(f, "role={}[name=\"{}\"]", role, name),
            Locator::Role { role, name: None } => write!(f, "role={}", role),
            Locator::Label { text } => write!(f, "label=\"{}\"", text),
            Locator::Placeholder { text } => write!(f, "placeholder=\"{}\"", text),
            Locator::Text { text } => write!(f, "text=\"{}\"", text),
            Locator::DisplayValue { value } => write!(f, "value=\"{}\"", value),
            Locator::Css { selector } => write!(f, "css={}", selector),
        }
    }
}

/// What the page reported for a locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementFacts {
    /// Number of matching elements. Zero means the locator missed.
    pub count: u32,
    /// Visibility of the first match.
    pub visible: bool,
    /// Whether the first match accepts typed input.
    pub editable: bool,
}

impl ElementFacts {
    pub fn found(&self) -> bool {
        self.count > 0
    }
}

/// An interaction performed through a resolved locator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PageAction {
    Click,
    Fill { value: String },
}
