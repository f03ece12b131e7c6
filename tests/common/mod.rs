#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use resilient_locator::browser::locator::{ElementFacts, Locator, PageAction};
use resilient_locator::browser::page::LivePage;
use resilient_locator::context::EngineContext;
use resilient_locator::embedding::{EmbeddingService, HashedNgramEmbedder};
use resilient_locator::enrich::dom_candidate::DomCandidate;
use resilient_locator::error::{EmbeddingError, SessionError};
use resilient_locator::record::ElementRecord;
use resilient_locator::store::{ElementStore, InMemoryStore};

// =========================================================================
// Scripted page
// =========================================================================

/// A page whose answers are programmed per locator. Anything not programmed
/// is absent.
#[derive(Debug, Default)]
pub struct FakePage {
    pub url: String,
    pub elements: HashMap<Locator, ElementFacts>,
    /// Locators the driver refuses (invalid selector, timeout).
    pub rejected: HashSet<Locator>,
    /// Every locate fails as if the browser process died.
    pub broken: bool,
    pub candidates: Vec<DomCandidate>,

    pub locate_calls: Vec<Locator>,
    pub actions: Vec<(Locator, PageAction)>,
    pub navigations: Vec<String>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        FakePage {
            url: url.to_string(),
            ..FakePage::default()
        }
    }

    pub fn with(mut self, locator: Locator, facts: ElementFacts) -> Self {
        self.elements.insert(locator, facts);
        self
    }

    pub fn rejecting(mut self, locator: Locator) -> Self {
        self.rejected.insert(locator);
        self
    }

    pub fn with_candidates(mut self, candidates: Vec<DomCandidate>) -> Self {
        self.candidates = candidates;
        self
    }
}

impl LivePage for FakePage {
    fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        self.navigations.push(url.to_string());
        self.url = url.to_string();
        Ok(())
    }

    fn current_url(&mut self) -> Result<String, SessionError> {
        Ok(self.url.clone())
    }

    fn extract_candidates(&mut self) -> Result<Vec<DomCandidate>, SessionError> {
        Ok(self.candidates.clone())
    }

    fn locate(&mut self, locator: &Locator, _timeout: Duration) -> Result<ElementFacts, SessionError> {
        self.locate_calls.push(locator.clone());
        if self.broken {
            return Err(SessionError::Io("browser server exited".into()));
        }
        if self.rejected.contains(locator) {
            return Err(SessionError::Protocol {
                command: "locate".into(),
                error: "invalid selector".into(),
            });
        }
        Ok(self.elements.get(locator).copied().unwrap_or_default())
    }

    fn perform(&mut self, locator: &Locator, action: &PageAction, _timeout: Duration) -> Result<(), SessionError> {
        self.actions.push((locator.clone(), action.clone()));
        Ok(())
    }

    fn wait(&mut self, _duration_ms: u64) -> Result<(), SessionError> {
        Ok(())
    }
}

pub fn visible(count: u32) -> ElementFacts {
    ElementFacts {
        count,
        visible: true,
        editable: false,
    }
}

pub fn editable() -> ElementFacts {
    ElementFacts {
        count: 1,
        visible: true,
        editable: true,
    }
}

pub fn hidden() -> ElementFacts {
    ElementFacts {
        count: 1,
        visible: false,
        editable: false,
    }
}

// =========================================================================
// Embedders
// =========================================================================

/// Exact vectors per text, for threshold boundary tests. Unknown texts map
/// to the zero vector.
pub struct VectorTableEmbedder {
    pub dimension: usize,
    pub table: HashMap<String, Vec<f32>>,
}

impl VectorTableEmbedder {
    pub fn new(entries: &[(&str, Vec<f32>)]) -> Self {
        let dimension = entries.first().map(|(_, v)| v.len()).unwrap_or(4);
        VectorTableEmbedder {
            dimension,
            table: entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        }
    }
}

impl EmbeddingService for VectorTableEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self
            .table
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.dimension]))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Always fails, like an unreachable embedding server.
pub struct FailingEmbedder;

impl EmbeddingService for FailingEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Status {
            status: 503,
            body: "model not loaded".into(),
        })
    }

    fn dimension(&self) -> usize {
        4
    }
}

// =========================================================================
// Records and contexts
// =========================================================================

/// Record with id equal to its unique name.
pub fn record(page: &str, intent: &str, label: &str, ocr_type: &str) -> ElementRecord {
    let mut r = ElementRecord::new("", page, intent, label, ocr_type);
    r.id = r.unique_name.clone();
    r
}

pub fn login_button() -> ElementRecord {
    let mut r = record("saucedemo_login", "login", "Login", "button");
    r.tag_name = "button".into();
    r
}

pub fn username_field() -> ElementRecord {
    let mut r = record("saucedemo_login", "username", "Username", "textbox");
    r.tag_name = "input".into();
    r.placeholder = "Username".into();
    r
}

pub fn add_to_cart_button() -> ElementRecord {
    let mut r = record("saucedemo_inventory", "add_to_cart", "Add to cart", "button");
    r.tag_name = "button".into();
    r
}

pub fn context_with(records: Vec<ElementRecord>, embedder: Arc<dyn EmbeddingService>) -> EngineContext {
    let store: Arc<dyn ElementStore> = Arc::new(InMemoryStore::with_records(records));
    EngineContext::new(store, embedder)
}

pub fn ngram_context(records: Vec<ElementRecord>) -> EngineContext {
    context_with(records, Arc::new(HashedNgramEmbedder::default()))
}

pub fn candidate(tag: &str, text: &str) -> DomCandidate {
    DomCandidate {
        tag_name: tag.to_string(),
        text: text.to_string(),
        visible: Some(true),
        enabled: Some(true),
        ..DomCandidate::default()
    }
}
