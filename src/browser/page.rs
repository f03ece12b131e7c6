use std::time::Duration;

use crate::browser::locator::{ElementFacts, Locator, PageAction};
use crate::enrich::dom_candidate::DomCandidate;
use crate::error::SessionError;

/// A live page driven by one ordered command stream.
///
/// Every method takes `&mut self`: commands against one page are never
/// issued concurrently.
pub trait LivePage {
    fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    fn current_url(&mut self) -> Result<String, SessionError>;

    /// Visible, interactable elements of the current page in document order.
    fn extract_candidates(&mut self) -> Result<Vec<DomCandidate>, SessionError>;

    /// Count and inspect elements matched by `locator`, waiting up to
    /// `timeout` for at least one to appear.
    fn locate(&mut self, locator: &Locator, timeout: Duration) -> Result<ElementFacts, SessionError>;

    /// Act on the first element matched by `locator`.
    fn perform(&mut self, locator: &Locator, action: &PageAction, timeout: Duration) -> Result<(), SessionError>;

    fn wait(&mut self, duration_ms: u64) -> Result<(), SessionError>;
}
