pub mod locator;
pub mod page;
pub mod session;

pub use locator::{ElementFacts, Locator, PageAction};
pub use page::LivePage;
pub use session::BrowserSession;
