use tracing::info;

use crate::{
    browser::page::LivePage,
    context::EngineContext,
    enrich::enricher::{EnrichmentReport, Enricher},
    error::EnrichError,
};

pub mod browser;
pub mod cli;
pub mod context;
pub mod embedding;
pub mod enrich;
pub mod error;
pub mod matcher;
pub mod record;
pub mod report;
pub mod resolver;
pub mod spec;
pub mod store;
pub mod trace;

/// Capture-time pass for one page: read the live candidates, bind the page's
/// stored records to them and persist the result.
pub fn capture_page<P: LivePage + ?Sized>(
    ctx: &EngineContext,
    page: &mut P,
    page_name: &str,
) -> Result<EnrichmentReport, EnrichError> {
    let candidates = page.extract_candidates()?;
    let url = page.current_url()?;
    let records = ctx.store.get_by_page(page_name)?;

    info!(page_name, url = %url, records = records.len(), candidates = candidates.len(), "capturing page");

    Enricher::new(ctx).with_source_url(&url).enrich(&records, &candidates)
}
