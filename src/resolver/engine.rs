use std::time::Duration;

use tracing::{debug, info, warn};

use crate::browser::locator::{ElementFacts, Locator, PageAction};
use crate::browser::page::LivePage;
use crate::context::EngineContext;
use crate::error::{HealingOutcome, LocatorNotFoundError, ResolveError, SessionError};
use crate::matcher::healing::{AmbiguityNote, find_heal_candidate};
use crate::record::ElementRecord;
use crate::resolver::strategy::{ActionKind, AttemptOutcome, StrategyKind, evaluate, strategy_chain};
use crate::trace::trace::{AttemptTrace, Phase, ResolutionTrace};

/// A resolved element, bound to the page it was found on.
///
/// Holds the page's mutable borrow, so nothing else can drive the page
/// while the handle is alive.
pub struct LiveHandle<'p, P: LivePage + ?Sized> {
    page: &'p mut P,
    pub unique_name: String,
    pub locator: Locator,
    pub strategy: StrategyKind,
    pub facts: ElementFacts,
    /// Set when the element was found through self-healing.
    pub healed_to: Option<String>,
    timeout: Duration,
}

impl<'p, P: LivePage + ?Sized> LiveHandle<'p, P> {
    pub fn click(&mut self) -> Result<(), SessionError> {
        self.page.perform(&self.locator, &PageAction::Click, self.timeout)
    }

    pub fn fill(&mut self, value: &str) -> Result<(), SessionError> {
        self.page.perform(
            &self.locator,
            &PageAction::Fill {
                value: value.to_string(),
            },
            self.timeout,
        )
    }

    /// Re-query the page for the element's current visibility.
    pub fn is_visible(&mut self) -> Result<bool, SessionError> {
        let facts = self.page.locate(&self.locator, self.timeout)?;
        Ok(facts.found() && facts.visible)
    }

    pub fn was_healed(&self) -> bool {
        self.healed_to.is_some()
    }
}

struct Hit {
    strategy: StrategyKind,
    locator: Locator,
    facts: ElementFacts,
}

/// Turns logical element names into live handles.
pub struct LocatorResolver<'c> {
    ctx: &'c EngineContext,
}

impl<'c> LocatorResolver<'c> {
    pub fn new(ctx: &'c EngineContext) -> Self {
        Self { ctx }
    }

    /// Resolve `unique_name` on `page` for `action`.
    ///
    /// Tries the stored record's strategies in order, then heals once by
    /// semantic similarity against every stored record and retries the
    /// healed record's strategies. Never heals twice.
    pub fn resolve<'p, P: LivePage + ?Sized>(
        &self,
        unique_name: &str,
        page: &'p mut P,
        action: ActionKind,
    ) -> Result<LiveHandle<'p, P>, ResolveError> {
        let timeout = self.ctx.settings.action_timeout;
        let mut trace = ResolutionTrace::now(unique_name, action);

        let record = self.ctx.store.get_by_unique_name(unique_name)?;
        trace.record_found = record.is_some();

        if let Some(record) = &record {
            if let Some(hit) = self.try_record(record, &mut *page, action, Phase::Direct, &mut trace)? {
                info!(unique_name, strategy = hit.strategy.as_str(), locator = %hit.locator, "resolved");
                self.ctx.tracer.log(&trace.resolved(hit.strategy));
                return Ok(LiveHandle {
                    page,
                    unique_name: unique_name.to_string(),
                    locator: hit.locator,
                    strategy: hit.strategy,
                    facts: hit.facts,
                    healed_to: None,
                    timeout,
                });
            }
        } else {
            debug!(unique_name, "no stored record, going straight to self-healing");
        }

        let threshold = self.ctx.settings.healing_threshold;
        let all = self.ctx.store.all()?;
        let outcome = match find_heal_candidate(self.ctx.embedder.as_ref(), unique_name, &all, threshold) {
            Err(e) => {
                warn!(unique_name, error = %e, "self-healing unavailable");
                HealingOutcome::Unavailable(e.to_string())
            }
            Ok(None) => HealingOutcome::NoCandidate { threshold },
            Ok(Some(candidate)) => {
                let healed_name = candidate.record.unique_name.clone();
                info!(unique_name, healed_to = %healed_name, score = candidate.score, "self-healing candidate");
                trace = trace.with_healing(&healed_name, candidate.score);

                if let Some(hit) = self.try_record(&candidate.record, &mut *page, action, Phase::Healed, &mut trace)? {
                    info!(
                        unique_name,
                        healed_to = %healed_name,
                        strategy = hit.strategy.as_str(),
                        "resolved after healing"
                    );
                    self.ctx.tracer.log(&trace.resolved(hit.strategy));
                    return Ok(LiveHandle {
                        page,
                        unique_name: unique_name.to_string(),
                        locator: hit.locator,
                        strategy: hit.strategy,
                        facts: hit.facts,
                        // healing back onto the requested record is a retry, not a rename
                        healed_to: (healed_name != unique_name).then_some(healed_name),
                        timeout,
                    });
                }
                HealingOutcome::CandidateFailed {
                    healed_to: healed_name,
                    score: candidate.score,
                }
            }
        };

        let err = LocatorNotFoundError {
            unique_name: unique_name.to_string(),
            healing: outcome,
        };
        warn!(unique_name, error = %err, "resolution failed");
        self.ctx.tracer.log(&trace.failed(&err));
        Err(err.into())
    }

    /// Walk one record's strategy chain, stopping at the first usable match.
    fn try_record<P: LivePage + ?Sized>(
        &self,
        record: &ElementRecord,
        page: &mut P,
        action: ActionKind,
        phase: Phase,
        trace: &mut ResolutionTrace,
    ) -> Result<Option<Hit>, SessionError> {
        let timeout = self.ctx.settings.action_timeout;

        for attempt in strategy_chain(record) {
            let outcome = evaluate(page, &attempt, action, timeout)?;
            debug!(
                record = %record.unique_name,
                strategy = attempt.kind.as_str(),
                locator = %attempt.locator,
                outcome = ?outcome,
                "strategy attempt"
            );
            trace.push_attempt(AttemptTrace {
                phase,
                record: record.unique_name.clone(),
                strategy: attempt.kind,
                locator: attempt.locator.to_string(),
                outcome: outcome.clone(),
            });

            if let AttemptOutcome::Matched { facts } = outcome {
                if facts.count > 1 {
                    AmbiguityNote {
                        context: format!("resolving '{}' via {}", record.unique_name, attempt.kind.as_str()),
                        kept: format!("{} (first match)", attempt.locator),
                        discarded: vec![format!("{} further matches", facts.count - 1)],
                        score: None,
                    }
                    .log();
                }
                return Ok(Some(Hit {
                    strategy: attempt.kind,
                    locator: attempt.locator,
                    facts,
                }));
            }
        }
        Ok(None)
    }
}
