use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::resolver::strategy::{ActionKind, AttemptOutcome, StrategyKind};

/// Whether an attempt ran against the requested record or the healed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Direct,
    Healed,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptTrace {
    pub phase: Phase,
    pub record: String,
    pub strategy: StrategyKind,
    pub locator: String,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

/// One resolution, as written to the JSONL trace file.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionTrace {
    pub timestamp_ms: u128,
    pub unique_name: String,
    pub action: ActionKind,

    pub record_found: bool,
    pub attempts: Vec<AttemptTrace>,

    pub healed_to: Option<String>,
    pub healing_score: Option<f32>,

    pub resolved_by: Option<StrategyKind>,
    pub failure: Option<String>,
}

impl ResolutionTrace {
    pub fn now(unique_name: &str, action: ActionKind) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            unique_name: unique_name.to_string(),
            action,
            record_found: false,
            attempts: vec![],
            healed_to: None,
            healing_score: None,
            resolved_by: None,
            failure: None,
        }
    }

    pub fn push_attempt(&mut self, attempt: AttemptTrace) {
        self.attempts.push(attempt);
    }

    pub fn with_healing(mut self, healed_to: &str, score: f32) -> Self {
        self.healed_to = Some(healed_to.to_string());
        self.healing_score = Some(score);
        self
    }

    pub fn resolved(mut self, strategy: StrategyKind) -> Self {
        self.resolved_by = Some(strategy);
        self
    }

    pub fn failed(mut self, reason: impl ToString) -> Self {
        self.failure = Some(reason.to_string());
        self
    }

    /// Attempts made in a given phase.
    pub fn attempts_in(&self, phase: Phase) -> usize {
        self.attempts.iter().filter(|a| a.phase == phase).count()
    }
}
