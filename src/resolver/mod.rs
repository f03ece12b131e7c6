pub mod engine;
pub mod strategy;

pub use engine::{LiveHandle, LocatorResolver};
pub use strategy::{ActionKind, StrategyAttempt, StrategyKind, strategy_chain};
