//! Synthesis budgets and deadlines

use std::time::Duration;

use tokio::time::Instant;

use crate::models::metadata::SynthesisStrategy;

/// Point in time after which a synthesis attempt is abandoned.
///
/// Built on tokio's clock so tests can drive it with a paused runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    /// Budget this deadline was created with.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }
}

/// Budget granted to one attempt with `strategy`.
///
/// Decompilation never runs with less than `decompile_floor`.
pub fn effective_budget(
    strategy: SynthesisStrategy,
    requested: Duration,
    decompile_floor: Duration,
) -> Duration {
    match strategy {
        SynthesisStrategy::Decompile => requested.max(decompile_floor),
        SynthesisStrategy::StubFromSignature => requested,
    }
}
