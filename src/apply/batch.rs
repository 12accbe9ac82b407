//! Batch runner for change lists.
//!
//! Items are applied strictly in input order, one at a time. A failed item
//! never stops the batch.

use serde::Serialize;
use tracing::{info, Instrument, Span};

use crate::config::ChangeItem;

use super::engine::ApplyEngine;
use super::outcome::{ApplyOutcome, ApplyStatus};

/// Runner applying a whole change list.
#[derive(Debug)]
pub struct BatchRunner<'a> {
    /// Engine applying single items.
    engine: &'a ApplyEngine,
    /// Span of the current invocation.
    span: Span,
}

/// Result of applying a change list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    /// Outcomes in input order.
    pub outcomes: Vec<ApplyOutcome>,
}

impl<'a> BatchRunner<'a> {
    /// Creates a new batch runner.
    #[must_use]
    pub fn new(engine: &'a ApplyEngine) -> Self {
        Self {
            engine,
            span: Span::none(),
        }
    }

    /// Sets the span every log line of the batch is recorded in.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Applies every item in order and collects the outcomes.
    pub async fn run(&self, items: &[ChangeItem]) -> BatchResult {
        self.run_items(items).instrument(self.span.clone()).await
    }

    async fn run_items(&self, items: &[ChangeItem]) -> BatchResult {
        let resolver = self.engine.resolver();
        info!(
            "Target: {} | update-only: {} | stanzas: {}",
            resolver.base(),
            self.engine.update_only(),
            items.len()
        );

        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            outcomes.push(self.engine.apply(item).await);
        }

        let result = BatchResult { outcomes };
        info!("{result}");
        result
    }
}

impl BatchResult {
    /// Number of outcomes with the given status.
    #[must_use]
    pub fn count(&self, status: ApplyStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Number of created plus updated items.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_success()).count()
    }

    /// Number of failed items.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(ApplyStatus::Failed)
    }

    /// Number of skipped items.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(ApplyStatus::Skipped)
    }

    /// Returns true if any item failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// Outcomes that were created or updated.
    pub fn succeeded_outcomes(&self) -> impl Iterator<Item = &ApplyOutcome> {
        self.outcomes.iter().filter(|o| o.status.is_success())
    }
}

impl std::fmt::Display for BatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Complete: {} succeeded, {} failed, {} skipped",
            self.succeeded(),
            self.failed(),
            self.skipped()
        )
    }
}
