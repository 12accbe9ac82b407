//! Per-item apply outcomes.

use serde::Serialize;

use crate::config::ChangeItem;
use crate::splunk::ResolvedTarget;

/// Status of one applied item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyStatus {
    /// The stanza did not exist and was created.
    Created,
    /// The existing stanza was updated.
    Updated,
    /// The stanza did not exist and update-only mode prevented creating it.
    Skipped,
    /// The item could not be applied.
    Failed,
}

/// Result of processing one change item.
#[derive(Debug, Clone, Serialize)]
pub struct ApplyOutcome {
    /// The originating item.
    pub item: ChangeItem,
    /// Outcome status.
    pub status: ApplyStatus,
    /// Human-readable reason.
    pub detail: String,
    /// Resolved paths; always present for created and updated items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ResolvedTarget>,
}

impl ApplyStatus {
    /// Returns true for created and updated items.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Created | Self::Updated)
    }
}

impl std::fmt::Display for ApplyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl ApplyOutcome {
    /// Outcome of a successful update.
    #[must_use]
    pub fn updated(item: &ChangeItem, target: ResolvedTarget, detail: impl Into<String>) -> Self {
        Self::with_target(item, ApplyStatus::Updated, target, detail)
    }

    /// Outcome of a successful create after a 404.
    #[must_use]
    pub fn created(item: &ChangeItem, target: ResolvedTarget, detail: impl Into<String>) -> Self {
        Self::with_target(item, ApplyStatus::Created, target, detail)
    }

    /// Outcome of a 404 in update-only mode.
    #[must_use]
    pub fn skipped(item: &ChangeItem, target: ResolvedTarget, detail: impl Into<String>) -> Self {
        Self::with_target(item, ApplyStatus::Skipped, target, detail)
    }

    /// Outcome of a failure; the target is kept when it was resolved.
    #[must_use]
    pub fn failed(
        item: &ChangeItem,
        target: Option<ResolvedTarget>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            item: item.clone(),
            status: ApplyStatus::Failed,
            detail: detail.into(),
            target,
        }
    }

    fn with_target(
        item: &ChangeItem,
        status: ApplyStatus,
        target: ResolvedTarget,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            item: item.clone(),
            status,
            detail: detail.into(),
            target: Some(target),
        }
    }

    /// Returns the resolved target of a created or updated item.
    #[must_use]
    pub fn applied_target(&self) -> Option<&ResolvedTarget> {
        if self.status.is_success() {
            self.target.as_ref()
        } else {
            None
        }
    }
}

impl std::fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.item.title, self.status, self.detail)
    }
}
