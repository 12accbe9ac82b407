//! Cluster validation types.

use reqwest::Url;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Default wait for replication before members are read.
pub const DEFAULT_REPLICATION_DELAY_SECS: u64 = 5;

/// Default number of member reads in flight.
pub const DEFAULT_WORKERS: usize = 8;

/// Phases of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPhase {
    /// Querying the captain's readiness.
    CheckingCaptain,
    /// Reading the member roster.
    DiscoveringMembers,
    /// Waiting for replication.
    Waiting,
    /// Reading stanzas back from every member.
    VerifyingMembers,
    /// Finished; the tally is final.
    Done,
    /// Stopped early; no stanza was verified.
    Aborted,
}

/// Settings of a validation run.
#[derive(Debug, Clone, Copy)]
pub struct ClusterCheckConfig {
    /// Fixed wait between discovery and verification.
    pub delay: Duration,
    /// Maximum concurrent member reads.
    pub workers: usize,
}

/// One member of the cluster.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterMember {
    /// Member label.
    pub name: String,
    /// Management URI the member is read through.
    pub management_uri: String,
    /// Parsed management base URL.
    #[serde(skip)]
    pub base_url: Url,
    /// Whether every request to the member got a response.
    pub reachable: bool,
}

/// A setting whose replicated value differs from the applied one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingMismatch {
    /// Setting key.
    pub key: String,
    /// Applied value.
    pub expected: String,
    /// Value read from the member (empty when absent).
    pub actual: String,
}

/// What a member read revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckFinding {
    /// Every applied setting matches.
    Pass,
    /// The stanza exists but some settings differ.
    Drift {
        /// Differing settings.
        mismatches: Vec<SettingMismatch>,
    },
    /// The member returned 404 for the stanza.
    Missing,
    /// The member answered with an unexpected status or body.
    Error {
        /// Description of the problem.
        message: String,
    },
    /// The member could not be reached.
    Unreachable {
        /// Transport error.
        message: String,
    },
}

/// Outcome of checking one stanza on one member.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    /// Stanza title.
    pub stanza: String,
    /// Stanza path on the management port.
    pub stanza_path: String,
    /// Member name.
    pub member: String,
    /// Whether the check passed.
    pub passed: bool,
    /// Details of the check.
    pub finding: CheckFinding,
}

/// Report of a validation run.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// Phase the run ended in.
    pub phase: ValidationPhase,
    /// Captain label, once the captain was found healthy.
    pub captain: Option<String>,
    /// Discovered members.
    pub members: Vec<ClusterMember>,
    /// Per (stanza, member) results, sorted by member then stanza.
    pub results: Vec<VerificationResult>,
    /// Why the run was aborted.
    pub abort_reason: Option<String>,
}

impl ClusterCheckConfig {
    /// Creates a configuration.
    #[must_use]
    pub const fn new(delay: Duration, workers: usize) -> Self {
        Self { delay, workers }
    }
}

impl std::fmt::Display for ValidationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CheckingCaptain => "checking captain",
            Self::DiscoveringMembers => "discovering members",
            Self::Waiting => "waiting",
            Self::VerifyingMembers => "verifying members",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        write!(f, "{s}")
    }
}

impl CheckFinding {
    /// Short label used in logs and tables.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Drift { .. } => "DRIFT",
            Self::Missing => "MISSING",
            Self::Error { .. } => "ERROR",
            Self::Unreachable { .. } => "UNREACHABLE",
        }
    }
}

impl VerificationResult {
    /// Creates a result; only [`CheckFinding::Pass`] counts as passed.
    #[must_use]
    pub fn new(
        stanza: impl Into<String>,
        stanza_path: impl Into<String>,
        member: impl Into<String>,
        finding: CheckFinding,
    ) -> Self {
        Self {
            stanza: stanza.into(),
            stanza_path: stanza_path.into(),
            member: member.into(),
            passed: finding == CheckFinding::Pass,
            finding,
        }
    }
}

impl ValidationReport {
    /// Creates an empty report in the first phase.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: ValidationPhase::CheckingCaptain,
            captain: None,
            members: Vec::new(),
            results: Vec::new(),
            abort_reason: None,
        }
    }

    /// Returns true if the run was aborted.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.phase == ValidationPhase::Aborted
    }

    /// Number of discovered members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Number of checks attempted.
    #[must_use]
    pub fn checks_total(&self) -> usize {
        self.results.len()
    }

    /// Number of checks that passed.
    #[must_use]
    pub fn checks_passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// Passed flag of every distinct stanza: true when all its checks passed.
    fn stanza_verdicts(&self) -> BTreeMap<&str, bool> {
        let mut verdicts: BTreeMap<&str, bool> = BTreeMap::new();
        for result in &self.results {
            let entry = verdicts.entry(result.stanza_path.as_str()).or_insert(true);
            *entry &= result.passed;
        }
        verdicts
    }

    /// Number of distinct stanzas checked.
    #[must_use]
    pub fn stanzas_checked(&self) -> usize {
        self.stanza_verdicts().len()
    }

    /// Number of stanzas whose every member check passed.
    #[must_use]
    pub fn stanzas_verified(&self) -> usize {
        self.stanza_verdicts().values().filter(|ok| **ok).count()
    }

    /// Number of checks with the given finding label.
    #[must_use]
    pub fn count_label(&self, label: &str) -> usize {
        self.results
            .iter()
            .filter(|r| r.finding.label() == label)
            .count()
    }

    /// Returns true if the run finished and every check passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.phase == ValidationPhase::Done && self.checks_passed() == self.checks_total()
    }

    /// Breakdown of the failed checks, empty when nothing failed.
    #[must_use]
    pub fn breakdown(&self) -> String {
        let parts: Vec<String> = ["DRIFT", "MISSING", "ERROR", "UNREACHABLE"]
            .iter()
            .filter_map(|label| {
                let count = self.count_label(label);
                (count > 0).then(|| format!("{count} {}", label.to_lowercase()))
            })
            .collect();
        parts.join(", ")
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} stanzas verified across {} members ({}/{} checks passed)",
            self.stanzas_verified(),
            self.stanzas_checked(),
            self.member_count(),
            self.checks_passed(),
            self.checks_total()
        )
    }
}
