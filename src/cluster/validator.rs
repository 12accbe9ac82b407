//! Cluster validator.
//!
//! Runs the validation phases in order:
//! `CheckingCaptain -> DiscoveringMembers -> Waiting -> VerifyingMembers -> Done`,
//! or stops in `Aborted` when the captain cannot be used. Validation never
//! changes the outcome of already applied items.

use reqwest::Url;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn, Instrument, Span};

use crate::apply::ApplyOutcome;
use crate::config::{setting_text, DEFAULT_PORT};
use crate::error::{ApplyError, ClusterError};
use crate::splunk::{url_on, CaptainInfo, MemberInfo, SplunkClient};

use super::types::{
    CheckFinding, ClusterCheckConfig, ClusterMember, SettingMismatch, ValidationPhase,
    ValidationReport, VerificationResult,
};

/// Captain status endpoint.
const CAPTAIN_INFO_PATH: &str = "/services/shcluster/captain/info";

/// Member roster endpoint.
const CAPTAIN_MEMBERS_PATH: &str = "/services/shcluster/captain/members";

/// An applied stanza as it should look on every member.
#[derive(Debug)]
struct ExpectedStanza {
    title: String,
    path: String,
    settings: BTreeMap<String, String>,
}

/// Validator checking that applied stanzas reached every cluster member.
#[derive(Debug)]
pub struct ClusterValidator<'a> {
    /// Management API client.
    client: &'a SplunkClient,
    /// Base URL of the coordinating node.
    coordinator: Url,
    /// Delay and concurrency.
    config: ClusterCheckConfig,
    /// Span of the current invocation.
    span: Span,
}

impl<'a> ClusterValidator<'a> {
    /// Creates a validator talking to the given coordinating node.
    #[must_use]
    pub fn new(client: &'a SplunkClient, coordinator: Url, config: ClusterCheckConfig) -> Self {
        Self {
            client,
            coordinator,
            config,
            span: Span::none(),
        }
    }

    /// Sets the span every log line of the validation is recorded in.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Validates the created and updated stanzas of a batch.
    ///
    /// Returns `None` without contacting the cluster when no outcome
    /// succeeded.
    pub async fn validate(&self, outcomes: &[ApplyOutcome]) -> Option<ValidationReport> {
        let stanzas = expected_stanzas(outcomes);
        if stanzas.is_empty() {
            self.span.in_scope(|| {
                info!("Cluster Validation: no applied stanzas to verify. Skipping.");
            });
            return None;
        }

        Some(self.run_phases(stanzas).instrument(self.span.clone()).await)
    }

    async fn run_phases(&self, stanzas: Vec<Arc<ExpectedStanza>>) -> ValidationReport {
        let mut report = ValidationReport::new();
        let mut phase = ValidationPhase::CheckingCaptain;

        loop {
            debug!("Cluster Validation: entering phase '{phase}'");

            phase = match phase {
                ValidationPhase::CheckingCaptain => {
                    info!("Cluster Validation: checking captain health...");
                    match self.check_captain().await {
                        Ok(label) => {
                            report.captain = Some(label);
                            ValidationPhase::DiscoveringMembers
                        }
                        Err(e) => Self::abort(&mut report, &e),
                    }
                }
                ValidationPhase::DiscoveringMembers => match self.discover_members().await {
                    Ok(members) if members.is_empty() => {
                        error!("Cluster Validation: no members discovered.");
                        ValidationPhase::Done
                    }
                    Ok(members) => {
                        info!(
                            "Cluster Validation: discovered {} member(s): {}",
                            members.len(),
                            members
                                .iter()
                                .map(|m| m.name.as_str())
                                .collect::<Vec<_>>()
                                .join(", ")
                        );
                        report.members = members;
                        ValidationPhase::Waiting
                    }
                    Err(e) => Self::abort(&mut report, &e),
                },
                ValidationPhase::Waiting => {
                    info!(
                        "Cluster Validation: waiting {}s for knowledge bundle replication...",
                        self.config.delay.as_secs()
                    );
                    tokio::time::sleep(self.config.delay).await;
                    ValidationPhase::VerifyingMembers
                }
                ValidationPhase::VerifyingMembers => {
                    report.results = self.verify(&stanzas, &report.members).await;
                    let unreachable: HashSet<&str> = report
                        .results
                        .iter()
                        .filter(|r| matches!(r.finding, CheckFinding::Unreachable { .. }))
                        .map(|r| r.member.as_str())
                        .collect();
                    for member in &mut report.members {
                        member.reachable = !unreachable.contains(member.name.as_str());
                    }
                    ValidationPhase::Done
                }
                ValidationPhase::Done | ValidationPhase::Aborted => break,
            };

            report.phase = phase;
        }

        if report.is_aborted() {
            warn!("Cluster Validation: aborted; applied changes are unaffected.");
        } else {
            info!("Cluster Validation: {report}");
            let breakdown = report.breakdown();
            if !breakdown.is_empty() {
                warn!("Cluster Validation: failed checks: {breakdown}");
            }
        }

        report
    }

    fn abort(report: &mut ValidationReport, e: &ClusterError) -> ValidationPhase {
        match e {
            ClusterError::NotClustered { .. } | ClusterError::CaptainUnhealthy { .. } => {
                warn!("Cluster Validation: {e}. Skipping validation.");
            }
            _ => error!("Cluster Validation: {e}"),
        }
        report.abort_reason = Some(e.to_string());
        ValidationPhase::Aborted
    }

    /// Queries the captain and returns its label when the cluster is ready.
    async fn check_captain(&self) -> Result<String, ClusterError> {
        let url = url_on(&self.coordinator, CAPTAIN_INFO_PATH);
        let response = self
            .client
            .get_json(url)
            .await
            .map_err(|e| ClusterError::CaptainUnreachable {
                message: e.to_string(),
            })?;

        if matches!(response.status, 404 | 503) {
            info!("Captain info returned HTTP {}: {}", response.status, response.body.trim());
            return Err(ClusterError::NotClustered {
                status: response.status,
            });
        }

        if !response.is_success() {
            return Err(ClusterError::CaptainUnreachable {
                message: ApplyError::rejected(response.status, &response.body).to_string(),
            });
        }

        let info = response
            .first_entry::<CaptainInfo>()
            .map_err(|e| ClusterError::CaptainUnreachable {
                message: e.to_string(),
            })?
            .content;

        let label = info.label_or_unknown();
        if !info.is_ready() {
            return Err(ClusterError::CaptainUnhealthy {
                label,
                flag: info.ready_flag(),
            });
        }

        info!("Cluster Validation: captain '{label}' is healthy (service_ready_flag=1)");
        Ok(label)
    }

    /// Reads the member roster from the captain.
    async fn discover_members(&self) -> Result<Vec<ClusterMember>, ClusterError> {
        let url = url_on(&self.coordinator, CAPTAIN_MEMBERS_PATH);
        let response = self
            .client
            .get_json(url)
            .await
            .map_err(|e| ClusterError::MemberDiscoveryFailed {
                message: e.to_string(),
            })?;

        if !response.is_success() {
            return Err(ClusterError::MemberDiscoveryFailed {
                message: ApplyError::rejected(response.status, &response.body).to_string(),
            });
        }

        let feed = response
            .feed::<MemberInfo>()
            .map_err(|e| ClusterError::MemberDiscoveryFailed {
                message: e.to_string(),
            })?;

        let mut members: Vec<ClusterMember> = feed
            .entry
            .into_iter()
            .filter_map(|entry| {
                let uri = entry.content.management_uri.filter(|u| !u.is_empty())?;
                let Ok(mut base_url) = Url::parse(&uri) else {
                    warn!("Cluster Validation: ignoring member with invalid management URI '{uri}'");
                    return None;
                };
                if base_url.port().is_none() && base_url.set_port(Some(DEFAULT_PORT)).is_err() {
                    return None;
                }

                let name = entry
                    .content
                    .label
                    .filter(|l| !l.is_empty())
                    .or_else(|| Some(entry.name).filter(|n| !n.is_empty()))
                    .unwrap_or_else(|| String::from("unknown"));

                Some(ClusterMember {
                    name,
                    management_uri: uri,
                    base_url,
                    reachable: true,
                })
            })
            .collect();

        members.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(members)
    }

    /// Reads every stanza from every member, at most `workers` at a time.
    async fn verify(
        &self,
        stanzas: &[Arc<ExpectedStanza>],
        members: &[ClusterMember],
    ) -> Vec<VerificationResult> {
        let permits = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let mut tasks = JoinSet::new();

        for stanza in stanzas {
            for member in members {
                let client = self.client.clone();
                let stanza = Arc::clone(stanza);
                let member = member.clone();
                let permits = Arc::clone(&permits);

                tasks.spawn(
                    async move {
                        let _permit = permits.acquire_owned().await;
                        check_member(&client, &member, &stanza).await
                    }
                    .in_current_span(),
                );
            }
        }

        let mut results = Vec::with_capacity(stanzas.len() * members.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => error!("Cluster Validation: verification task failed: {e}"),
            }
        }
        fill_lost_checks(&mut results, stanzas, members);

        results.sort_by(|a, b| {
            a.member
                .cmp(&b.member)
                .then_with(|| a.stanza.cmp(&b.stanza))
                .then_with(|| a.stanza_path.cmp(&b.stanza_path))
        });
        results
    }
}

/// Collects the distinct applied stanzas of a batch, in input order.
///
/// Items applied to the same path merge their settings; later items win
/// per key, as the member holds the last write.
fn expected_stanzas(outcomes: &[ApplyOutcome]) -> Vec<Arc<ExpectedStanza>> {
    let mut stanzas: Vec<ExpectedStanza> = Vec::new();
    let mut by_path: HashMap<&str, usize> = HashMap::new();

    for outcome in outcomes {
        let Some(target) = outcome.applied_target() else {
            continue;
        };
        let settings = &outcome.item.settings;

        if let Some(&index) = by_path.get(target.stanza_path.as_str()) {
            stanzas[index]
                .settings
                .extend(settings.iter().map(|(k, v)| (k.clone(), v.clone())));
        } else {
            by_path.insert(target.stanza_path.as_str(), stanzas.len());
            stanzas.push(ExpectedStanza {
                title: outcome.item.title.clone(),
                path: target.stanza_path.clone(),
                settings: settings.clone(),
            });
        }
    }

    stanzas.into_iter().map(Arc::new).collect()
}

/// Adds an error result for every (stanza, member) pair that produced none.
fn fill_lost_checks(
    results: &mut Vec<VerificationResult>,
    stanzas: &[Arc<ExpectedStanza>],
    members: &[ClusterMember],
) {
    let checked: HashSet<(String, String)> = results
        .iter()
        .map(|r| (r.member.clone(), r.stanza_path.clone()))
        .collect();

    for member in members {
        for stanza in stanzas {
            if !checked.contains(&(member.name.clone(), stanza.path.clone())) {
                results.push(VerificationResult::new(
                    stanza.title.clone(),
                    stanza.path.clone(),
                    member.name.clone(),
                    CheckFinding::Error {
                        message: String::from("verification task did not complete"),
                    },
                ));
            }
        }
    }
}

/// Reads one stanza from one member and compares it.
async fn check_member(
    client: &SplunkClient,
    member: &ClusterMember,
    stanza: &ExpectedStanza,
) -> VerificationResult {
    let url = url_on(&member.base_url, &stanza.path);
    let title = &stanza.title;
    let name = &member.name;

    let finding = match client.get_json(url).await {
        Err(e) => {
            error!("  [{name}] {title}: ERROR ({e})");
            CheckFinding::Unreachable {
                message: e.to_string(),
            }
        }
        Ok(response) if response.is_not_found() => {
            warn!("  [{name}] {title}: MISSING");
            CheckFinding::Missing
        }
        Ok(response) if !response.is_success() => {
            error!("  [{name}] {title}: ERROR (HTTP {})", response.status);
            CheckFinding::Error {
                message: format!("HTTP {}", response.status),
            }
        }
        Ok(response) => match response.stanza_content() {
            Ok(content) => compare_settings(&stanza.settings, &content),
            Err(e) => {
                error!("  [{name}] {title}: ERROR ({e})");
                CheckFinding::Error {
                    message: e.to_string(),
                }
            }
        },
    };

    match &finding {
        CheckFinding::Pass => info!("  [{name}] {title}: PASS"),
        CheckFinding::Drift { mismatches } => {
            warn!("  [{name}] {title}: DRIFT");
            for m in mismatches {
                warn!("    {}: expected={:?}, got={:?}", m.key, m.expected, m.actual);
            }
        }
        _ => {}
    }

    VerificationResult::new(title.clone(), stanza.path.clone(), name.clone(), finding)
}

/// Compares applied settings against a member's stanza content.
///
/// Keys missing on the member read as empty. Boolean spellings
/// (`1`/`true`/`yes`/`on` and their negatives) compare equal.
fn compare_settings(expected: &BTreeMap<String, String>, remote: &Map<String, Value>) -> CheckFinding {
    let mismatches: Vec<SettingMismatch> = expected
        .iter()
        .filter_map(|(key, want)| {
            let actual = remote.get(key).map(setting_text).unwrap_or_default();
            (!values_match(want, &actual)).then(|| SettingMismatch {
                key: key.clone(),
                expected: want.clone(),
                actual,
            })
        })
        .collect();

    if mismatches.is_empty() {
        CheckFinding::Pass
    } else {
        CheckFinding::Drift { mismatches }
    }
}

fn values_match(expected: &str, actual: &str) -> bool {
    expected == actual
        || matches!((as_bool(expected), as_bool(actual)), (Some(a), Some(b)) if a == b)
}

fn as_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}
