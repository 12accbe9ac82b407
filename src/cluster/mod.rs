//! Cluster replication validation.
//!
//! After a batch, the validator checks the captain of a search head
//! cluster, discovers its members, waits for replication and reads every
//! applied stanza back from every member.

mod types;
mod validator;

pub use types::{
    CheckFinding, ClusterCheckConfig, ClusterMember, SettingMismatch, ValidationPhase,
    ValidationReport, VerificationResult, DEFAULT_REPLICATION_DELAY_SECS, DEFAULT_WORKERS,
};
pub use validator::ClusterValidator;
