//! Splunk management API integration module.
//!
//! This module provides the REST transport used by the apply engine and the
//! cluster validator, and the resolution of change items to stanza paths.

mod client;
mod types;
mod target;

pub use client::{ClientSettings, SplunkClient};
pub use types::{CaptainInfo, Entry, Feed, MemberInfo, RemoteResponse};
pub use target::{encode_segment, url_on, ResolvedTarget, TargetResolver};
