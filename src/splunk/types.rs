//! Splunk REST response types.
//!
//! Reads use `output_mode=json`, which wraps every resource in an Atom-style
//! feed: `{"entry": [{"name": ..., "content": {...}}]}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApplyError;

/// A JSON feed returned by a collection or entity endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Feed<T> {
    /// Entries of the feed.
    #[serde(default = "Vec::new")]
    pub entry: Vec<Entry<T>>,
}

/// One entry of a feed.
#[derive(Debug, Clone, Deserialize)]
pub struct Entry<T> {
    /// Entry name (the stanza name for conf entities).
    #[serde(default)]
    pub name: String,
    /// Entry content.
    pub content: T,
}

/// Content of `shcluster/captain/info`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptainInfo {
    /// Captain label.
    #[serde(default)]
    pub label: Option<String>,
    /// Readiness flag; reported as `1`/`0`, `"1"`/`"0"` or a boolean.
    #[serde(default)]
    pub service_ready_flag: Value,
}

/// Content of one `shcluster/captain/members` entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberInfo {
    /// Member label.
    #[serde(default)]
    pub label: Option<String>,
    /// Management URI, e.g. `https://sh2.example.com:8089`.
    #[serde(default)]
    pub management_uri: Option<String>,
}

/// Raw response of a management API call.
#[derive(Debug, Clone)]
pub struct RemoteResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl CaptainInfo {
    /// Returns the readiness flag as text.
    #[must_use]
    pub fn ready_flag(&self) -> String {
        match &self.service_ready_flag {
            Value::Bool(true) => String::from("1"),
            Value::Bool(false) => String::from("0"),
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Returns true if the captain reports the cluster as ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        let flag = self.ready_flag();
        flag == "1" || flag.eq_ignore_ascii_case("true")
    }

    /// Returns the captain label or `unknown`.
    #[must_use]
    pub fn label_or_unknown(&self) -> String {
        self.label.clone().unwrap_or_else(|| String::from("unknown"))
    }
}

impl RemoteResponse {
    /// Returns true for any 2xx status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Returns true for HTTP 404.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Parses the body as a feed and returns the first entry's content.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not a feed or the feed is empty.
    pub fn first_entry<T: for<'de> Deserialize<'de>>(&self) -> std::result::Result<Entry<T>, ApplyError> {
        self.feed::<T>()?
            .entry
            .into_iter()
            .next()
            .ok_or_else(|| ApplyError::InvalidResponse {
                message: String::from("Feed has no entries"),
            })
    }

    /// Parses the body as a feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not a feed.
    pub fn feed<T: for<'de> Deserialize<'de>>(&self) -> std::result::Result<Feed<T>, ApplyError> {
        serde_json::from_str(&self.body).map_err(|e| ApplyError::InvalidResponse {
            message: format!("Failed to parse response: {e}"),
        })
    }

    /// Parses the body as a feed of free-form stanza settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not a feed or the feed is empty.
    pub fn stanza_content(&self) -> std::result::Result<Map<String, Value>, ApplyError> {
        self.first_entry::<Map<String, Value>>().map(|entry| entry.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> RemoteResponse {
        RemoteResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_captain_ready_flag_variants() {
        let parse = |json: &str| -> CaptainInfo { serde_json::from_str(json).unwrap() };

        assert!(parse(r#"{"service_ready_flag": 1}"#).is_ready());
        assert!(parse(r#"{"service_ready_flag": "1"}"#).is_ready());
        assert!(parse(r#"{"service_ready_flag": true}"#).is_ready());
        assert!(!parse(r#"{"service_ready_flag": 0}"#).is_ready());
        assert!(!parse(r#"{"service_ready_flag": false}"#).is_ready());
        assert!(!parse(r"{}").is_ready());
        assert_eq!(parse(r"{}").label_or_unknown(), "unknown");
    }

    #[test]
    fn test_stanza_content() {
        let resp = response(
            200,
            r#"{"entry":[{"name":"m","content":{"definition":"index=main","iseval":false}}]}"#,
        );
        let content = resp.stanza_content().unwrap();
        assert_eq!(content["definition"], "index=main");
        assert!(resp.is_success());
    }

    #[test]
    fn test_empty_feed_is_invalid() {
        let resp = response(200, r#"{"entry":[]}"#);
        assert!(matches!(
            resp.stanza_content(),
            Err(ApplyError::InvalidResponse { .. })
        ));
        assert!(response(404, "").is_not_found());
    }
}
