//! Stanza path resolution.
//!
//! Every change item resolves to two paths on the management port: the
//! stanza path (updated in place) and the collection path (where the stanza
//! is created when the update returns 404).

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Url;
use serde::Serialize;

use crate::config::{ChangeItem, TargetDefaults};
use crate::error::{ConfigError, Result, SplunkConfError};

/// Characters escaped in a path segment: everything except RFC 3986 unreserved.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Resolved paths for one change item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTarget {
    /// Path of the stanza itself (update and read target).
    pub stanza_path: String,
    /// Path of the collection holding the stanza (create target).
    pub collection_path: String,
}

/// Resolver turning change items into request paths and URLs.
#[derive(Debug, Clone)]
pub struct TargetResolver {
    /// Management base URL, e.g. `https://sh1:8089`.
    base: Url,
    /// Conf type (`savedsearches`, `macros`, ...), absent in post-by-id mode.
    conf_type: Option<String>,
    /// Namespace and app defaults.
    defaults: TargetDefaults,
}

impl TargetResolver {
    /// Creates a resolver for `scheme://host:port`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port do not form a valid URL.
    pub fn new(
        scheme: &str,
        host: &str,
        port: u16,
        conf_type: Option<String>,
        defaults: TargetDefaults,
    ) -> Result<Self> {
        let base = Url::parse(&format!("{scheme}://{host}:{port}")).map_err(|e| {
            SplunkConfError::Config(ConfigError::validation(
                format!("Invalid management address '{scheme}://{host}:{port}': {e}"),
                "host",
            ))
        })?;

        Ok(Self::with_base(base, conf_type, defaults))
    }

    /// Creates a resolver from an already parsed base URL.
    #[must_use]
    pub fn with_base(base: Url, conf_type: Option<String>, defaults: TargetDefaults) -> Self {
        Self {
            base,
            conf_type: conf_type.filter(|t| !t.trim().is_empty()),
            defaults,
        }
    }

    /// Returns the management base URL.
    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    /// Returns the namespace and app defaults.
    #[must_use]
    pub const fn defaults(&self) -> &TargetDefaults {
        &self.defaults
    }

    /// Resolves the stanza and collection paths of an item.
    ///
    /// A resource reference wins over the title/app/type tuple.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnresolvedTarget`] when the item has no resource
    /// reference and no conf type is configured, or when the reference has no
    /// usable path.
    pub fn resolve(&self, item: &ChangeItem) -> std::result::Result<ResolvedTarget, ConfigError> {
        if let Some(reference) = item.resource_ref() {
            return Self::from_reference(reference).ok_or_else(|| ConfigError::UnresolvedTarget {
                title: item.title.clone(),
            });
        }

        let conf_type = self
            .conf_type
            .as_deref()
            .ok_or_else(|| ConfigError::UnresolvedTarget {
                title: item.title.clone(),
            })?;

        if item.title.is_empty() {
            return Err(ConfigError::UnresolvedTarget {
                title: item.title.clone(),
            });
        }

        let collection_path = format!(
            "/{}/{}/configs/conf-{}",
            self.defaults.namespace,
            encode_segment(item.app_or(&self.defaults)),
            encode_segment(conf_type),
        );
        let stanza_path = format!("{collection_path}/{}", encode_segment(&item.title));

        Ok(ResolvedTarget {
            stanza_path,
            collection_path,
        })
    }

    /// Extracts the paths from a full or path-only resource reference.
    fn from_reference(reference: &str) -> Option<ResolvedTarget> {
        let stanza_path = match Url::parse(reference) {
            Ok(url) => url.path().to_string(),
            Err(_) if reference.starts_with('/') => reference
                .split(['?', '#'])
                .next()
                .unwrap_or(reference)
                .to_string(),
            Err(_) => return None,
        };

        let trimmed = stanza_path.trim_end_matches('/');
        let (collection, name) = trimmed.rsplit_once('/')?;
        if name.is_empty() {
            return None;
        }

        Some(ResolvedTarget {
            collection_path: collection.to_string(),
            stanza_path: trimmed.to_string(),
        })
    }

    /// Builds the absolute URL of a path on this resolver's host.
    #[must_use]
    pub fn url_for(&self, path: &str) -> Url {
        url_on(&self.base, path)
    }
}

/// Builds the absolute URL of an already encoded path on another host.
#[must_use]
pub fn url_on(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    url.set_path(path);
    url.set_query(None);
    url
}

/// Percent-encodes one path segment.
#[must_use]
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}
