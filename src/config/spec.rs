//! Change item types for the bulk configuration tool.
//!
//! These types map to the entries of a change file. A change file is an
//! ordered list of stanzas together with the settings each one should carry.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Default management port of a Splunk instance.
pub const DEFAULT_PORT: u16 = 8089;

/// Default app context used when an item does not name one.
pub const DEFAULT_APP: &str = "search";

/// Default namespace root (owner-scoped REST namespace).
pub const DEFAULT_NAMESPACE: &str = "servicesNS/nobody";

/// One unit of desired configuration state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeItem {
    /// Stanza name.
    #[serde(default)]
    pub title: String,
    /// App context; falls back to [`TargetDefaults::app`] when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    /// Full resource locator of an existing stanza (the `id` of a REST entry).
    #[serde(
        default,
        rename = "id",
        alias = "resourceRef",
        alias = "resource_ref",
        skip_serializing_if = "Option::is_none"
    )]
    pub resource_ref: Option<String>,
    /// Settings written to the stanza, sent as one form body.
    #[serde(
        default,
        rename = "configs",
        alias = "settings",
        deserialize_with = "deserialize_settings"
    )]
    pub settings: BTreeMap<String, String>,
}

/// Deployment-specific defaults used to compose stanza paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetDefaults {
    /// Namespace root, e.g. `servicesNS/nobody`.
    pub namespace: String,
    /// App used for items without an explicit app.
    pub app: String,
}

impl Default for TargetDefaults {
    fn default() -> Self {
        Self {
            namespace: String::from(DEFAULT_NAMESPACE),
            app: String::from(DEFAULT_APP),
        }
    }
}

impl TargetDefaults {
    /// Creates defaults from a namespace root and an app.
    ///
    /// Leading and trailing slashes of the namespace are ignored.
    #[must_use]
    pub fn new(namespace: impl AsRef<str>, app: impl Into<String>) -> Self {
        Self {
            namespace: namespace.as_ref().trim_matches('/').to_string(),
            app: app.into(),
        }
    }
}

impl ChangeItem {
    /// Creates an item addressed by title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            app: None,
            resource_ref: None,
            settings: BTreeMap::new(),
        }
    }

    /// Sets the app context.
    #[must_use]
    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app = Some(app.into());
        self
    }

    /// Sets the full resource reference.
    #[must_use]
    pub fn with_resource_ref(mut self, resource_ref: impl Into<String>) -> Self {
        self.resource_ref = Some(resource_ref.into());
        self
    }

    /// Adds one setting.
    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Returns the app of this item, or the default one.
    #[must_use]
    pub fn app_or<'a>(&'a self, defaults: &'a TargetDefaults) -> &'a str {
        self.app
            .as_deref()
            .filter(|app| !app.is_empty())
            .unwrap_or(&defaults.app)
    }

    /// Returns the resource reference if one is set and non-blank.
    #[must_use]
    pub fn resource_ref(&self) -> Option<&str> {
        self.resource_ref
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }
}

/// Renders a JSON value the way it is written into a form body.
///
/// Strings are kept verbatim, `null` becomes empty and anything else uses
/// its JSON text.
#[must_use]
pub fn setting_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn deserialize_settings<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .iter()
        .map(|(key, value)| (key.clone(), setting_text(value)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_export_field_names() {
        let json = r#"{
            "title": "my_search",
            "app": "ops",
            "id": "https://sh1:8089/servicesNS/nobody/ops/saved/searches/my_search",
            "configs": { "search": "index=main", "disabled": 0, "is_visible": true, "description": null }
        }"#;

        let item: ChangeItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.title, "my_search");
        assert_eq!(item.app.as_deref(), Some("ops"));
        assert!(item.resource_ref().is_some());
        assert_eq!(item.settings["search"], "index=main");
        assert_eq!(item.settings["disabled"], "0");
        assert_eq!(item.settings["is_visible"], "true");
        assert_eq!(item.settings["description"], "");
    }

    #[test]
    fn test_deserialize_aliases() {
        let json = r#"{ "title": "t", "resourceRef": "/servicesNS/nobody/search/x/t", "settings": { "a": "b" } }"#;
        let item: ChangeItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.resource_ref(), Some("/servicesNS/nobody/search/x/t"));
        assert_eq!(item.settings.len(), 1);
    }

    #[test]
    fn test_app_falls_back_to_default() {
        let defaults = TargetDefaults::default();
        assert_eq!(ChangeItem::new("t").app_or(&defaults), "search");
        assert_eq!(ChangeItem::new("t").with_app("").app_or(&defaults), "search");
        assert_eq!(ChangeItem::new("t").with_app("ops").app_or(&defaults), "ops");
    }

    #[test]
    fn test_blank_resource_ref_is_ignored() {
        let item = ChangeItem::new("t").with_resource_ref("   ");
        assert!(item.resource_ref().is_none());
    }

    #[test]
    fn test_namespace_slashes_are_trimmed() {
        let defaults = TargetDefaults::new("/servicesNS/admin/", "search");
        assert_eq!(defaults.namespace, "servicesNS/admin");
    }
}
