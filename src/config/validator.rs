//! Validation of change items.
//!
//! Items are validated one by one: an invalid item fails on its own and
//! never prevents the rest of the batch from being applied.

use crate::error::ConfigError;
use tracing::debug;

use super::spec::ChangeItem;

/// Form field injected on create; it must not be supplied by the item.
const RESERVED_NAME_FIELD: &str = "name";

/// Validator for change items.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChangeValidator {
    /// Whether a conf type is available for path composition.
    has_conf_type: bool,
}

/// A problem found in one item of a change list.
#[derive(Debug)]
pub struct ValidationIssue {
    /// Position of the item in the change list.
    pub index: usize,
    /// Title of the item (possibly empty).
    pub title: String,
    /// What is wrong with it.
    pub error: ConfigError,
}

impl ChangeValidator {
    /// Creates a validator.
    #[must_use]
    pub const fn new(has_conf_type: bool) -> Self {
        Self { has_conf_type }
    }

    /// Validates a single item.
    ///
    /// # Errors
    ///
    /// Returns the first problem found in the item.
    pub fn check_item(&self, item: &ChangeItem) -> std::result::Result<(), ConfigError> {
        if item.title.trim().is_empty() {
            return Err(ConfigError::validation("Stanza title cannot be empty", "title"));
        }

        if item.settings.is_empty() {
            return Err(ConfigError::validation(
                format!("Stanza '{}' has no settings to apply", item.title),
                "configs",
            ));
        }

        if item.settings.contains_key(RESERVED_NAME_FIELD) {
            return Err(ConfigError::validation(
                format!(
                    "Stanza '{}' must not set '{RESERVED_NAME_FIELD}' in its settings",
                    item.title
                ),
                "configs.name",
            ));
        }

        if item.resource_ref().is_none() && !self.has_conf_type {
            return Err(ConfigError::UnresolvedTarget {
                title: item.title.clone(),
            });
        }

        Ok(())
    }

    /// Validates a whole change list and returns every problem found.
    #[must_use]
    pub fn check_all(&self, items: &[ChangeItem]) -> Vec<ValidationIssue> {
        let issues: Vec<ValidationIssue> = items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                self.check_item(item).err().map(|error| ValidationIssue {
                    index,
                    title: item.title.clone(),
                    error,
                })
            })
            .collect();

        debug!("Validated {} item(s), {} issue(s)", items.len(), issues.len());
        issues
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} [{}]: {}", self.index + 1, self.title, self.error)
    }
}
