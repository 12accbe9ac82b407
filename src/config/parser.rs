//! Change file parser.
//!
//! This module loads the ordered list of change items from a JSON file (or a
//! YAML file, chosen by extension) and resolves the bearer token from the
//! environment, optionally seeded from a `.env` file.

use crate::error::{ConfigError, Result, SplunkConfError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::ChangeItem;

/// Environment variable holding the bearer token.
pub const TOKEN_ENV_VAR: &str = "SPLUNK_TOKEN";

/// Supported change file encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeFileFormat {
    Json,
    Yaml,
}

/// Parser for change files.
#[derive(Debug, Default)]
pub struct ChangeFileParser {
    /// Base path used to look up the `.env` file.
    base_path: Option<PathBuf>,
}

impl ChangeFileParser {
    /// Creates a new change file parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for the `.env` lookup.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads all change items from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Vec<ChangeItem>> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SplunkConfError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            SplunkConfError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        let items = match Self::format_of(path) {
            ChangeFileFormat::Json => self.parse_json(&content, Some(path))?,
            ChangeFileFormat::Yaml => self.parse_yaml(&content, Some(path))?,
        };

        info!("Loaded {} stanza(s) from {}", items.len(), path.display());
        Ok(items)
    }

    /// Loads change items and keeps only the first `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_limited(
        &self,
        path: impl AsRef<Path>,
        limit: Option<usize>,
    ) -> Result<Vec<ChangeItem>> {
        let mut items = self.load_file(path)?;

        if let Some(limit) = limit {
            info!(
                "--test-run {limit}: processing first {} of {} stanza(s)",
                limit.min(items.len()),
                items.len()
            );
            items.truncate(limit);
        }

        Ok(items)
    }

    /// Parses change items from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not a list of change items.
    pub fn parse_json(&self, content: &str, source: Option<&Path>) -> Result<Vec<ChangeItem>> {
        debug!("Parsing JSON change list");

        serde_json::from_str(content).map_err(|e| {
            SplunkConfError::Config(ConfigError::ParseError {
                message: format!("JSON parse error: {e}"),
                location: source.map(|p| p.display().to_string()),
            })
        })
    }

    /// Parses change items from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is not a list of change items.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<Vec<ChangeItem>> {
        debug!("Parsing YAML change list");

        serde_yaml::from_str(content).map_err(|e| {
            SplunkConfError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location: source.map(|p| p.display().to_string()),
            })
        })
    }

    fn format_of(path: &Path) -> ChangeFileFormat {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                ChangeFileFormat::Yaml
            }
            _ => ChangeFileFormat::Json,
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                SplunkConfError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Gets the bearer token from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not set.
    pub fn get_token() -> Result<String> {
        std::env::var(TOKEN_ENV_VAR)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                SplunkConfError::Config(ConfigError::MissingEnvVar {
                    name: String::from(TOKEN_ENV_VAR),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_json_list() {
        let json = r#"[
            { "title": "first", "configs": { "search": "index=a" } },
            { "title": "second", "app": "ops", "configs": { "search": "index=b" } }
        ]"#;

        let items = ChangeFileParser::new().parse_json(json, None).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "first");
        assert_eq!(items[1].app.as_deref(), Some("ops"));
    }

    #[test]
    fn test_parse_json_rejects_object() {
        let result = ChangeFileParser::new().parse_json(r#"{ "title": "x" }"#, None);
        assert!(matches!(
            result,
            Err(SplunkConfError::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_parse_yaml_list() {
        let yaml = r"
- title: macro_one
  configs:
    definition: index=main
    iseval: 0
";
        let items = ChangeFileParser::new().parse_yaml(yaml, None).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].settings["iseval"], "0");
    }

    #[test]
    fn test_load_missing_file() {
        let result = ChangeFileParser::new().load_file("/definitely/not/here.json");
        assert!(matches!(
            result,
            Err(SplunkConfError::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_load_limited_truncates() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{"title":"a","configs":{{"k":"1"}}}},{{"title":"b","configs":{{"k":"2"}}}},{{"title":"c","configs":{{"k":"3"}}}}]"#
        )
        .unwrap();

        let parser = ChangeFileParser::new();
        let items = parser.load_limited(file.path(), Some(2)).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].title, "b");

        let all = parser.load_limited(file.path(), None).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_yaml_extension_selects_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "- title: y\n  configs:\n    k: v").unwrap();

        let items = ChangeFileParser::new().load_file(file.path()).unwrap();
        assert_eq!(items[0].title, "y");
    }
}
