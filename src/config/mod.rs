//! Configuration module for the bulk configuration tool.
//!
//! This module handles everything that happens before the first request:
//! - Change item types and deployment defaults
//! - Loading change files (JSON or YAML) and the `.env` file
//! - Offline validation of change items

mod spec;
mod parser;
mod validator;

pub use spec::{
    setting_text, ChangeItem, TargetDefaults, DEFAULT_APP, DEFAULT_NAMESPACE, DEFAULT_PORT,
};
pub use parser::{ChangeFileParser, TOKEN_ENV_VAR};
pub use validator::{ChangeValidator, ValidationIssue};
