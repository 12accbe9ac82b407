// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Splunk Bulk Config
//!
//! Bulk-applies configuration stanzas (saved searches, macros, props, ...) to a
//! Splunk management REST API and optionally verifies that the changes reached
//! every member of a search head cluster.
//!
//! ## Overview
//!
//! Each entry of a change file describes one stanza and the settings it should
//! carry. For every entry the tool:
//!
//! 1. Resolves the stanza path (from the entry's resource id, or from
//!    namespace/app/conf-type/title)
//! 2. Posts the settings to the stanza (update)
//! 3. Falls back to creating the stanza on the collection endpoint when the
//!    update returns 404, unless update-only mode is active
//!
//! After the batch, the cluster validator can check the captain's health,
//! discover the members, wait for replication and read every applied stanza
//! back from every member.
//!
//! ## Modules
//!
//! - [`config`]: Change item types, change file loading and validation
//! - [`splunk`]: REST transport and target path resolution
//! - [`apply`]: Apply engine and batch runner
//! - [`cluster`]: Cluster replication validator
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```json
//! [
//!   {
//!     "title": "test_cli_macro_with_args(2)",
//!     "app": "search",
//!     "configs": { "definition": "index=$idx$ sourcetype=$st$", "args": "idx,st" }
//!   }
//! ]
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod apply;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod error;
pub mod splunk;

// ============================================================================
// Re-exports
// ============================================================================

pub use apply::{ApplyEngine, ApplyOutcome, ApplyStatus, BatchResult, BatchRunner};
pub use cli::{Cli, Commands, OutputFormatter};
pub use cluster::{
    ClusterCheckConfig, ClusterMember, ClusterValidator, ValidationPhase, ValidationReport,
    VerificationResult,
};
pub use config::{ChangeFileParser, ChangeItem, ChangeValidator, TargetDefaults};
pub use error::{Result, SplunkConfError};
pub use splunk::{ResolvedTarget, SplunkClient, TargetResolver};
