//! Apply module.
//!
//! This module applies change items to the management API: the engine runs
//! the update-then-create protocol for one item, the batch runner drives it
//! over a whole change list.

mod outcome;
mod engine;
mod batch;

pub use outcome::{ApplyOutcome, ApplyStatus};
pub use engine::ApplyEngine;
pub use batch::{BatchResult, BatchRunner};
