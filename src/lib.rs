//! Obligor reconciliation library - shared modules for the binaries.
//!
//! Matches incoming transaction records against a reference record set by
//! fuzzy obligor-name similarity plus an exact secondary-key filter, and
//! emits only transactions with exactly one candidate.

pub mod engine;
pub mod error;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod scoring;

pub use engine::{run, RunControl};
pub use error::MatchError;
pub use models::{FieldMap, MatchConfig, MatchOutput, Record};
pub use scoring::NameStrategy;
