//! Step execution orchestration.
//!
//! A [`Runner`] sequences steps; a [`Definition`] makes every decision along
//! the way; the run ends with one [`Outcome`].

pub mod definition;
pub mod engine;
pub mod outcome;

pub use definition::{AnalysisDefinition, Definition};
pub use engine::Runner;
pub use outcome::Outcome;
