//! Core pipeline orchestration and domain logic for poemday.
//!
//! This crate ties together link discovery, the Markdown and embedded-data
//! extractors, validation, and persistence into the daily fetch workflow.

pub mod output;
pub mod pipeline;
pub mod validate;

pub use output::{SaveOutcome, save_outcome, write_record};
pub use pipeline::{
    PageSources, ProgressReporter, ResolvedPoem, SilentProgress, Strategy, fetch_poem, resolve,
};
pub use validate::{Rejection, check, validate};
