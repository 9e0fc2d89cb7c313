//! Raw page markup handling for poemday.
//!
//! - [`markup_to_text`] renders a fragment as text with `*`/`**` emphasis
//! - [`extract_embedded`] finds the poem inside the page's embedded render data
//! - [`CandidateBlock`] scores one embedded fragment

mod candidate;
mod convert;
mod embedded;
pub mod style;

pub use candidate::{CandidateBlock, Verdict};
pub use convert::{
    markup_to_text, plain_text, plain_text_length, strip_emphasis, strip_outer_emphasis,
};
pub use embedded::{EmbeddedPoem, extract_embedded};
