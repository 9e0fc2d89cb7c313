//! Scoring of embedded markup fragments as possible poem bodies.

use std::sync::LazyLock;

use poemday_shared::EmbeddedScoring;
use regex::Regex;
use scraper::{Html, Selector};

use crate::convert::plain_text_length;
use crate::style;

static PARAGRAPH_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*<p[\s>/]").expect("paragraph start regex"));

static LINE_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\b[^>]*>").expect("line break regex"));

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("link selector"));

/// Why a block was or was not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Linked running text, not a poem.
    Prose,
    /// Too few breaks for its length to be verse.
    Sparse,
    /// Eligible as the poem body.
    Verse,
}

/// One embedded fragment that passed the paragraph/length gate.
#[derive(Debug, Clone)]
pub struct CandidateBlock<'a> {
    pub markup: &'a str,
    pub plain_len: usize,
    pub line_breaks: usize,
    /// `line_breaks / max(1, plain_len)`.
    pub line_break_ratio: f64,
    /// A link outside any hidden subtree.
    pub has_visible_link: bool,
    pub score: f64,
}

impl<'a> CandidateBlock<'a> {
    /// Returns `None` unless the fragment opens with a paragraph, holds at
    /// least `min_line_breaks` breaks and `min_plain_len` characters of text.
    pub fn evaluate(markup: &'a str, scoring: &EmbeddedScoring) -> Option<Self> {
        if !PARAGRAPH_START_RE.is_match(markup) {
            return None;
        }
        let line_breaks = LINE_BREAK_RE.find_iter(markup).count();
        if line_breaks < scoring.min_line_breaks {
            return None;
        }
        let plain_len = plain_text_length(markup);
        if plain_len < scoring.min_plain_len {
            return None;
        }

        let line_break_ratio = line_breaks as f64 / plain_len.max(1) as f64;
        Some(Self {
            markup,
            plain_len,
            line_breaks,
            line_break_ratio,
            has_visible_link: has_visible_link(markup),
            score: plain_len as f64 * (1.0 + line_break_ratio * scoring.break_weight),
        })
    }

    pub fn verdict(&self, scoring: &EmbeddedScoring) -> Verdict {
        if self.has_visible_link && self.line_break_ratio < scoring.prose_ratio {
            Verdict::Prose
        } else if self.line_break_ratio < scoring.verse_ratio_floor {
            Verdict::Sparse
        } else {
            Verdict::Verse
        }
    }
}

/// True if any `<a href>` remains once hidden elements are cut out.
fn has_visible_link(markup: &str) -> bool {
    let doc = Html::parse_fragment(&style::strip_hidden(markup));
    doc.select(&LINK_SELECTOR).next().is_some()
}
