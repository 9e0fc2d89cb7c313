//! Poem body and epigraph from the page's embedded render data.
//!
//! The site ships every rendered text fragment inside a JSON array in a
//! `<script id="__NUXT_DATA__">` tag. The poem is the fragment that looks
//! most like verse: long, dense with line breaks, not linked prose.

use std::sync::LazyLock;

use poemday_shared::{EmbeddedScoring, PoemError, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::candidate::{CandidateBlock, Verdict};
use crate::convert::{markup_to_text, strip_emphasis, strip_outer_emphasis};
use crate::style;

/// Script selectors for the embedded blob, tried in order.
static BLOB_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["script#__NUXT_DATA__", "script[data-nuxt-data]"]
        .iter()
        .map(|s| Selector::parse(s).expect("blob selector"))
        .collect()
});

static DIV_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*<div[\s>/]").expect("div start regex"));

/// Text recovered from the embedded data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedPoem {
    pub body: String,
    pub epigraph: Option<String>,
}

/// Extract the poem body and epigraph from raw page markup.
///
/// Fails with `NotFound` when the page has no blob or no fragment qualifies,
/// and `Malformed` when the blob is not JSON.
#[instrument(skip_all, fields(bytes = markup.len()))]
pub fn extract_embedded(markup: &str, scoring: &EmbeddedScoring) -> Result<EmbeddedPoem> {
    let blob = find_blob(markup).ok_or_else(|| PoemError::not_found("embedded data script"))?;
    let data: Value = serde_json::from_str(&blob)
        .map_err(|e| PoemError::malformed(format!("embedded data is not JSON: {e}")))?;

    let mut entries = Vec::new();
    collect_strings(&data, &mut entries);
    debug!(entries = entries.len(), "embedded strings");

    let winner = select_body(&entries, scoring)
        .ok_or_else(|| PoemError::not_found("verse-like block in embedded data"))?;
    let body = markup_to_text(winner.markup);
    if body.is_empty() {
        return Err(PoemError::not_found("text in selected embedded block"));
    }

    let epigraph = find_epigraph(&entries, scoring)
        .map(markup_to_text)
        .filter(|epigraph| {
            let needle = strip_emphasis(epigraph);
            let needle = needle.trim();
            if needle.is_empty() {
                return false;
            }
            let duplicate = strip_emphasis(&body).contains(needle);
            if duplicate {
                debug!("epigraph already present in body, dropped");
            }
            !duplicate
        })
        .map(|epigraph| strip_outer_emphasis(&epigraph));

    Ok(EmbeddedPoem { body, epigraph })
}

fn find_blob(markup: &str) -> Option<String> {
    let doc = Html::parse_document(markup);
    BLOB_SELECTORS.iter().find_map(|selector| {
        doc.select(selector)
            .next()
            .map(|script| script.text().collect::<String>())
    })
}

/// Depth-first collection of every string in the blob, in document order.
fn collect_strings<'v>(value: &'v Value, out: &mut Vec<&'v str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|item| collect_strings(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_strings(item, out)),
        _ => {}
    }
}

/// Highest-scoring verse block; the earliest wins a tie.
fn select_body<'a>(entries: &[&'a str], scoring: &EmbeddedScoring) -> Option<CandidateBlock<'a>> {
    let mut best: Option<CandidateBlock<'a>> = None;
    for entry in entries {
        let Some(block) = CandidateBlock::evaluate(entry, scoring) else {
            continue;
        };
        let verdict = block.verdict(scoring);
        debug!(
            plain_len = block.plain_len,
            ratio = block.line_break_ratio,
            linked = block.has_visible_link,
            score = block.score,
            ?verdict,
            "candidate block"
        );
        if verdict != Verdict::Verse {
            continue;
        }
        if best.as_ref().is_none_or(|b| block.score > b.score) {
            best = Some(block);
        }
    }
    best
}

/// First short italic `<div>` fragment.
fn find_epigraph<'a>(entries: &[&'a str], scoring: &EmbeddedScoring) -> Option<&'a str> {
    entries.iter().copied().find(|entry| {
        if !DIV_START_RE.is_match(entry) {
            return false;
        }
        let doc = Html::parse_fragment(entry);
        let Some(first) = doc.root_element().children().find_map(ElementRef::wrap) else {
            return false;
        };
        if first.value().name() != "div" || !style::is_italic(first.value()) {
            return false;
        }
        let rendered = strip_emphasis(&markup_to_text(entry));
        let len = rendered.trim().chars().count();
        len > 0 && len < scoring.epigraph_max_len
    })
}
