//! Individual-poem link detection on landing pages.
//!
//! The landing page (Markdown render or raw markup) links to today's poem
//! somewhere among navigation and archive links. Poem pages live under a
//! `poems/<digits>` path; the landing page itself lives under
//! `poems/poem-of-the-day` and must never be returned.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use url::Url;

/// Anchor labels that point at the full poem, compared lower-case.
const CONTINUE_LABELS: &[&str] = &["read more", "continue reading", "read the poem"];

/// Substring identifying the landing page's own URL.
const LANDING_MARKER: &str = "poem-of-the-day";

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// `[label](target)`; the renderer may wrap the target across lines.
static MD_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]+)\)").expect("markdown link regex"));

/// `<a ... href="target" ...>label</a>`.
static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#)
        .expect("anchor regex")
});

/// Any `href="..."` attribute.
static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#).expect("href regex")
});

/// Absolute poem URL anywhere in the text.
static BARE_POEM_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^\s<>"'()\[\]/]+/(?:poetrymagazine/)?poems/\d+[^\s<>"'()\[\]]*"#)
        .expect("poem url regex")
});

/// Path shape of an individual poem page.
static POEM_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^/(?:poetrymagazine/)?poems/\d+").expect("poem path regex")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex"));

// ---------------------------------------------------------------------------
// Locator
// ---------------------------------------------------------------------------

/// Find today's individual poem URL in landing content.
///
/// A link labelled like "Read More" wins; otherwise the first poem URL in
/// document order. Relative hrefs are only considered when `base` is given.
/// Returns `None` when the page carries no poem link, in which case callers
/// parse the landing content itself.
pub fn locate_poem_url(content: &str, base: Option<&Url>) -> Option<String> {
    let mut labelled: Vec<(usize, String, &str)> = Vec::new();

    for caps in MD_LINK_RE.captures_iter(content) {
        let start = caps.get(0).map_or(0, |m| m.start());
        labelled.push((start, normalize_label(&caps[1]), caps.get(2).map_or("", |m| m.as_str())));
    }
    for caps in ANCHOR_RE.captures_iter(content) {
        let start = caps.get(0).map_or(0, |m| m.start());
        labelled.push((start, normalize_label(&caps[2]), caps.get(1).map_or("", |m| m.as_str())));
    }
    labelled.sort_by_key(|(start, _, _)| *start);

    for (_, label, target) in &labelled {
        if !CONTINUE_LABELS.iter().any(|l| label.starts_with(l)) {
            continue;
        }
        if let Some(url) = as_poem_url(target, base) {
            debug!(%url, %label, "poem url from labelled link");
            return Some(url);
        }
    }

    // No labelled link: first poem URL of any kind, in document order.
    let mut targets: Vec<(usize, &str)> = labelled
        .iter()
        .map(|(start, _, target)| (*start, *target))
        .collect();
    targets.extend(
        HREF_RE
            .captures_iter(content)
            .filter_map(|c| c.get(1))
            .map(|m| (m.start(), m.as_str())),
    );
    targets.extend(
        BARE_POEM_URL_RE
            .find_iter(content)
            .map(|m| (m.start(), m.as_str())),
    );
    targets.sort_by_key(|(start, _)| *start);

    let found = targets
        .into_iter()
        .find_map(|(_, target)| as_poem_url(target, base));

    match &found {
        Some(url) => debug!(%url, "poem url from first matching link"),
        None => debug!("no individual poem url on landing page"),
    }
    found
}

/// Strip surrounding punctuation and all internal whitespace from a link target.
pub fn clean_url(raw: &str) -> String {
    let collapsed: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    collapsed
        .trim_start_matches(['<', '(', '"', '\'', '`'])
        .trim_end_matches(['"', '\'', '`', '.', ',', ';', ':', '!', '?', ']', ')', '}', '>'])
        .to_string()
}

/// Returns the cleaned URL if it points at an individual poem page.
fn as_poem_url(raw: &str, base: Option<&Url>) -> Option<String> {
    let cleaned = clean_url(raw);
    if cleaned.is_empty() || cleaned.to_lowercase().contains(LANDING_MARKER) {
        return None;
    }

    let is_absolute = cleaned
        .get(..7)
        .is_some_and(|p| p.eq_ignore_ascii_case("http://"))
        || cleaned
            .get(..8)
            .is_some_and(|p| p.eq_ignore_ascii_case("https://"));

    let (parsed, text) = if is_absolute {
        (Url::parse(&cleaned).ok()?, cleaned)
    } else {
        let joined = base?.join(&cleaned).ok()?;
        let text = joined.to_string();
        (joined, text)
    };

    if !matches!(parsed.scheme(), "http" | "https") || !POEM_PATH_RE.is_match(parsed.path()) {
        return None;
    }
    Some(text)
}

/// Visible anchor text, lower-cased, markup and emphasis removed.
fn normalize_label(raw: &str) -> String {
    let text = TAG_RE.replace_all(raw, "");
    text.replace(['*', '_'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
