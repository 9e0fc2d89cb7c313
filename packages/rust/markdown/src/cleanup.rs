//! Line cleanup pipeline applied before poem parsing.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.
//! Link targets carry nothing the parser needs, so links are reduced to
//! their visible text and images are dropped.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on page Markdown.
pub(crate) fn run_pipeline(md: &str) -> String {
    let mut result = normalize_line_endings(md);

    result = strip_images(&result);
    result = drop_empty_links(&result);
    result = flatten_links(&result);
    result = strip_leftover_html(&result);
    result = atx_titles_to_setext(&result);
    result = normalize_whitespace(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Line endings
// ---------------------------------------------------------------------------

fn normalize_line_endings(md: &str) -> String {
    md.replace("\r\n", "\n").replace('\r', "\n")
}

// ---------------------------------------------------------------------------
// Pass 2: Images
// ---------------------------------------------------------------------------

/// Remove `![alt](src)` image markup entirely.
fn strip_images(md: &str) -> String {
    static IMAGE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("image regex"));

    IMAGE_RE.replace_all(md, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 3: Empty links
// ---------------------------------------------------------------------------

/// Remove `[](target)` links, which are what linked images leave behind.
fn drop_empty_links(md: &str) -> String {
    static EMPTY_LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[\s*\]\([^)]*\)").expect("empty link regex"));

    EMPTY_LINK_RE.replace_all(md, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 4: Flatten links
// ---------------------------------------------------------------------------

/// Replace `[text](target)` with `text`.
fn flatten_links(md: &str) -> String {
    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").expect("link regex"));

    LINK_RE.replace_all(md, "$1").to_string()
}

// ---------------------------------------------------------------------------
// Pass 5: Leftover HTML
// ---------------------------------------------------------------------------

/// Remove stray layout tags that survived conversion, keeping their text.
fn strip_leftover_html(md: &str) -> String {
    static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"</?(?:div|span|section|article|aside|header|footer|figure|figcaption|details|summary)(?:\s[^>]*)?>",
        )
        .expect("html tag regex")
    });

    HTML_TAG_RE.replace_all(md, "").to_string()
}

// ---------------------------------------------------------------------------
// Pass 6: Title headings
// ---------------------------------------------------------------------------

/// Rewrite `# Title` as a setext heading so both heading styles parse alike.
fn atx_titles_to_setext(md: &str) -> String {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^#\s+(.+?)\s*#*\s*$").expect("h1 regex"));

    md.lines()
        .map(|line| match H1_RE.captures(line) {
            Some(caps) => format!("{}\n===", &caps[1]),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 7: Whitespace
// ---------------------------------------------------------------------------

/// Trim trailing whitespace on every line.
fn normalize_whitespace(md: &str) -> String {
    md.lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}
