//! Poem extraction from Markdown page renders.
//!
//! The reader service renders a poem page as Markdown with an optional
//! metadata header (`Title:` ... `Markdown Content:`). The page template puts
//! a generic page heading first, the poem title as a later setext heading,
//! a `By` line, then the poem followed by footer sections.
//!
//! Pages fetched through the raw proxy arrive as HTML; [`normalize_page`]
//! converts those to the same Markdown shape first.

mod cleanup;

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use poemday_shared::{MarkdownPolicy, PoemError, PoemRecord, Result, TitleSelection};

/// Separator between the reader's metadata header and the page body.
const CONTENT_MARKER: &str = "Markdown Content:";

/// Site suffix separator in page titles.
const TITLE_SEPARATOR: &str = " | ";

/// Lines skipped verbatim before the poem starts.
const BOILERPLATE_EXACT: &[&str] = &["Share", "Play Audio", "Donate", "Listen", "Read More", "Read more"];

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

/// Section names and calls to action skipped before the poem starts.
/// Month names appear in the date line above the poem.
static PRE_CONTENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:Poems & Poets|Topics & Themes|Features|Grants & Programs|About Us|Poetry magazine|Subscribe|Related|More by|Advertise|Copyright|Source[:.]|Share|A note from the editor|Sign Up|RECENT POEMS OF THE DAY|Poetry Foundation Homepage|Skip to main content|Read More|Donate|Listen|January|February|March|April|May|June|July|August|September|October|November|December)\b",
    )
    .expect("pre-content regex")
});

/// Sections that end the poem. No month names: poems mention months.
static POST_CONTENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:Poems & Poets|Topics & Themes|Features|Grants & Programs|About Us|Poetry magazine|Subscribe|Related|More by|Advertise|Copyright|Source[:.]|Share|A note from the editor|Sign Up|RECENT POEMS OF THE DAY|Poetry Foundation Homepage|Skip to main content|Read More|Donate|Listen)\b",
    )
    .expect("post-content regex")
});

static ATX_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}\s").expect("heading regex"));

static RULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-_*]{3,}\s*$").expect("rule regex"));

static ATTRIBUTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:Copyright|Source[:\s])").expect("attribution regex"));

static SETEXT_UNDERLINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^=+$").expect("setext underline regex"));

static META_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Title:\s*(.+)$").expect("meta title regex"));

static AUDIO_CAPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*Listen.*$").expect("audio caption regex"));

static YEAR_RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\d{4}\s*[-–—].*$").expect("year range regex"));

static HTML_PAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<!doctype\s+html|<html[\s>]|<body[\s>]").expect("html page regex")
});

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Convert a fetched page to reader-style Markdown.
///
/// Markdown passes through untouched. HTML (what the raw proxy returns) is
/// converted with `htmd`, chrome tags skipped.
#[instrument(skip_all, fields(bytes = page.len()))]
pub fn normalize_page(page: &str) -> Result<String> {
    if !HTML_PAGE_RE.is_match(page) {
        return Ok(page.to_string());
    }

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec![
            "head", "script", "style", "nav", "iframe", "noscript", "svg", "template",
        ])
        .build();

    let markdown = converter
        .convert(page)
        .map_err(|e| PoemError::malformed(format!("htmd conversion failed: {e}")))?;

    debug!(md_len = markdown.len(), "converted html page to markdown");
    Ok(markdown)
}

/// [`normalize_page`] followed by [`parse_poem_markdown`].
pub fn parse_page(page: &str, policy: &MarkdownPolicy) -> Result<PoemRecord> {
    let markdown = normalize_page(page)?;
    parse_poem_markdown(&markdown, policy)
}

/// Title and byline of a poem page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    pub title: String,
    pub author: String,
}

/// Parse only the title and author of a Markdown page render.
pub fn parse_header(text: &str, policy: &MarkdownPolicy) -> Result<PageHeader> {
    let (declared_title, content) = split_metadata(text);
    let cleaned = cleanup::run_pipeline(content);
    let lines: Vec<&str> = cleaned.lines().collect();
    locate_header(&lines, declared_title, policy).map(|(header, _)| header)
}

/// Parse a Markdown page render into a record without epigraph.
///
/// Fails with `NotFound` when no byline or no body is found; the page is then
/// most likely a listing page rather than a poem.
#[instrument(skip_all, fields(bytes = text.len()))]
pub fn parse_poem_markdown(text: &str, policy: &MarkdownPolicy) -> Result<PoemRecord> {
    let (declared_title, content) = split_metadata(text);
    let cleaned = cleanup::run_pipeline(content);
    let lines: Vec<&str> = cleaned.lines().collect();

    let (header, body_start) = locate_header(&lines, declared_title, policy)?;

    let body = collect_body(&lines[body_start..]);
    if body.is_empty() {
        return Err(PoemError::not_found("poem body"));
    }

    Ok(PoemRecord::new(header.title, header.author, body))
}

/// Header fields and the index of the first line after the byline.
fn locate_header(
    lines: &[&str],
    declared_title: Option<String>,
    policy: &MarkdownPolicy,
) -> Result<(PageHeader, usize)> {
    let heading = find_title_heading(lines, policy.title_selection);
    let title_end = heading.as_ref().map_or(0, |(_, end)| *end);

    let title = declared_title
        .or_else(|| heading.map(|(title, _)| title))
        .map(|title| strip_site_suffix(&title))
        .unwrap_or_default();
    debug!(%title, title_end, "title detected");

    let (author, author_end) = find_author(lines, title_end, policy.author_window)
        .ok_or_else(|| PoemError::not_found("author line"))?;
    if author.is_empty() {
        return Err(PoemError::not_found("author name"));
    }
    debug!(%author, author_end, "author detected");

    Ok((PageHeader { title, author }, author_end))
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Split off the reader metadata header; returns its `Title:` value.
fn split_metadata(text: &str) -> (Option<String>, &str) {
    let Some((header, body)) = text.split_once(CONTENT_MARKER) else {
        return (None, text);
    };
    let title = META_TITLE_RE
        .captures(header)
        .map(|caps| caps[1].trim().to_string())
        .filter(|t| !t.is_empty());
    (title, body)
}

fn strip_site_suffix(title: &str) -> String {
    title
        .split_once(TITLE_SEPARATOR)
        .map_or(title, |(head, _)| head)
        .trim()
        .to_string()
}

fn is_setext_underline(line: &str) -> bool {
    SETEXT_UNDERLINE_RE.is_match(line.trim())
}

fn is_byline(line: &str) -> bool {
    let lower = line.trim().to_lowercase();
    lower == "by" || lower.starts_with("by ")
}

/// Heading text and the index of the line after its underline.
///
/// With [`TitleSelection::Last`] the scan ends at the first byline after a
/// heading, so footer headings further down never win.
fn find_title_heading(lines: &[&str], selection: TitleSelection) -> Option<(String, usize)> {
    let mut found: Option<(String, usize)> = None;
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();
        let underlined = lines.get(i + 1).is_some_and(|next| is_setext_underline(next));

        if !line.is_empty() && !is_setext_underline(line) && underlined {
            found = Some((line.to_string(), i + 2));
            if selection == TitleSelection::First {
                break;
            }
            i += 2;
            continue;
        }
        if found.is_some() && is_byline(line) {
            break;
        }
        i += 1;
    }
    found
}

/// Author name and the index of the first line after it.
///
/// Only the first `window` lines after the title are searched. A bare `By`
/// line takes the next non-blank line as the name.
fn find_author(lines: &[&str], start: usize, window: usize) -> Option<(String, usize)> {
    for (i, line) in lines.iter().enumerate().skip(start).take(window) {
        let line = line.trim();
        let lower = line.to_lowercase();

        if lower.starts_with("by ") {
            return Some((clean_author(&line[3..]), i + 1));
        }
        if lower == "by" {
            return lines
                .iter()
                .enumerate()
                .skip(i + 1)
                .find(|(_, l)| !l.trim().is_empty())
                .map(|(j, l)| (clean_author(l), j + 1));
        }
    }
    None
}

/// Drop audio-player captions and life dates trailing the name.
fn clean_author(raw: &str) -> String {
    let name = raw.trim();
    let name = AUDIO_CAPTION_RE.replace(name, "");
    let name = YEAR_RANGE_RE.replace(name.trim(), "");
    name.trim().to_string()
}

fn collect_body(lines: &[&str]) -> String {
    let mut body: Vec<&str> = Vec::new();
    let mut started = false;

    for &line in lines {
        let stripped = line.trim();

        if !started {
            if stripped.is_empty()
                || BOILERPLATE_EXACT.contains(&stripped)
                || PRE_CONTENT_RE.is_match(stripped)
            {
                continue;
            }
            started = true;
        }

        if POST_CONTENT_RE.is_match(stripped)
            || ATX_HEADING_RE.is_match(stripped)
            || RULE_RE.is_match(stripped)
            || ATTRIBUTION_RE.is_match(stripped)
        {
            break;
        }
        if is_setext_underline(stripped) {
            // The line above is a section heading, not verse.
            body.pop();
            break;
        }

        body.push(line);
    }

    while body.first().is_some_and(|l| l.trim().is_empty()) {
        body.remove(0);
    }
    while body.last().is_some_and(|l| l.trim().is_empty()) {
        body.pop();
    }

    body.join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture_path(name: &str) -> std::path::PathBuf {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures")
            .join(name)
    }

    fn load_fixture(name: &str) -> String {
        fs::read_to_string(fixture_path(name))
            .unwrap_or_else(|e| panic!("failed to read fixture {name}: {e}"))
    }

    fn parse(text: &str) -> Result<PoemRecord> {
        parse_poem_markdown(text, &MarkdownPolicy::default())
    }

    #[test]
    fn last_heading_before_byline_is_title() {
        let md = "Poem of the Day | Site Name\n===\nSome navigation\nActual Title\n===\nBy Jane Poet\n\nLine1\nLine2";
        let record = parse(md).unwrap();
        assert_eq!(record.title, "Actual Title");
        assert_eq!(record.author, "Jane Poet");
        assert_eq!(record.body, "Line1\nLine2");
        assert_eq!(record.epigraph, None);
    }

    #[test]
    fn first_heading_policy() {
        let md = "Poem of the Day | Site Name\n===\nActual Title\n===\nBy Jane Poet\n\nLine1";
        let policy = MarkdownPolicy {
            title_selection: TitleSelection::First,
            ..MarkdownPolicy::default()
        };
        let record = parse_poem_markdown(md, &policy).unwrap();
        assert_eq!(record.title, "Poem of the Day");
    }

    #[test]
    fn footer_headings_do_not_replace_title() {
        let md = "The Orchard\n===\nBy Jane Poet\n\nLine1\n\nRecent Poems\n===\nOther";
        let record = parse(md).unwrap();
        assert_eq!(record.title, "The Orchard");
        assert_eq!(record.body, "Line1");
    }

    #[test]
    fn declared_title_wins_and_is_cut() {
        let md = "Title: The Orchard | The Poetry Foundation\nURL Source: https://x\n\nMarkdown Content:\nPoem of the Day\n===\nWrong Heading\n===\nBy Jane Poet\n\nLine1";
        let record = parse(md).unwrap();
        assert_eq!(record.title, "The Orchard");
        assert_eq!(record.author, "Jane Poet");
    }

    #[test]
    fn bare_by_line_takes_next_line() {
        let md = "Ode\n===\nBy\n\n[Jane Poet](https://x/poets/jane)\n\nLine1\nLine2";
        let record = parse(md).unwrap();
        assert_eq!(record.author, "Jane Poet");
        assert_eq!(record.body, "Line1\nLine2");
    }

    #[test]
    fn author_cleanup() {
        assert_eq!(clean_author("Jane Poet Listen to this poem"), "Jane Poet");
        assert_eq!(clean_author("John Keats 1795–1821"), "John Keats");
        assert_eq!(clean_author(" Zoë Ng "), "Zoë Ng");
    }

    #[test]
    fn author_outside_window_is_not_found() {
        let filler = "a line of verse\n".repeat(40);
        let md = format!("Ode\n===\n{filler}By Jane Poet\n\nLine1");
        let err = parse(&md).unwrap_err();
        assert!(matches!(err, PoemError::NotFound { .. }));
    }

    #[test]
    fn listing_page_without_author_is_not_found() {
        let md = "Poem of the Day\n===\n\nRecent poems\nSome teaser text";
        assert!(matches!(parse(md).unwrap_err(), PoemError::NotFound { .. }));
    }

    #[test]
    fn skips_leading_boilerplate() {
        let md = "Ode\n===\nBy Jane Poet\n\nShare\nPlay Audio\nMarch 3, 2025\nListen to this poem\n\nFirst line\nSecond line";
        let record = parse(md).unwrap();
        assert_eq!(record.body, "First line\nSecond line");
    }

    #[test]
    fn months_inside_poem_do_not_stop_it() {
        let md = "Ode\n===\nBy Jane Poet\n\nThe rain came down\nMarch in the orchard\nand stayed";
        let record = parse(md).unwrap();
        assert_eq!(record.body, "The rain came down\nMarch in the orchard\nand stayed");
    }

    #[test]
    fn stops_at_footer_markers() {
        let base = "Ode\n===\nBy Jane Poet\n\nLine1\n  indented line\n";
        for stop in [
            "More by Jane Poet",
            "Copyright © 2021 by Jane Poet.",
            "Source: Poetry (2021)",
            "---",
            "## Related",
            "Related Poems",
        ] {
            let record = parse(&format!("{base}{stop}\nfooter")).unwrap();
            assert_eq!(record.body, "Line1\n  indented line", "stop marker {stop:?}");
        }
    }

    #[test]
    fn underline_pops_section_heading() {
        let md = "Ode\n===\nBy Jane Poet\n\nLine1\nLine2\n\nRecent Poems of Today\n=====\nother";
        let record = parse(md).unwrap();
        assert_eq!(record.body, "Line1\nLine2");
    }

    #[test]
    fn flattens_links_in_body() {
        let md = "Ode\n===\nBy Jane Poet\n\nI saw [the sea](https://x/sea) once\n![img](x.png)\nand then";
        let record = parse(md).unwrap();
        assert_eq!(record.body, "I saw the sea once\n\nand then");
    }

    #[test]
    fn html_pages_are_converted_first() {
        let html = "<!DOCTYPE html><html><head><title>x</title></head><body>\
                    <h1>The Orchard</h1><p>By Jane Poet</p>\
                    <p>Line one</p><p>Line two</p>\
                    <script>window.__NUXT__={}</script></body></html>";
        let record = parse_page(html, &MarkdownPolicy::default()).unwrap();
        assert_eq!(record.title, "The Orchard");
        assert_eq!(record.author, "Jane Poet");
        assert!(record.body.contains("Line one"));
        assert!(record.body.contains("Line two"));
        assert!(!record.body.contains("NUXT"));
    }

    #[test]
    fn markdown_passes_through_normalize() {
        let md = "Ode\n===\nBy Jane Poet";
        assert_eq!(normalize_page(md).unwrap(), md);
    }

    #[test]
    fn header_only_ignores_missing_body() {
        let header = parse_header("Ode\n===\nBy Jane Poet\n\nMore by Jane Poet", &MarkdownPolicy::default())
            .unwrap();
        assert_eq!(
            header,
            PageHeader {
                title: "Ode".into(),
                author: "Jane Poet".into()
            }
        );
        assert!(parse("Ode\n===\nBy Jane Poet\n\nMore by Jane Poet").is_err());
    }

    #[test]
    fn parses_reader_fixture() {
        let md = load_fixture("markdown/poem-page.md");
        let record = parse(&md).unwrap();
        assert_eq!(record.title, "Morning Lamp");
        assert_eq!(record.author, "Ruth Calder");
        assert!(record.body.contains("I walked out early"), "{}", record.body);
        assert!(record.body.ends_with("and set it on the sill."), "{}", record.body);
        assert!(!record.body.contains("Copyright"));
        assert!(!record.body.contains("More by"));
    }

    #[test]
    fn landing_fixture_yields_excerpt() {
        let md = load_fixture("markdown/landing.md");
        let record = parse(&md).unwrap();
        assert_eq!(record.title, "Poem of the Day");
        assert_eq!(record.author, "Ruth Calder");
        assert_eq!(record.body, "I walked out early with the lamp still lit,");
    }
}
