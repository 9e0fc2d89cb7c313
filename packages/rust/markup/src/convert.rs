//! Rich markup to plain text with emphasis markers.
//!
//! `<br>` becomes a newline and a closed paragraph a blank line. Italic runs
//! are wrapped in `*`, bold runs in `**`. Hidden subtrees are skipped entirely.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};

use crate::style;

static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank run regex"));

/// Source whitespace that spans a newline.
static SOURCE_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\r\f]*\n[ \t\r\n\f]*").expect("source break regex"));

/// Elements that start and end on their own line.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "blockquote", "figure", "figcaption", "pre", "ul", "ol",
    "li", "table", "tr", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Elements whose content is never rendered.
const SKIPPED_TAGS: &[&str] = &["script", "style", "template", "noscript", "head"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emphasis {
    Italic,
    Bold,
}

impl Emphasis {
    fn marker(self) -> &'static str {
        match self {
            Emphasis::Italic => "*",
            Emphasis::Bold => "**",
        }
    }
}

#[derive(Default)]
struct TextWriter {
    out: String,
    /// Text nodes are copied untouched when the fragment has no tags.
    verbatim: bool,
    italic_depth: usize,
    bold_depth: usize,
}

impl TextWriter {
    fn depth_mut(&mut self, kind: Emphasis) -> &mut usize {
        match kind {
            Emphasis::Italic => &mut self.italic_depth,
            Emphasis::Bold => &mut self.bold_depth,
        }
    }

    fn children(&mut self, el: ElementRef<'_>) {
        for child in el.children() {
            match child.value() {
                Node::Text(text) => self.text(text),
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        self.element(child_el);
                    }
                }
                _ => {}
            }
        }
    }

    /// Newlines in the markup source are layout, not content: they fold to a
    /// space, and whitespace at the start of an output line is dropped.
    fn text(&mut self, text: &str) {
        if self.verbatim {
            self.out.push_str(&text.replace('\u{a0}', " "));
            return;
        }
        let folded = SOURCE_BREAK_RE.replace_all(text, " ");
        let folded = if self.out.is_empty() || self.out.ends_with('\n') {
            folded.trim_start_matches([' ', '\t', '\r', '\n', '\x0c'])
        } else {
            &folded[..]
        };
        self.out.push_str(&folded.replace('\u{a0}', " "));
    }

    fn element(&mut self, el: ElementRef<'_>) {
        let value = el.value();
        if style::is_hidden(value) {
            return;
        }

        let name = value.name();
        if SKIPPED_TAGS.contains(&name) {
            return;
        }
        if name == "br" {
            self.out.push('\n');
            return;
        }

        let italic = matches!(name, "em" | "i" | "cite") || style::is_italic(value);
        let bold = matches!(name, "strong" | "b") || style::is_bold(value);
        let block = BLOCK_TAGS.contains(&name);

        if block {
            self.end_line();
        }
        let italic_at = if italic { self.open(Emphasis::Italic) } else { None };
        let bold_at = if bold { self.open(Emphasis::Bold) } else { None };

        self.children(el);

        if bold {
            self.close(Emphasis::Bold, bold_at);
        }
        if italic {
            self.close(Emphasis::Italic, italic_at);
        }

        if name == "p" {
            self.out.push_str("\n\n");
        } else if block {
            self.end_line();
        }
    }

    fn end_line(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    /// Enter an emphasis run. Only the outermost run of a kind emits a marker;
    /// returns where that marker starts.
    fn open(&mut self, kind: Emphasis) -> Option<usize> {
        let depth = self.depth_mut(kind);
        *depth += 1;
        if *depth > 1 {
            return None;
        }
        let start = self.out.len();
        self.out.push_str(kind.marker());
        Some(start)
    }

    /// Leave an emphasis run. Surrounding whitespace is moved outside the
    /// markers; a run with no visible text loses its markers.
    fn close(&mut self, kind: Emphasis, opened_at: Option<usize>) {
        let depth = self.depth_mut(kind);
        *depth = depth.saturating_sub(1);

        let Some(start) = opened_at else {
            return;
        };
        let marker = kind.marker();
        let run = self.out.split_off(start);
        let content = &run[marker.len()..];

        let core = content.trim();
        if core.is_empty() {
            self.out.push_str(content);
            return;
        }
        let leading = &content[..content.len() - content.trim_start().len()];
        let trailing = &content[content.trim_end().len()..];

        self.out.push_str(leading);
        self.out.push_str(marker);
        self.out.push_str(core);
        self.out.push_str(marker);
        self.out.push_str(trailing);
    }
}

/// Convert a markup fragment to newline-separated text.
///
/// Hidden elements are cut from the raw markup before parsing. A fragment
/// without tags is kept verbatim apart from non-breaking spaces, so plain
/// text passes through unchanged. The result has no trailing whitespace on
/// any line and at most one blank line in a row.
pub fn markup_to_text(fragment: &str) -> String {
    let visible = style::strip_hidden(fragment);
    let doc = Html::parse_fragment(&visible);
    let root = doc.root_element();
    let mut writer = TextWriter {
        verbatim: root.children().all(|child| child.value().is_text()),
        ..TextWriter::default()
    };
    writer.children(root);
    tidy(&writer.out)
}

fn tidy(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().map(str::trim_end).collect();
    let joined = lines.join("\n");
    BLANK_RUN_RE.replace_all(&joined, "\n\n").trim().to_string()
}

/// Text of a fragment with markup removed, hidden subtrees included.
pub fn plain_text(fragment: &str) -> String {
    let doc = Html::parse_fragment(fragment);
    doc.root_element()
        .text()
        .collect::<String>()
        .replace('\u{a0}', " ")
}

/// Character count of [`plain_text`] after trimming.
pub fn plain_text_length(fragment: &str) -> usize {
    plain_text(fragment).trim().chars().count()
}

/// Remove every emphasis marker.
pub fn strip_emphasis(text: &str) -> String {
    text.replace('*', "")
}

/// Remove emphasis markers wrapping the whole text, keeping inner ones.
pub fn strip_outer_emphasis(text: &str) -> String {
    let trimmed = text.trim();
    let leading = trimmed.len() - trimmed.trim_start_matches('*').len();
    let trailing = trimmed.len() - trimmed.trim_end_matches('*').len();
    let strip = leading.min(trailing);
    if strip == 0 || strip * 2 >= trimmed.len() {
        return trimmed.to_string();
    }
    let inner = &trimmed[strip..trimmed.len() - strip];
    if inner.contains('*') {
        return trimmed.to_string();
    }
    inner.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_breaks_become_newlines() {
        assert_eq!(markup_to_text("<p>Line one<br>Line two</p>"), "Line one\nLine two");
    }

    #[test]
    fn paragraphs_become_blank_lines() {
        assert_eq!(
            markup_to_text("<p>First<br/>stanza</p><p>Second<br />stanza</p>"),
            "First\nstanza\n\nSecond\nstanza"
        );
    }

    #[test]
    fn plain_text_is_unchanged() {
        let text = "just words, no tags";
        assert_eq!(markup_to_text(text), text);
        assert_eq!(markup_to_text(&markup_to_text(text)), text);

        let lines = "Line one\nLine two\n\nSecond stanza";
        assert_eq!(markup_to_text(lines), lines);
    }

    #[test]
    fn decodes_entities_and_non_breaking_spaces() {
        assert_eq!(markup_to_text("<p>a&nbsp;&amp;&nbsp;b</p>"), "a & b");
        assert_eq!(
            markup_to_text("<p>&mdash; &ldquo;q&rdquo; &#8212; &#x2019;</p>"),
            "\u{2014} \u{201c}q\u{201d} \u{2014} \u{2019}"
        );
    }

    #[test]
    fn source_newlines_are_not_line_breaks() {
        assert_eq!(
            markup_to_text("<p>Line one<br>\nLine two<br>\n  Line three</p>"),
            "Line one\nLine two\nLine three"
        );
        assert_eq!(
            markup_to_text("<p>\n  a long line\n  wrapped in source\n</p>\n<p>next</p>"),
            "a long line wrapped in source\n\nnext"
        );
    }

    #[test]
    fn non_breaking_indent_survives_line_start() {
        assert_eq!(
            markup_to_text("<p>one<br>\n&nbsp;&nbsp;two</p>"),
            "one\n  two"
        );
    }

    #[test]
    fn hidden_block_inside_inline_element_is_dropped() {
        let html = r#"<p><span style="display:none"><p>x</p></span>kept</p>"#;
        assert_eq!(markup_to_text(html), "kept");
    }

    #[test]
    fn hidden_content_is_dropped_at_any_depth() {
        let html = r#"<p>kept<span style="display:none">gone<em>also gone</em></span><br>
            <span><span><b style="display: none">deep</b></span></span>line</p>"#;
        let text = markup_to_text(html);
        assert!(!text.contains("gone"));
        assert!(!text.contains("deep"));
        assert!(text.contains("kept"));
        assert!(text.contains("line"));
    }

    #[test]
    fn scripts_and_styles_are_skipped() {
        let html = "<p>a<script>var x = 1;</script><style>p{}</style>b</p>";
        assert_eq!(markup_to_text(html), "ab");
    }

    #[test]
    fn wraps_italic_and_bold() {
        assert_eq!(markup_to_text("<p><em>soft</em> and <strong>loud</strong></p>"), "*soft* and **loud**");
        assert_eq!(
            markup_to_text(r#"<p><span style="font-style:italic">styled</span></p>"#),
            "*styled*"
        );
    }

    #[test]
    fn trailing_space_moves_outside_markers() {
        assert_eq!(markup_to_text("<p><i>word </i>next</p>"), "*word* next");
        assert_eq!(markup_to_text("<p>a<i> b</i></p>"), "a *b*");
    }

    #[test]
    fn nested_emphasis_emits_one_pair() {
        assert_eq!(
            markup_to_text(r#"<div style="font-style: italic">an <em>inner</em> run</div>"#),
            "*an inner run*"
        );
    }

    #[test]
    fn empty_emphasis_emits_nothing() {
        assert_eq!(markup_to_text("<p>a<em> </em>b<strong></strong></p>"), "a b");
    }

    #[test]
    fn collapses_blank_runs_and_trailing_space() {
        assert_eq!(
            markup_to_text("<p>one   </p><p></p><p></p><p>two</p>"),
            "one\n\ntwo"
        );
    }

    #[test]
    fn italic_block_closes_before_newline() {
        assert_eq!(
            markup_to_text(r#"<div style="font-style:italic">for my father<br></div><p>Line</p>"#),
            "*for my father*\nLine"
        );
    }

    #[test]
    fn plain_length_counts_decoded_characters() {
        assert_eq!(plain_text_length("<p> caf&eacute;<br>x </p>"), 5);
    }

    #[test]
    fn strips_emphasis() {
        assert_eq!(strip_emphasis("*a* **b**"), "a b");
        assert_eq!(strip_outer_emphasis("*for my father*"), "for my father");
        assert_eq!(strip_outer_emphasis("*a* and *b*"), "*a* and *b*");
        assert_eq!(strip_outer_emphasis("plain"), "plain");
    }
}
