//! Inline `style` attribute inspection.
//!
//! The site styles emphasis and hides footnote glosses through inline
//! declarations rather than semantic tags, so these checks read the
//! `style` attribute directly.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use scraper::node::Element;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(/)?([A-Za-z][A-Za-z0-9:-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
        .expect("tag regex")
});

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("attribute regex")
});

/// Elements that never have an end tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Iterate `(property, value)` pairs of an inline style, both lower-cased.
fn declarations(style: &str) -> impl Iterator<Item = (String, String)> + '_ {
    style.split(';').filter_map(|decl| {
        let (prop, value) = decl.split_once(':')?;
        let value = value
            .to_ascii_lowercase()
            .replace("!important", "")
            .trim()
            .to_string();
        Some((prop.trim().to_ascii_lowercase(), value))
    })
}

fn style_declares(style: &str, property: &str, accept: impl Fn(&str) -> bool) -> bool {
    declarations(style).any(|(prop, value)| prop == property && accept(&value))
}

fn declares(el: &Element, property: &str, accept: impl Fn(&str) -> bool) -> bool {
    el.attr("style")
        .is_some_and(|style| style_declares(style, property, accept))
}

fn style_hides(style: &str) -> bool {
    style_declares(style, "display", |v| v == "none")
        || style_declares(style, "visibility", |v| v == "hidden")
}

/// `display: none`, `visibility: hidden`, or the `hidden` attribute.
pub fn is_hidden(el: &Element) -> bool {
    el.attr("hidden").is_some() || el.attr("style").is_some_and(style_hides)
}

/// Same test as [`is_hidden`] on the raw attribute text of a start tag.
fn attrs_hide(attrs: &str) -> bool {
    ATTR_RE.captures_iter(attrs).any(|caps| {
        let name = caps[1].to_ascii_lowercase();
        match name.as_str() {
            "hidden" => true,
            "style" => caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .is_some_and(|value| style_hides(value.as_str())),
            _ => false,
        }
    })
}

struct HiddenRun {
    name: String,
    depth: usize,
}

/// Remove every hidden element, with its content, from raw markup.
///
/// Works on the tag stream before any tree is built: an HTML parser would
/// move a block nested in a hidden inline element out of it, and the moved
/// block would no longer look hidden. An unclosed hidden element hides the
/// rest of the fragment.
pub fn strip_hidden(markup: &str) -> Cow<'_, str> {
    let mut out = String::new();
    let mut copied = 0;
    let mut changed = false;
    let mut hidden: Option<HiddenRun> = None;

    for caps in TAG_RE.captures_iter(markup) {
        let Some(tag) = caps.get(0) else {
            continue;
        };
        let closing = caps.get(1).is_some();
        let name = caps[2].to_ascii_lowercase();
        let attrs = caps.get(3).map_or("", |m| m.as_str());
        let void = VOID_TAGS.contains(&name.as_str()) || attrs.trim_end().ends_with('/');

        match hidden.as_mut() {
            Some(run) => {
                if void || name != run.name {
                    continue;
                }
                if closing {
                    run.depth -= 1;
                    if run.depth == 0 {
                        copied = tag.end();
                        hidden = None;
                    }
                } else {
                    run.depth += 1;
                }
            }
            None => {
                if closing || !attrs_hide(attrs) {
                    continue;
                }
                changed = true;
                out.push_str(&markup[copied..tag.start()]);
                copied = tag.end();
                if !void {
                    hidden = Some(HiddenRun { name, depth: 1 });
                }
            }
        }
    }

    if !changed {
        return Cow::Borrowed(markup);
    }
    if hidden.is_none() {
        out.push_str(&markup[copied..]);
    }
    Cow::Owned(out)
}

/// `font-style: italic` (or `oblique`).
pub fn is_italic(el: &Element) -> bool {
    declares(el, "font-style", |v| v == "italic" || v.starts_with("oblique"))
}

/// `font-weight: bold`, `bolder`, or a numeric weight of 600 and up.
pub fn is_bold(el: &Element) -> bool {
    declares(el, "font-weight", |v| match v {
        "bold" | "bolder" => true,
        numeric => numeric.parse::<u16>().is_ok_and(|w| w >= 600),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn first_div(html: &str) -> Element {
        let doc = Html::parse_fragment(html);
        let sel = Selector::parse("div").unwrap();
        doc.select(&sel).next().unwrap().value().clone()
    }

    #[test]
    fn detects_hidden_display() {
        assert!(is_hidden(&first_div(r#"<div style="display:none">x</div>"#)));
        assert!(is_hidden(&first_div(r#"<div style="color: red; DISPLAY : None !important">x</div>"#)));
        assert!(is_hidden(&first_div(r#"<div hidden>x</div>"#)));
        assert!(!is_hidden(&first_div(r#"<div style="display:block">x</div>"#)));
    }

    #[test]
    fn detects_italic() {
        assert!(is_italic(&first_div(r#"<div style="font-style: italic;">x</div>"#)));
        assert!(!is_italic(&first_div(r#"<div style="font-style: normal">x</div>"#)));
        assert!(!is_italic(&first_div("<div>x</div>")));
    }

    #[test]
    fn detects_bold_weights() {
        assert!(is_bold(&first_div(r#"<div style="font-weight:700">x</div>"#)));
        assert!(is_bold(&first_div(r#"<div style="font-weight: bold">x</div>"#)));
        assert!(!is_bold(&first_div(r#"<div style="font-weight:400">x</div>"#)));
    }

    #[test]
    fn strips_hidden_elements_from_raw_markup() {
        let html = r#"<p>a<span style="display:none">gloss <a href="/n">n</a></span>b</p>"#;
        assert_eq!(strip_hidden(html), "<p>ab</p>");

        let html = r#"<p>a<span hidden><span>x</span>y</span><br hidden>b</p>"#;
        assert_eq!(strip_hidden(html), "<p>ab</p>");

        let html = r#"<p>a<b style='visibility: hidden'>x</b><b>kept</b></p>"#;
        assert_eq!(strip_hidden(html), "<p>a<b>kept</b></p>");
    }

    #[test]
    fn strips_blocks_nested_in_hidden_inline_elements() {
        let html = r#"<p><span style="display:none"><p>x</p></span>kept</p>"#;
        assert_eq!(strip_hidden(html), "<p>kept</p>");
    }

    #[test]
    fn unclosed_hidden_element_hides_the_rest() {
        assert_eq!(strip_hidden(r#"<p>a<span style="display:none">b</p>"#), "<p>a");
    }

    #[test]
    fn markup_without_hidden_elements_is_borrowed() {
        let html = r#"<p style="color: red">a<br>b</p>"#;
        assert!(matches!(strip_hidden(html), Cow::Borrowed(_)));
    }
}
