//! Plain-text rendering of a published Google Doc.
//!
//! Italic runs are marked with `*`, paragraphs are separated by a blank line.
//! Docs exports sometimes split a single italic word across two spans
//! (`<span class="c3">rein</span><span class="c3">vent the wheel</span>`); such
//! words are rejoined so the marker wraps the whole word.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Paragraphs this short are headers or export artifacts.
const MIN_PARAGRAPH_CHARS: usize = 21;

const EMPHASIS: char = '*';

struct Selectors {
    style: Selector,
    contents: Selector,
    paragraph: Selector,
}

fn selectors() -> &'static Selectors {
    static SELECTORS: OnceLock<Selectors> = OnceLock::new();
    SELECTORS.get_or_init(|| Selectors {
        style: Selector::parse("style").expect("valid style selector"),
        contents: Selector::parse(r#"[id*="contents"]"#).expect("valid contents selector"),
        paragraph: Selector::parse("p").expect("valid paragraph selector"),
    })
}

fn css_rule_regex() -> &'static Regex {
    static RULE: OnceLock<Regex> = OnceLock::new();
    RULE.get_or_init(|| Regex::new(r"([^{}]+)\{([^{}]*)\}").expect("valid css rule regex"))
}

fn class_regex() -> &'static Regex {
    static CLASS: OnceLock<Regex> = OnceLock::new();
    CLASS.get_or_init(|| Regex::new(r"\.(-?[_a-zA-Z][_a-zA-Z0-9-]*)").expect("valid class regex"))
}

/// One inline run of text inside a paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub italic: bool,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            italic: false,
        }
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            italic: true,
        }
    }
}

/// Render published document HTML as plain text with emphasis markers.
///
/// Malformed or empty input simply produces an empty string.
pub fn format_document(html: &str) -> String {
    format_parsed(&Html::parse_document(html))
}

/// Same as [`format_document`] for an already parsed tree.
pub fn format_parsed(document: &Html) -> String {
    let italic = italic_classes(document);
    let sel = selectors();

    let root = document
        .select(&sel.contents)
        .next()
        .unwrap_or_else(|| document.root_element());

    let paragraphs = root
        .select(&sel.paragraph)
        .map(|p| paragraph_text(p, &italic));

    join_paragraphs(paragraphs)
}

/// Class names whose CSS rules declare `font-style:italic`.
pub fn italic_classes(document: &Html) -> HashSet<String> {
    let mut classes = HashSet::new();
    for style in document.select(&selectors().style) {
        let css: String = style.text().collect();
        collect_italic_classes(&css, &mut classes);
    }
    classes
}

fn collect_italic_classes(css: &str, classes: &mut HashSet<String>) {
    for rule in css_rule_regex().captures_iter(css) {
        let body: String = rule[2]
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        if !body.contains("font-style:italic") {
            continue;
        }

        // `@import url(...);` can precede the first rule in the same capture.
        let selector = rule[1].rsplit(';').next().unwrap_or("");
        for class in class_regex().captures_iter(selector) {
            classes.insert(class[1].to_string());
        }
    }
}

fn paragraph_text(paragraph: ElementRef<'_>, italic: &HashSet<String>) -> String {
    let spans: Vec<ElementRef<'_>> = paragraph
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "span")
        .collect();

    if spans.is_empty() {
        return paragraph.text().collect::<String>().trim().to_string();
    }

    let segments = spans
        .into_iter()
        .map(|span| Segment {
            text: span.text().collect(),
            italic: span.value().classes().any(|class| italic.contains(class)),
        })
        .collect();

    render_segments(segments)
}

/// Concatenate segments, wrapping italic ones and rejoining split words.
pub fn render_segments(mut segments: Vec<Segment>) -> String {
    let mut out = String::new();
    let mut i = 0;

    while i < segments.len() {
        let current = &segments[i];

        if let Some(next) = segments.get(i + 1) {
            if is_split_word(current, next) {
                let split = next
                    .text
                    .find(char::is_whitespace)
                    .unwrap_or(next.text.len());
                let word = format!("{}{}", current.text, &next.text[..split]);
                let rest = next.text[split..].to_string();

                push_emphasized(&mut out, &word);

                if rest.is_empty() {
                    i += 2;
                } else {
                    segments[i + 1] = Segment::plain(rest);
                    i += 1;
                }
                continue;
            }
        }

        if current.italic {
            push_emphasized(&mut out, &current.text);
        } else {
            out.push_str(&current.text);
        }
        i += 1;
    }

    out.trim().to_string()
}

fn is_split_word(current: &Segment, next: &Segment) -> bool {
    current.italic
        && !current.text.is_empty()
        && !current.text.ends_with(char::is_whitespace)
        && !next.text.is_empty()
        && !next.text.starts_with(char::is_whitespace)
}

/// Wrap the non-whitespace core of `text` in emphasis markers.
fn push_emphasized(out: &mut String, text: &str) {
    let core = text.trim();
    if core.is_empty() {
        out.push_str(text);
        return;
    }
    let start = text.len() - text.trim_start().len();
    let end = start + core.len();

    out.push_str(&text[..start]);
    out.push(EMPHASIS);
    out.push_str(core);
    out.push(EMPHASIS);
    out.push_str(&text[end..]);
}

/// Drop short and repeated paragraphs, then join with blank lines.
pub fn join_paragraphs<I>(paragraphs: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    let mut kept = Vec::new();

    for paragraph in paragraphs {
        let paragraph = paragraph.trim();
        if paragraph.chars().count() < MIN_PARAGRAPH_CHARS {
            continue;
        }
        if seen.insert(paragraph.to_string()) {
            kept.push(paragraph.to_string());
        }
    }

    kept.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(style: &str, body: &str) -> String {
        format!(
            "<html><head><style>{}</style></head><body><div id=\"contents\">{}</div></body></html>",
            style, body
        )
    }

    #[test]
    fn test_split_italic_word_is_rejoined() {
        let html = doc(
            ".c1{font-style:italic}",
            r#"<p><span class="c2">We do not try to </span><span class="c1">rein</span><span class="c1">vent the wheel</span></p>"#,
        );
        assert_eq!(format_document(&html), "We do not try to *reinvent* the wheel");
    }

    #[test]
    fn test_fully_consumed_next_span_is_skipped() {
        let segments = vec![
            Segment::italic("rein"),
            Segment::plain("vent"),
            Segment::plain(" again, and again"),
        ];
        assert_eq!(render_segments(segments), "*reinvent* again, and again");
    }

    #[test]
    fn test_no_repair_across_whitespace() {
        let segments = vec![
            Segment::italic("Lorem"),
            Segment::plain(" ipsum"),
            Segment::italic("dolor "),
            Segment::plain("sit"),
        ];
        assert_eq!(render_segments(segments), "*Lorem* ipsum*dolor* sit");
    }

    #[test]
    fn test_whitespace_stays_outside_markers() {
        let segments = vec![
            Segment::plain("a"),
            Segment::italic(" word "),
            Segment::plain("b"),
            Segment::italic("   "),
        ];
        assert_eq!(render_segments(segments), "a *word* b");
    }

    #[test]
    fn test_italic_classes_from_any_rule_shape() {
        let html = doc(
            "@import url('https://themes.googleusercontent.com/fonts/css?kit=x');\
             .c3{font-style:italic}\
             .c4,.c9{color:#000000;font-weight:400;font-style: italic;font-size:11pt}\
             .c5{font-style:normal}\
             .c6{FONT-STYLE : ITALIC}",
            "",
        );
        let classes = italic_classes(&Html::parse_document(&html));
        let mut found: Vec<&str> = classes.iter().map(String::as_str).collect();
        found.sort_unstable();
        assert_eq!(found, ["c3", "c4", "c6", "c9"]);
    }

    #[test]
    fn test_paragraph_without_spans_uses_text() {
        let html = doc("", "<p>   A paragraph with no spans at all.  </p>");
        assert_eq!(format_document(&html), "A paragraph with no spans at all.");
    }

    #[test]
    fn test_length_boundary() {
        let twenty = "a".repeat(20);
        let twenty_one = "b".repeat(21);
        let html = doc("", &format!("<p>{}</p><p>{}</p>", twenty, twenty_one));
        assert_eq!(format_document(&html), twenty_one);
    }

    #[test]
    fn test_duplicates_removed_in_first_occurrence_order() {
        let paragraphs = vec![
            "A long enough paragraph one.".to_string(),
            "A long enough paragraph two.".to_string(),
            "A long enough paragraph one.".to_string(),
        ];
        assert_eq!(
            join_paragraphs(paragraphs),
            "A long enough paragraph one.\n\nA long enough paragraph two."
        );
    }

    #[test]
    fn test_only_contents_root_is_read() {
        let html = "<html><body>\
            <p>This header paragraph is outside the content root.</p>\
            <div id=\"contents\"><p>This paragraph is the actual biography text.</p></div>\
            </body></html>";
        assert_eq!(format_document(html), "This paragraph is the actual biography text.");
    }

    #[test]
    fn test_whole_document_without_contents_root() {
        let html = "<p>First paragraph of the document body.</p><p>Second paragraph of the document body.</p>";
        assert_eq!(
            format_document(html),
            "First paragraph of the document body.\n\nSecond paragraph of the document body."
        );
    }

    #[test]
    fn test_empty_and_malformed_input() {
        assert_eq!(format_document(""), "");
        assert_eq!(format_document("<p><span class=\"c1\">unterminated"), "");
        assert_eq!(format_document("<div>no paragraphs here, only a div</div>"), "");
    }
}
