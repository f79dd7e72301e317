//! Text cleanup shared by the extraction strategies.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Node};

/// Cleaned text is cut at this many characters.
pub const MAX_CLEAN_CHARS: usize = 15_000;

/// Lines this short or shorter are treated as navigation noise.
const MIN_LINE_CHARS: usize = 15;

const TRUNCATION_MARKER: &str = "... [truncated]";

lazy_static! {
    static ref SPACES: Regex = Regex::new(r"[ \t]+").unwrap();
    static ref CONTROL_CHARS: Regex = Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").unwrap();
    static ref UNUSUAL_CHARS: Regex = Regex::new(r"[^\w\s.,;:!?\-()%$€£¥]").unwrap();
}

/// Tags whose content is never page text.
pub const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Tags removed before looking for the main content.
pub const BOILERPLATE_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "nav", "footer", "header", "form",
    "aside", "iframe", "menu",
];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "section",
    "article", "main", "tr", "table", "blockquote", "pre", "dd", "dt",
];

/// Text under `element`, skipping subtrees whose tag is in `skip`.
///
/// Block elements are separated by newlines so line-based cleanup can
/// tell paragraphs apart.
pub fn visible_text(element: ElementRef<'_>, skip: &[&str]) -> String {
    let mut out = String::new();
    collect_text(element, skip, &mut out);
    out
}

fn collect_text(element: ElementRef<'_>, skip: &[&str], out: &mut String) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            let name = child_element.value().name();
            if skip.contains(&name) {
                continue;
            }
            let block = BLOCK_TAGS.contains(&name);
            if block {
                out.push('\n');
            }
            collect_text(child_element, skip, out);
            if block {
                out.push('\n');
            }
        } else if let Node::Text(text) = child.value() {
            out.push_str(text);
        }
    }
}

/// Normalize extracted text.
///
/// Collapses runs of spaces, strips control and unusual characters (accents
/// are kept), drops lines of 15 characters or fewer and consecutive
/// duplicate lines, and caps the result at [`MAX_CLEAN_CHARS`].
pub fn clean_text(text: &str) -> String {
    let text = CONTROL_CHARS.replace_all(text, "");
    let text = UNUSUAL_CHARS.replace_all(&text, "");
    let text = SPACES.replace_all(&text, " ");

    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.chars().count() <= MIN_LINE_CHARS {
            continue;
        }
        if lines.last() == Some(&line) {
            continue;
        }
        lines.push(line);
    }

    let cleaned = lines.join("\n");
    truncate_chars(&cleaned, MAX_CLEAN_CHARS)
}

/// Cut `text` to `max` characters, marking the cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => format!("{}{}", &text[..byte_index], TRUNCATION_MARKER),
        None => text.trim().to_string(),
    }
}
