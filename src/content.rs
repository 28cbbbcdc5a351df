//! Conversion of caller-supplied page bodies into Confluence storage format.
//!
//! Callers may send markdown or markup that is already HTML. HTML passes through
//! untouched; markdown is rendered with pulldown-cmark. Link destinations are
//! written out verbatim so that internal page links survive a round trip.

use once_cell::sync::Lazy;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;

static HTML_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[a-zA-Z][^>]*>").expect("valid html tag regex"));

/// Returns `true` when the content already contains an HTML element.
pub fn looks_like_html(content: &str) -> bool {
    let trimmed = content.trim();
    !trimmed.is_empty() && HTML_TAG.is_match(trimmed)
}

/// Convert a body into storage format.
///
/// Empty or whitespace-only input yields an empty string.
pub fn to_storage_format(content: &str) -> String {
    if content.trim().is_empty() {
        return String::new();
    }
    if looks_like_html(content) {
        return content.to_string();
    }

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let events = Parser::new_ext(content, options).map(|event| match event {
        Event::Start(Tag::Link {
            dest_url, title, ..
        }) => Event::Html(CowStr::from(open_anchor(&dest_url, &title))),
        Event::End(TagEnd::Link) => Event::Html(CowStr::Borrowed("</a>")),
        other => other,
    });

    let mut output = String::with_capacity(content.len() * 3 / 2);
    html::push_html(&mut output, events);
    output
}

fn open_anchor(dest_url: &str, title: &str) -> String {
    if title.is_empty() {
        format!("<a href=\"{}\">", escape_attribute(dest_url))
    } else {
        format!(
            "<a href=\"{}\" title=\"{}\">",
            escape_attribute(dest_url),
            escape_attribute(title)
        )
    }
}

// Only what would break out of a double-quoted attribute is escaped.
fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("&quot;"),
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
