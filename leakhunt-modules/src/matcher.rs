//! Keyword matching and snippet extraction
//!
//! Matching is plain case-insensitive containment over the fetched body.
//! Snippets prefer the text of the smallest block around a hit and fall back
//! to a character window of the raw body.

use regex::{Regex, RegexBuilder};
use scraper::node::Node;
use scraper::{ElementRef, Html};

use leakhunt_core::NO_SNIPPET;

use crate::text::{in_hidden_element, normalize_whitespace};

/// Characters of context on each side of a hit in the fallback window
pub const DEFAULT_CONTEXT_CHARS: usize = 200;

/// Elements whose text makes a snippet
const CONTAINER_TAGS: &[&str] = &[
    "p",
    "li",
    "div",
    "span",
    "article",
    "section",
    "td",
    "blockquote",
];

/// Keywords found on a page and the text around them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatch {
    /// Matched keywords, in configured order
    pub keywords: Vec<String>,
    /// Extracted snippet text
    pub snippet: String,
}

/// Keywords contained in `text`, ignoring case, in configured order.
/// An empty keyword list matches nothing.
pub fn find_keywords(text: &str, keywords: &[String]) -> Vec<String> {
    if keywords.is_empty() {
        return Vec::new();
    }

    let text = text.to_lowercase();
    let mut found: Vec<String> = Vec::new();
    for keyword in keywords {
        let keyword = keyword.to_lowercase();
        if !keyword.is_empty() && text.contains(&keyword) && !found.contains(&keyword) {
            found.push(keyword);
        }
    }
    found
}

/// Snippets for matched keywords, joined by blank lines.
///
/// Returns [`NO_SNIPPET`] when no keyword can be located.
pub fn extract_snippet(html: &str, matched: &[String], context_chars: usize) -> String {
    let document = Html::parse_document(html);
    let mut snippets: Vec<String> = Vec::new();

    for keyword in matched {
        let pattern = match keyword_pattern(keyword) {
            Some(p) => p,
            None => continue,
        };

        let mut in_container = false;
        for node_ref in document.root_element().descendants() {
            let text = match node_ref.value() {
                Node::Text(text) => text,
                _ => continue,
            };
            if !pattern.is_match(text) || in_hidden_element(node_ref.ancestors().map(|a| a.value())) {
                continue;
            }

            let container = node_ref
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|el| CONTAINER_TAGS.contains(&el.value().name()));

            if let Some(container) = container {
                let snippet = normalize_whitespace(&container.text().collect::<Vec<_>>().join(" "));
                if !snippet.is_empty() {
                    in_container = true;
                    push_unique(&mut snippets, snippet);
                }
            }
        }

        if !in_container {
            if let Some(window) = raw_window(html, &pattern, context_chars) {
                push_unique(&mut snippets, window);
            }
        }
    }

    if snippets.is_empty() {
        NO_SNIPPET.to_string()
    } else {
        snippets.join("\n\n")
    }
}

/// Match configured keywords against a fetched body
pub fn match_page(body: &str, keywords: &[String]) -> Option<KeywordMatch> {
    let keywords = find_keywords(body, keywords);
    if keywords.is_empty() {
        return None;
    }

    let snippet = extract_snippet(body, &keywords, DEFAULT_CONTEXT_CHARS);
    Some(KeywordMatch { keywords, snippet })
}

fn keyword_pattern(keyword: &str) -> Option<Regex> {
    if keyword.trim().is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(keyword))
        .case_insensitive(true)
        .build()
        .ok()
}

/// `context_chars` characters either side of the first hit, on one line
fn raw_window(text: &str, pattern: &Regex, context_chars: usize) -> Option<String> {
    let hit = pattern.find(text)?;

    let start = if context_chars == 0 {
        hit.start()
    } else {
        text[..hit.start()]
            .char_indices()
            .rev()
            .nth(context_chars - 1)
            .map_or(0, |(i, _)| i)
    };
    let end = text[hit.end()..]
        .char_indices()
        .nth(context_chars)
        .map_or(text.len(), |(i, _)| hit.end() + i);

    let window = text[start..end].replace(['\n', '\r'], " ");
    let window = window.trim();
    (!window.is_empty()).then(|| window.to_string())
}

fn push_unique(snippets: &mut Vec<String>, snippet: String) {
    if !snippets.contains(&snippet) {
        snippets.push(snippet);
    }
}
