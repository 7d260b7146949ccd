//! Visible text of fetched pages

use scraper::node::Node;
use scraper::{Html, Selector};

/// Title and visible text of an HTML page.
///
/// Script, style and noscript contents are skipped. Markup that cannot be
/// parsed sensibly simply yields less text.
pub fn page_text(html: &str) -> (Option<String>, String) {
    let document = Html::parse_document(html);

    let title_selector = Selector::parse("title").unwrap();
    let title = document
        .select(&title_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let mut text_parts = Vec::new();

    // Walk all descendants, skip script/style/noscript subtrees
    for node_ref in document.root_element().descendants() {
        if let Node::Text(text_node) = node_ref.value() {
            if in_hidden_element(node_ref.ancestors().map(|a| a.value())) {
                continue;
            }
            let trimmed = text_node.trim();
            if !trimmed.is_empty() {
                text_parts.push(trimmed.to_string());
            }
        }
    }

    (title, normalize_whitespace(&text_parts.join(" ")))
}

/// Whether any of a node's ancestors is script, style or noscript
pub(crate) fn in_hidden_element<'a>(mut ancestors: impl Iterator<Item = &'a Node>) -> bool {
    ancestors.any(|ancestor| {
        ancestor
            .as_element()
            .map(|el| matches!(el.name(), "script" | "style" | "noscript"))
            .unwrap_or(false)
    })
}

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_text() {
        let html = r#"
            <html>
            <head><title>Dread Forum</title><style>.x { color: red; }</style></head>
            <body>
                <script>var thread = 1;</script>
                <h1>Welcome</h1>
                <p>Latest   dumps
                   posted today.</p>
                <noscript>enable js</noscript>
            </body>
            </html>
        "#;

        let (title, text) = page_text(html);

        assert_eq!(title, Some("Dread Forum".to_string()));
        assert!(text.contains("Welcome"));
        assert!(text.contains("Latest dumps posted today."));
        assert!(!text.contains("var thread"));
        assert!(!text.contains("color: red"));
        assert!(!text.contains("enable js"));
    }

    #[test]
    fn test_empty_and_plain_text() {
        assert_eq!(page_text(""), (None, String::new()));

        let (title, text) = page_text("just some text");
        assert!(title.is_none());
        assert_eq!(text, "just some text");
    }

    #[test]
    fn test_normalize_whitespace() {
        let input = "  hello   world  \n\t  test  ";
        let output = normalize_whitespace(input);
        assert_eq!(output, "hello world test");
    }
}
