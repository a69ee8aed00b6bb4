//! HTML to text lines.

use scraper::{Html, Node};

/// Elements whose text never reaches the reader.
const SKIPPED_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

/// Render a document as trimmed, non-empty text lines.
///
/// Every text node starts a new line, so inline markup splits a sentence
/// (`<b>Deadline:</b> May 1` gives two lines). Plain text input comes out
/// as its own lines.
pub fn html_to_lines(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut lines = Vec::new();

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| match a.value() {
            Node::Element(e) => SKIPPED_ELEMENTS.contains(&e.name()),
            _ => false,
        });
        if hidden {
            continue;
        }
        lines.extend(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
        );
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_text_nodes_and_newlines() {
        let html = r#"<html><body>
            <h1>Call for Papers</h1>
            <p>Submission deadline:
               <b>March 3, 2025</b></p>
            <ul><li>Notification: May 1, 2025</li></ul>
        </body></html>"#;
        assert_eq!(
            html_to_lines(html),
            vec![
                "Call for Papers",
                "Submission deadline:",
                "March 3, 2025",
                "Notification: May 1, 2025",
            ]
        );
    }

    #[test]
    fn skips_scripts_styles_and_comments() {
        let html = r#"<html><head>
            <title>CFP</title>
            <style>body { color: red }</style>
            <script>var deadline = "2025-01-01";</script>
        </head><body>
            <!-- old deadline 2024-12-01 -->
            <noscript>Enable JavaScript</noscript>
            <p>Abstracts due 2025-02-01</p>
        </body></html>"#;
        assert_eq!(html_to_lines(html), vec!["CFP", "Abstracts due 2025-02-01"]);
    }

    #[test]
    fn plain_text_passes_through() {
        let text = "Paper deadline: June 6, 2025\n\n   Camera ready: Aug 1  \n";
        assert_eq!(
            html_to_lines(text),
            vec!["Paper deadline: June 6, 2025", "Camera ready: Aug 1"]
        );
    }

    #[test]
    fn entities_are_decoded() {
        let lines = html_to_lines("<p>S&amp;P deadline&nbsp;&#8211; Nov 14</p>");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("S&P deadline"));
        assert!(lines[0].ends_with("Nov 14"));
    }

    #[test]
    fn empty_document_has_no_lines() {
        assert!(html_to_lines("").is_empty());
        assert!(html_to_lines("<html><body>   </body></html>").is_empty());
    }
}
