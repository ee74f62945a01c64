//! Markdown to HTML delegation
//!
//! The service stores article content as Markdown and converts it on every
//! detail view; nothing is cached. Conversion is delegated entirely to
//! `pulldown-cmark` - no Markdown parsing happens in this crate.
//!
//! The produced HTML is handed to the templating layer as pre-rendered
//! markup and injected unescaped. The trust boundary: only holders of the
//! `manage-articles` capability can author content, so converter output is
//! trusted as-is.

use pulldown_cmark::{html::push_html, Options, Parser};

/// Render article Markdown to an HTML fragment.
pub fn render_markdown(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(markdown, options);
    let mut html = String::new();
    push_html(&mut html, parser);
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_renders_as_h2() {
        let html = render_markdown("## Reset\n1. Go to page");
        assert!(html.contains("<h2>"));
        assert!(html.contains("Reset"));
    }

    #[test]
    fn test_ordered_list_renders() {
        let html = render_markdown("1. First step\n2. Second step");
        assert!(html.contains("<ol>"));
        assert!(html.contains("<li>First step</li>"));
    }

    #[test]
    fn test_inline_code_renders() {
        let html = render_markdown("Forget and reconnect to `CorpNet`.");
        assert!(html.contains("<code>CorpNet</code>"));
    }

    #[test]
    fn test_empty_input_renders_empty() {
        assert_eq!(render_markdown(""), "");
    }
}
