//! Markdown to HTML conversion of document bodies.

use pulldown_cmark::{Options, Parser, html};
use tagpress_core::Document;

/// Markdown renderer with GitHub-flavoured extensions enabled.
#[derive(Debug, Clone, Copy)]
pub struct MarkdownRenderer {
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    #[must_use]
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        Self { options }
    }

    /// Render Markdown text to HTML.
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    }

    /// Render a document's raw body.
    pub fn document_html(&self, doc: &Document) -> String {
        self.render(&doc.body_text())
    }
}
