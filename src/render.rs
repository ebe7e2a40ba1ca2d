//! Rendering: turn reply text into what the result view displays.
//!
//! Three output formats exist because the same reply ends up in very
//! different places: an HTML container (the original page), a Markdown file
//! on disk, or a terminal.
//!
//! Streamed documents are re-rendered in full after every chunk. Markdown is
//! not incrementally renderable: a chunk can close an emphasis span or turn
//! the previous line into a setext heading, so only a render of the whole
//! buffer is guaranteed to match the final document.

use once_cell::sync::Lazy;
use pulldown_cmark::{html, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Output format of the result view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderFormat {
    /// Markdown rendered to HTML; errors as `<span class="error">`. (default)
    #[default]
    Html,
    /// Markdown passed through untouched; errors as plain text.
    Markdown,
    /// Plain text for terminals: markup and HTML tags removed.
    Text,
}

/// Renders Markdown, buffered messages and inline errors for one format.
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    format: RenderFormat,
}

impl Renderer {
    pub fn new(format: RenderFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> RenderFormat {
        self.format
    }

    /// Render a Markdown document.
    pub fn markdown(&self, input: &str) -> String {
        match self.format {
            RenderFormat::Html => markdown_to_html(input),
            RenderFormat::Markdown => input.to_string(),
            RenderFormat::Text => markdown_to_text(input),
        }
    }

    /// Render a buffered reply's `message`, which arrives pre-formatted.
    pub fn message(&self, message: &str) -> String {
        match self.format {
            RenderFormat::Html | RenderFormat::Markdown => message.to_string(),
            RenderFormat::Text => html_to_text(message),
        }
    }

    /// Render an inline error message.
    pub fn error(&self, message: &str) -> String {
        match self.format {
            RenderFormat::Html => format!("<span class=\"error\">{}</span>", escape_html(message)),
            RenderFormat::Markdown | RenderFormat::Text => message.to_string(),
        }
    }
}

/// Accumulates a streamed Markdown document chunk by chunk.
#[derive(Debug, Clone, Default)]
pub struct MarkdownDocument {
    text: String,
    chunks: usize,
}

impl MarkdownDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a decoded chunk.
    pub fn append(&mut self, chunk: &str) {
        self.text.push_str(chunk);
        self.chunks += 1;
    }

    /// Render the whole accumulated text.
    pub fn render(&self, renderer: &Renderer) -> String {
        renderer.markdown(&self.text)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);
    options
}

/// Render Markdown to HTML.
pub fn markdown_to_html(input: &str) -> String {
    let parser = Parser::new_ext(input, markdown_options());
    let mut output = String::with_capacity(input.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

/// Render Markdown to plain text: markup dropped, one blank line between blocks.
pub fn markdown_to_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for event in Parser::new_ext(input, markdown_options()) {
        match event {
            Event::Text(t) | Event::Code(t) => out.push_str(&t),
            Event::Html(t) | Event::InlineHtml(t) => out.push_str(&strip_tags(&t)),
            Event::SoftBreak | Event::HardBreak => out.push('\n'),
            Event::Rule => out.push_str("\n---\n"),
            Event::TaskListMarker(done) => out.push_str(if done { "[x] " } else { "[ ] " }),
            Event::Start(Tag::Item) => out.push_str("• "),
            Event::End(TagEnd::Item) | Event::End(TagEnd::TableRow) => out.push('\n'),
            Event::End(TagEnd::TableHead) => out.push('\n'),
            Event::End(TagEnd::TableCell) => out.push('\t'),
            Event::End(TagEnd::Paragraph)
            | Event::End(TagEnd::Heading(_))
            | Event::End(TagEnd::CodeBlock)
            | Event::End(TagEnd::List(_))
            | Event::End(TagEnd::Table) => out.push_str("\n\n"),
            _ => {}
        }
    }
    ensure_final_newline(&collapse_blank_lines(&out))
}

// ── Text cleanup rules ───────────────────────────────────────────────────────

static RE_BREAK_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>|</p>|</li>|</h[1-6]>|</div>").unwrap());

static RE_ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Convert an HTML fragment to plain text, keeping its line structure.
pub fn html_to_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_tags(&s);
    ensure_final_newline(&collapse_blank_lines(&s))
}

/// Remove tags (block-closing tags become newlines) and decode basic entities.
fn strip_tags(input: &str) -> String {
    let s = RE_BREAK_TAGS.replace_all(input, "\n");
    let s = RE_ANY_TAG.replace_all(&s, "");
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn collapse_blank_lines(input: &str) -> String {
    let trimmed: String = input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    RE_BLANK_LINES.replace_all(&trimmed, "\n\n").to_string()
}

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}

/// Escape text for inclusion in HTML, the way pulldown-cmark escapes text.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    // Writing into a String cannot fail.
    let _ = pulldown_cmark_escape::escape_html(&mut out, input);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_to_html() {
        assert_eq!(markdown_to_html("# Hello"), "<h1>Hello</h1>\n");
    }

    #[test]
    fn tables_are_enabled() {
        let html = markdown_to_html("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"), "got: {html}");
    }

    #[test]
    fn document_rerenders_whole_buffer() {
        let renderer = Renderer::new(RenderFormat::Html);
        let mut doc = MarkdownDocument::new();
        doc.append("Hello\n");
        assert_eq!(doc.render(&renderer), "<p>Hello</p>\n");
        // The second chunk turns the first line into a setext heading.
        doc.append("===\n");
        assert_eq!(doc.render(&renderer), "<h1>Hello</h1>\n");
        assert_eq!(doc.chunks(), 2);
    }

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&lt;/a&gt;"
        );
    }

    #[test]
    fn error_is_escaped_in_html() {
        let r = Renderer::new(RenderFormat::Html);
        assert_eq!(
            r.error("Error: <script>"),
            "<span class=\"error\">Error: &lt;script&gt;</span>"
        );
        assert_eq!(Renderer::new(RenderFormat::Text).error("boom"), "boom");
    }

    #[test]
    fn message_passes_through_in_html() {
        let r = Renderer::new(RenderFormat::Html);
        assert_eq!(r.message("<b>OK</b>"), "<b>OK</b>");
    }

    #[test]
    fn message_tags_stripped_in_text() {
        let r = Renderer::new(RenderFormat::Text);
        assert_eq!(r.message("<p>Approved &amp; filed</p>"), "Approved & filed\n");
    }

    #[test]
    fn markdown_to_text_drops_markup() {
        let text = markdown_to_text("# Result\n\n- **age** missing\n- onset\n");
        assert_eq!(text, "Result\n\n• age missing\n• onset\n");
    }

    #[test]
    fn markdown_format_is_identity() {
        let r = Renderer::new(RenderFormat::Markdown);
        assert_eq!(r.markdown("# Hel"), "# Hel");
    }

    #[test]
    fn empty_document_renders_empty() {
        assert_eq!(markdown_to_text(""), "");
        assert_eq!(markdown_to_html(""), "");
    }
}
