//! Body rendering: prefer the plain-text part, fall back to converted HTML, then a placeholder.

use crate::config::HtmlConverterKind;
use regex::Regex;
use std::sync::Arc;

/// Written when a message has neither a plain nor a usable HTML body.
pub const EMPTY_BODY_PLACEHOLDER: &str = "(empty)";

/// HTML → readable text. Implementations are picked once from config, not per call.
pub trait HtmlConverter: Send + Sync {
    fn convert(&self, html: &str) -> String;
}

/// Build the converter named in config.
pub fn converter_for(kind: HtmlConverterKind) -> Arc<dyn HtmlConverter> {
    match kind {
        HtmlConverterKind::Markdown => Arc::new(MarkdownConverter::default()),
        HtmlConverterKind::Strip => Arc::new(TagStripper::new()),
    }
}

/// Choose the body to commit.
///
/// The plain part wins when it has any content (returned with trailing whitespace removed);
/// otherwise the HTML part is converted; otherwise [`EMPTY_BODY_PLACEHOLDER`].
pub fn render_body(plain: &str, html: &str, converter: &dyn HtmlConverter) -> String {
    let plain = plain.trim_end();
    if !plain.is_empty() {
        return plain.to_string();
    }
    let html = html.trim();
    if !html.is_empty() {
        let text = converter.convert(html);
        if !text.trim().is_empty() {
            return text;
        }
    }
    EMPTY_BODY_PLACEHOLDER.to_string()
}

/// HTML to markdown via htmd. Links keep their destinations; images and non-content
/// elements are skipped.
pub struct MarkdownConverter {
    converter: htmd::HtmlToMarkdown,
    fallback: TagStripper,
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        Self {
            converter: htmd::HtmlToMarkdown::builder()
                .skip_tags(vec!["head", "script", "style", "img"])
                .build(),
            fallback: TagStripper::new(),
        }
    }
}

impl HtmlConverter for MarkdownConverter {
    fn convert(&self, html: &str) -> String {
        match self.converter.convert(html) {
            Ok(md) => md.trim().to_string(),
            Err(e) => {
                log::warn!("html to markdown conversion failed, stripping tags instead: {}", e);
                self.fallback.convert(html)
            }
        }
    }
}

/// Minimal converter: line breaks and block ends become newlines, remaining tags are dropped,
/// entities are unescaped.
pub struct TagStripper {
    hidden: Regex,
    line_break: Regex,
    block_end: Regex,
    tag: Regex,
}

impl Default for TagStripper {
    fn default() -> Self {
        Self::new()
    }
}

impl TagStripper {
    pub fn new() -> Self {
        Self {
            hidden: Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<head\b.*?</head\s*>")
                .expect("hidden-element pattern is valid"),
            line_break: Regex::new(r"(?i)<br\s*/?>").expect("line break pattern is valid"),
            block_end: Regex::new(r"(?i)</(p|div|li|tr|h[1-6])\s*>")
                .expect("block end pattern is valid"),
            tag: Regex::new(r"<[^>]+>").expect("tag pattern is valid"),
        }
    }
}

impl HtmlConverter for TagStripper {
    fn convert(&self, html: &str) -> String {
        let text = self.hidden.replace_all(html, "");
        let text = self.line_break.replace_all(&text, "\n");
        let text = self.block_end.replace_all(&text, "\n");
        let text = self.tag.replace_all(&text, "");
        html_escape::decode_html_entities(&text).trim().to_string()
    }
}
