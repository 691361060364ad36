//! Block splitting for assistant replies
//!
//! Only fences and inline code spans are recognized here; everything else is
//! passed through as Markdown text for the display layer.

use super::diagram::{normalize_diagram_source, DiagramRenderer};
use super::highlight::SyntaxHighlighter;
use crate::error::DiagramRenderError;
use once_cell::sync::Lazy;
use regex::Regex;

static INLINE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`\n]+)`").expect("inline code pattern is valid"));

const FENCE: &str = "```";
const DIAGRAM_LANGUAGE: &str = "mermaid";

/// Inline code span; `text` is what a copy action puts on the clipboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineCode {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramOutput {
    Rendered(String),
    /// Shown in place of the diagram together with the offending source
    Failed {
        error: DiagramRenderError,
        source: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Text {
        markdown: String,
        inline_code: Vec<InlineCode>,
    },
    Code {
        language: Option<String>,
        source: String,
        highlighted: Option<String>,
    },
    Diagram {
        source: String,
        output: DiagramOutput,
    },
}

impl Block {
    /// Clipboard text for code and diagram blocks
    pub fn copy_text(&self) -> Option<&str> {
        match self {
            Block::Text { .. } => None,
            Block::Code { source, .. } | Block::Diagram { source, .. } => Some(source.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    /// Every copyable snippet in document order: code blocks, diagram sources
    /// and inline code spans
    pub fn copyable(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .flat_map(|block| match block {
                Block::Text { inline_code, .. } => {
                    inline_code.iter().map(|c| c.text.as_str()).collect::<Vec<_>>()
                }
                other => other.copy_text().into_iter().collect(),
            })
            .collect()
    }
}

/// Backends available to the renderer. Without a diagram renderer, diagram
/// blocks are kept as plain code.
#[derive(Clone, Copy, Default)]
pub struct RenderServices<'a> {
    pub diagrams: Option<&'a dyn DiagramRenderer>,
    pub highlighter: Option<&'a dyn SyntaxHighlighter>,
}

enum Segment<'t> {
    Text(Vec<&'t str>),
    Fence {
        info: &'t str,
        lines: Vec<&'t str>,
    },
}

fn opening_fence(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with(FENCE) {
        return None;
    }
    let ticks = trimmed.chars().take_while(|c| *c == '`').count();
    Some((ticks, trimmed[ticks..].trim()))
}

fn closes_fence(line: &str, ticks: usize) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= ticks && trimmed.chars().all(|c| c == '`')
}

fn split_segments(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut text_lines = Vec::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let Some((ticks, info)) = opening_fence(line) else {
            text_lines.push(line);
            continue;
        };

        if !text_lines.is_empty() {
            segments.push(Segment::Text(std::mem::take(&mut text_lines)));
        }

        // An unclosed fence runs to the end of the text
        let mut body = Vec::new();
        for inner in lines.by_ref() {
            if closes_fence(inner, ticks) {
                break;
            }
            body.push(inner);
        }
        segments.push(Segment::Fence { info, lines: body });
    }

    if !text_lines.is_empty() {
        segments.push(Segment::Text(text_lines));
    }
    segments
}

fn text_block(lines: &[&str]) -> Option<Block> {
    let markdown = lines.join("\n").trim().to_string();
    if markdown.is_empty() {
        return None;
    }
    let inline_code = INLINE_CODE
        .captures_iter(&markdown)
        .filter_map(|caps| caps.get(1))
        .map(|m| InlineCode {
            text: m.as_str().trim().to_string(),
        })
        .filter(|c| !c.text.is_empty())
        .collect();

    Some(Block::Text {
        markdown,
        inline_code,
    })
}

fn diagram_block(source: String, renderer: &dyn DiagramRenderer) -> Block {
    let normalized = normalize_diagram_source(&source);
    let output = match renderer.render_diagram(&normalized) {
        Ok(markup) => DiagramOutput::Rendered(markup),
        Err(error) => {
            tracing::debug!("[Render] Diagram failed: {}", error);
            DiagramOutput::Failed {
                error,
                source: source.clone(),
            }
        }
    };
    Block::Diagram { source, output }
}

fn code_block(language: Option<&str>, source: String, services: &RenderServices<'_>) -> Block {
    let highlighted = match (language, services.highlighter) {
        (Some(lang), Some(highlighter)) if highlighter.supports(lang) => {
            Some(highlighter.highlight(lang, &source))
        }
        _ => None,
    };
    Block::Code {
        language: language.map(str::to_string),
        source,
        highlighted,
    }
}

/// Split `text` into text, code and diagram blocks, running each fenced block
/// through the matching service.
pub fn render_markdown(text: &str, services: &RenderServices<'_>) -> Document {
    let blocks = split_segments(text)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Text(lines) => text_block(&lines),
            Segment::Fence { info, lines } => {
                let language = info.split_whitespace().next();
                let source = lines.join("\n");

                match (language, services.diagrams) {
                    (Some(lang), Some(renderer)) if lang.eq_ignore_ascii_case(DIAGRAM_LANGUAGE) => {
                        Some(diagram_block(source, renderer))
                    }
                    _ => Some(code_block(language, source, services)),
                }
            }
        })
        .collect();

    Document { blocks }
}
