//! Markdown Rendering Routes
//!
//! Information Hiding:
//! - Fence detection and inline code scanning are internal
//! - Diagram and highlighting backends are injected through traits
//! - A failing block never fails the document

pub mod diagram;
pub mod highlight;
pub mod markdown;

pub use diagram::{normalize_diagram_source, DiagramRenderer, DIAGRAM_PREFIXES};
pub use highlight::{SyntaxHighlighter, TerminalHighlighter};
pub use markdown::{render_markdown, Block, DiagramOutput, Document, InlineCode, RenderServices};
