//! Diagram blocks (fenced `mermaid`)

use crate::error::DiagramRenderError;

/// Diagram types a `mermaid` block may start with
pub const DIAGRAM_PREFIXES: [&str; 8] = [
    "graph",
    "sequenceDiagram",
    "classDiagram",
    "stateDiagram",
    "erDiagram",
    "flowchart",
    "gantt",
    "pie",
];

const DEFAULT_PREFIX: &str = "graph TD\n";

/// Turns diagram source into displayable markup (SVG for graphical front-ends)
pub trait DiagramRenderer: Send + Sync {
    fn render_diagram(&self, source: &str) -> Result<String, DiagramRenderError>;
}

/// Source as handed to the renderer: trimmed, and prefixed with `graph TD`
/// when it does not start with a known diagram type.
pub fn normalize_diagram_source(source: &str) -> String {
    let trimmed = source.trim();
    let lowered = trimmed.to_lowercase();

    let recognized = DIAGRAM_PREFIXES
        .iter()
        .any(|prefix| lowered.starts_with(&prefix.to_lowercase()));

    if recognized {
        trimmed.to_string()
    } else {
        format!("{}{}", DEFAULT_PREFIX, trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_prefix_kept() {
        assert_eq!(
            normalize_diagram_source("  sequenceDiagram\n  A->>B: hi\n"),
            "sequenceDiagram\n  A->>B: hi"
        );
        assert_eq!(normalize_diagram_source("PIE title x"), "PIE title x");
    }

    #[test]
    fn test_unknown_prefix_gets_default_graph() {
        assert_eq!(normalize_diagram_source("A --> B"), "graph TD\nA --> B");
    }
}
