//! Syntax highlighting for fenced code blocks

use colored::*;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Highlights source code for a language tag
pub trait SyntaxHighlighter: Send + Sync {
    fn supports(&self, language: &str) -> bool;

    /// Highlighted text; only called for supported languages
    fn highlight(&self, language: &str, source: &str) -> String;
}

struct Grammar {
    pattern: Regex,
}

impl Grammar {
    fn new(line_comment: Option<&str>, keywords: &[&str]) -> Self {
        let mut alternatives = Vec::new();
        if let Some(marker) = line_comment {
            alternatives.push(format!(r"(?P<comment>{}[^\n]*)", regex::escape(marker)));
        }
        alternatives.push(r#"(?P<string>"(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*')"#.to_string());
        alternatives.push(r"(?P<number>\b\d+(?:\.\d+)?\b)".to_string());
        if !keywords.is_empty() {
            alternatives.push(format!(r"(?P<keyword>\b(?:{})\b)", keywords.join("|")));
        }

        Self {
            pattern: Regex::new(&alternatives.join("|")).expect("grammar pattern is valid"),
        }
    }
}

static GRAMMARS: Lazy<HashMap<&'static str, Grammar>> = Lazy::new(|| {
    let rust = Grammar::new(
        Some("//"),
        &[
            "as", "async", "await", "break", "const", "continue", "crate", "else", "enum",
            "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
            "pub", "ref", "return", "self", "Self", "static", "struct", "trait", "type",
            "use", "where", "while",
        ],
    );
    let python = Grammar::new(
        Some("#"),
        &[
            "and", "as", "async", "await", "class", "def", "elif", "else", "except",
            "False", "for", "from", "if", "import", "in", "is", "lambda", "None", "not",
            "or", "pass", "raise", "return", "True", "try", "while", "with", "yield",
        ],
    );
    let javascript = Grammar::new(
        Some("//"),
        &[
            "async", "await", "break", "class", "const", "else", "export", "false",
            "for", "function", "if", "import", "let", "new", "null", "return", "this",
            "true", "try", "catch", "typeof", "var", "while",
        ],
    );
    let shell = Grammar::new(
        Some("#"),
        &["case", "do", "done", "echo", "elif", "else", "esac", "export", "fi", "for", "if", "in", "then", "while"],
    );
    let json = Grammar::new(None, &["true", "false", "null"]);

    let mut grammars = HashMap::new();
    grammars.insert("rust", rust);
    grammars.insert("python", python);
    grammars.insert("javascript", javascript);
    grammars.insert("bash", shell);
    grammars.insert("json", json);
    grammars
});

fn canonical(language: &str) -> Option<&'static str> {
    match language.to_lowercase().as_str() {
        "rust" | "rs" => Some("rust"),
        "python" | "py" => Some("python"),
        "javascript" | "js" | "jsx" | "typescript" | "ts" | "tsx" => Some("javascript"),
        "bash" | "sh" | "shell" | "zsh" => Some("bash"),
        "json" => Some("json"),
        _ => None,
    }
}

/// ANSI highlighter for the terminal front-end
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalHighlighter;

impl SyntaxHighlighter for TerminalHighlighter {
    fn supports(&self, language: &str) -> bool {
        canonical(language).is_some()
    }

    fn highlight(&self, language: &str, source: &str) -> String {
        let Some(grammar) = canonical(language).and_then(|name| GRAMMARS.get(name)) else {
            return source.to_string();
        };

        let mut out = String::with_capacity(source.len());
        let mut last = 0;

        for caps in grammar.pattern.captures_iter(source) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&source[last..whole.start()]);

            let token = whole.as_str();
            let painted = if caps.name("comment").is_some() {
                token.dimmed().to_string()
            } else if caps.name("string").is_some() {
                token.green().to_string()
            } else if caps.name("number").is_some() {
                token.magenta().to_string()
            } else {
                token.blue().bold().to_string()
            };
            out.push_str(&painted);
            last = whole.end();
        }

        out.push_str(&source[last..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_ansi(text: &str) -> String {
        Regex::new(r"\x1b\[[0-9;]*m").unwrap().replace_all(text, "").to_string()
    }

    #[test]
    fn test_supported_languages() {
        let highlighter = TerminalHighlighter;
        assert!(highlighter.supports("rust"));
        assert!(highlighter.supports("TS"));
        assert!(highlighter.supports("sh"));
        assert!(!highlighter.supports("brainfuck"));
        assert!(!highlighter.supports(""));
    }

    #[test]
    fn test_highlight_preserves_text() {
        let source = "fn main() {\n    let s = \"hi // there\"; // note\n    println!(\"{}\", 42);\n}";
        let highlighted = TerminalHighlighter.highlight("rust", source);
        assert_eq!(strip_ansi(&highlighted), source);
    }

    #[test]
    fn test_unsupported_language_passthrough() {
        assert_eq!(TerminalHighlighter.highlight("cobol", "MOVE A TO B"), "MOVE A TO B");
    }
}
