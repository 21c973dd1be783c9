use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Represents a programming language handled by the engine.
///
/// Uses a plain enum (not trait objects) to avoid `dyn` overhead. Cheap to copy
/// and pattern-matched at dispatch boundaries: every grammar-specific step in
/// `parser` is a `match` on this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LanguageKind {
    Python,
    JavaScript,
    TypeScript,
    /// TypeScript with JSX. Needs its own grammar: the TS grammar cannot parse JSX,
    /// and the TSX grammar rejects `<T>expr` assertions.
    Tsx,
    Rust,
    /// No grammar applies; the heuristic adapter is used.
    PlainText,
}

impl LanguageKind {
    /// Map a file extension (without the dot) to a language.
    pub fn from_extension(ext: &str) -> Option<LanguageKind> {
        match ext {
            "py" | "pyi" | "pyw" => Some(LanguageKind::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(LanguageKind::JavaScript),
            "ts" | "mts" | "cts" => Some(LanguageKind::TypeScript),
            "tsx" => Some(LanguageKind::Tsx),
            "rs" => Some(LanguageKind::Rust),
            "txt" => Some(LanguageKind::PlainText),
            _ => None,
        }
    }

    /// Returns true if this language kind matches a given file extension.
    pub fn matches_extension(&self, ext: &str) -> bool {
        LanguageKind::from_extension(ext) == Some(*self)
    }

    /// Human-readable display name for stats output.
    pub fn display_name(&self) -> &'static str {
        match self {
            LanguageKind::Python => "Python",
            LanguageKind::JavaScript => "JavaScript",
            LanguageKind::TypeScript => "TypeScript",
            LanguageKind::Tsx => "TSX",
            LanguageKind::Rust => "Rust",
            LanguageKind::PlainText => "Plain text",
        }
    }

    /// Parse a language hint into a `LanguageKind`. Case-insensitive.
    ///
    /// Accepted values:
    /// - "python" or "py"      -> Python
    /// - "javascript" or "js"  -> JavaScript
    /// - "typescript" or "ts"  -> TypeScript
    /// - "tsx"                 -> Tsx
    /// - "rust" or "rs"        -> Rust
    /// - "text" or "plain"     -> PlainText
    pub fn from_str_loose(s: &str) -> Option<LanguageKind> {
        match s.trim().to_lowercase().as_str() {
            "python" | "py" => Some(LanguageKind::Python),
            "javascript" | "js" | "jsx" => Some(LanguageKind::JavaScript),
            "typescript" | "ts" => Some(LanguageKind::TypeScript),
            "tsx" => Some(LanguageKind::Tsx),
            "rust" | "rs" => Some(LanguageKind::Rust),
            "text" | "plain" | "plaintext" | "txt" => Some(LanguageKind::PlainText),
            _ => None,
        }
    }

    /// Whether a tree-sitter grammar backs this language.
    pub fn has_grammar(&self) -> bool {
        !matches!(self, LanguageKind::PlainText)
    }
}

/// Guess a language from file content.
///
/// Used when the extension is absent or unknown. A shebang line wins; otherwise
/// each language scores one point per distinctive token and the best score is
/// taken, ties going to the earlier language in the list below.
pub fn sniff_language(text: &str) -> Option<LanguageKind> {
    if let Some(first) = text.lines().next()
        && first.starts_with("#!")
    {
        if first.contains("python") {
            return Some(LanguageKind::Python);
        }
        if first.contains("ts-node") {
            return Some(LanguageKind::TypeScript);
        }
        if first.contains("node") || first.contains("deno") || first.contains("bun") {
            return Some(LanguageKind::JavaScript);
        }
    }

    const MARKERS: &[(LanguageKind, &[&str])] = &[
        (LanguageKind::Rust, &["fn ", "let mut ", "impl ", "pub fn ", "use crate::", "::new("]),
        (LanguageKind::Python, &["def ", "self.", "elif ", "import ", "__init__", "):\n"]),
        (LanguageKind::TypeScript, &["interface ", ": string", ": number", "export type "]),
        (LanguageKind::JavaScript, &["function ", "const ", "=> ", "require(", "export "]),
    ];

    let mut best: Option<(LanguageKind, usize)> = None;
    for (lang, markers) in MARKERS {
        let score = markers.iter().filter(|m| text.contains(**m)).count();
        if score > 0 && best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((*lang, score));
        }
    }
    best.map(|(lang, _)| lang)
}

/// Select the language for one input.
///
/// Order: explicit hint, configured extension override, built-in extension table,
/// content sniffing, then `PlainText`.
pub fn detect_language(
    path: &Path,
    hint: Option<&str>,
    text: &str,
    overrides: &BTreeMap<String, String>,
) -> LanguageKind {
    if let Some(lang) = hint.and_then(LanguageKind::from_str_loose) {
        return lang;
    }
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if let Some(lang) = overrides
        .get(ext)
        .and_then(|name| LanguageKind::from_str_loose(name))
    {
        return lang;
    }
    if let Some(lang) = LanguageKind::from_extension(ext) {
        return lang;
    }
    sniff_language(text).unwrap_or(LanguageKind::PlainText)
}
