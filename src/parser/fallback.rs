use std::sync::OnceLock;

use regex::Regex;

use crate::graph::node::{ByteRange, SymbolKind};

use super::{Declaration, ReferenceKind, ReferenceSite, SyntaxFacts};

fn decl_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^([ \t]*)(def|class|function|fn)\s+([A-Za-z_][A-Za-z0-9_]*)")
            .expect("static regex")
    })
}

fn call_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("static regex"))
}

/// Words followed by `(` that are never calls.
const KEYWORDS: &[&str] = &[
    "def", "class", "function", "fn", "if", "elif", "while", "for", "return", "switch", "catch",
    "with", "and", "or", "not", "in", "match", "sizeof", "typeof",
];

/// Heuristic extraction for files without a grammar.
///
/// Declarations are module-level; a call is attributed to the nearest preceding
/// function-like declaration that is indented less than the call's line.
pub fn collect(text: &str) -> SyntaxFacts {
    let mut facts = SyntaxFacts::default();

    // (indent, name, byte offset of the declaration line)
    let mut functions: Vec<(usize, String, usize)> = Vec::new();
    let mut decls = decl_pattern().captures_iter(text).peekable();

    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        let trimmed = line.trim_start();
        if trimmed.is_empty() {
            continue;
        }
        let indent = line.len() - trimmed.len();
        while functions.last().map(|(i, _, _)| *i >= indent).unwrap_or(false) {
            functions.pop();
        }

        let mut declared_here: Option<(usize, usize)> = None;
        while let Some(caps) = decls.peek() {
            let whole = caps.get(0).map(|m| m.start()).unwrap_or(0);
            if whole >= offset {
                break;
            }
            if let (Some(keyword), Some(name)) = (caps.get(2), caps.get(3)) {
                let kind = if keyword.as_str() == "class" {
                    SymbolKind::Class
                } else {
                    SymbolKind::Function
                };
                let end = line_start + line.trim_end().len();
                facts.declarations.push(Declaration {
                    kind,
                    name: Some(name.as_str().to_string()),
                    range: ByteRange::new(keyword.start(), end.max(keyword.end())),
                    scope_path: Vec::new(),
                    owner: None,
                    signature: line.trim().trim_end_matches([':', '{']).trim().to_string(),
                    visibility: None,
                });
                declared_here = Some((name.start(), name.end()));
                if kind == SymbolKind::Function {
                    functions.push((indent, name.as_str().to_string(), facts.declarations.len() - 1));
                }
            }
            decls.next();
        }

        let (scope, owner) = match functions.last() {
            Some((_, name, decl)) => (vec![name.clone()], Some(*decl)),
            None => (Vec::new(), None),
        };
        for caps in call_pattern().captures_iter(line) {
            let Some(name) = caps.get(1) else { continue };
            let start = line_start + name.start();
            if declared_here == Some((start, line_start + name.end())) {
                continue;
            }
            if KEYWORDS.contains(&name.as_str()) {
                continue;
            }
            // `obj.method(` is left alone: without a grammar the receiver is unknown.
            if line[..name.start()].ends_with('.') {
                continue;
            }
            facts.references.push(ReferenceSite {
                kind: ReferenceKind::Call,
                text: name.as_str().to_string(),
                range: ByteRange::new(start, line_start + name.end()),
                scope_path: scope.clone(),
                owner,
            });
        }
    }

    facts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_def_and_class() {
        let facts = collect("class Shape:\n    def area(self):\n        return helper(1)\n\ndef helper(x):\n    pass\n");
        let names: Vec<_> = facts
            .declarations
            .iter()
            .map(|d| (d.name.clone().unwrap_or_default(), d.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Shape".to_string(), SymbolKind::Class),
                ("area".to_string(), SymbolKind::Function),
                ("helper".to_string(), SymbolKind::Function),
            ]
        );
        assert!(facts.declarations.iter().all(|d| d.scope_path.is_empty()));
    }

    #[test]
    fn test_calls_scoped_to_enclosing_function() {
        let facts = collect("def a():\n    b()\n\nc()\n");
        let calls: Vec<_> = facts
            .references
            .iter()
            .map(|r| (r.text.as_str(), r.scope_path.clone()))
            .collect();
        assert_eq!(
            calls,
            vec![("b", vec!["a".to_string()]), ("c", Vec::new())]
        );
    }

    #[test]
    fn test_keywords_and_methods_are_not_calls() {
        let facts = collect("if (x) { obj.run(1) }\nwhile (y) {}\n");
        assert!(facts.references.is_empty(), "{:?}", facts.references);
    }
}
