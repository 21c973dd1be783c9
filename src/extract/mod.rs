//! Symbol extraction: turns one file's syntax facts into unit-local symbols.
//!
//! Symbols are numbered locally (index 0 is always the unit's Module symbol);
//! global ids are assigned later, once every unit is known.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::config::EngineConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::graph::node::{ByteRange, SymbolKind, Visibility};
use crate::language::LanguageKind;
use crate::parser::{ImportSite, ReferenceKind, SyntaxFacts, SyntaxTree};

/// File stems that stand for their directory rather than a module of their own.
fn package_stems(extension: &str) -> &'static [&'static str] {
    match extension {
        "py" | "pyi" | "pyw" => &["__init__"],
        "rs" => &["mod", "lib", "main"],
        "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" | "mts" | "cts" => &["index"],
        _ => &[],
    }
}

/// A symbol declared in one unit, before global numbering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSymbol {
    pub kind: SymbolKind,
    pub name: String,
    pub qualified_name: String,
    pub range: ByteRange,
    pub line: usize,
    /// Local index of the enclosing symbol; `None` only for the Module at index 0.
    pub parent: Option<usize>,
    pub signature: String,
    pub visibility: Option<Visibility>,
}

/// A reference site attributed to its enclosing local symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalReference {
    pub kind: ReferenceKind,
    pub text: String,
    pub range: ByteRange,
    /// Local index of the innermost enclosing declaration.
    pub source: usize,
}

/// Everything phase one produces for a single file.
#[derive(Debug, Clone)]
pub struct ExtractedUnit {
    pub path: PathBuf,
    pub language: LanguageKind,
    /// Qualified name of the unit's Module symbol.
    pub module_name: String,
    /// `__init__.py`, `mod.rs`, `index.ts`: the module names its directory.
    pub is_package: bool,
    pub symbols: Vec<LocalSymbol>,
    pub references: Vec<LocalReference>,
    pub imports: Vec<ImportSite>,
    pub error_spans: Vec<ByteRange>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ExtractedUnit {
    /// A unit holding only its Module symbol, used when no syntax tree could be built.
    pub fn module_only(path: &Path, language: LanguageKind, text_len: usize) -> Self {
        let module_name = module_name(path);
        Self {
            path: path.to_path_buf(),
            language,
            is_package: is_package(path),
            symbols: vec![module_symbol(path, &module_name, text_len)],
            module_name,
            references: Vec::new(),
            imports: Vec::new(),
            error_spans: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Local indices of symbols declared directly in the module, in first-seen order.
    pub fn top_level(&self) -> impl Iterator<Item = usize> + '_ {
        self.symbols
            .iter()
            .enumerate()
            .filter(|(_, s)| s.parent == Some(0))
            .map(|(i, _)| i)
    }
}

/// Dotted module path for a unit: `pkg/util/parse.py` -> `pkg.util.parse`,
/// `src/graph/mod.rs` -> `src.graph`.
pub fn module_name(path: &Path) -> String {
    let mut parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if let Some(last) = parts.pop() {
        let file = Path::new(&last);
        let extension = file.extension().and_then(|e| e.to_str()).unwrap_or("");
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| last.clone());
        if !(package_stems(extension).contains(&stem.as_str()) && !parts.is_empty()) {
            parts.push(stem);
        }
    }
    if parts.is_empty() {
        "<root>".to_string()
    } else {
        parts.join(".")
    }
}

fn is_package(path: &Path) -> bool {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| package_stems(extension).contains(&s))
        .unwrap_or(false)
}

fn module_symbol(path: &Path, module_name: &str, text_len: usize) -> LocalSymbol {
    LocalSymbol {
        kind: SymbolKind::Module,
        name: module_name
            .rsplit('.')
            .next()
            .unwrap_or(module_name)
            .to_string(),
        qualified_name: module_name.to_string(),
        range: ByteRange::new(0, text_len),
        line: 1,
        parent: None,
        signature: path.display().to_string(),
        visibility: None,
    }
}

/// 1-based line number of `offset`, computed from a sorted list of line starts.
fn line_of(line_starts: &[usize], offset: usize) -> usize {
    line_starts.partition_point(|&start| start <= offset).max(1)
}

fn truncate(signature: &str, max_chars: usize) -> String {
    match signature.char_indices().nth(max_chars) {
        Some((cut, _)) => signature[..cut].to_string(),
        None => signature.to_string(),
    }
}

/// Build unit-local symbols from a syntax tree and its facts.
///
/// A symbol's parent is the declaration that opened its innermost scope, so two
/// same-named declarations in one scope keep their own children and references.
/// Scopes opened by name only (a Rust `impl`) fall back to the first declared
/// scope with that path, resolved in a second pass so that an `impl` above its
/// `struct` still finds it.
pub fn extract(path: &Path, tree: &SyntaxTree, facts: SyntaxFacts, config: &EngineConfig) -> ExtractedUnit {
    let source = tree.source();
    let mut unit = ExtractedUnit::module_only(path, tree.language, source.len());
    unit.error_spans = tree.error_spans.clone();

    if let Some(first) = tree.error_spans.first() {
        let count = tree.error_spans.len();
        unit.diagnostics.push(
            Diagnostic::new(
                DiagnosticKind::ParseError,
                path,
                format!(
                    "{} syntax error{}; extracted what could be recovered",
                    count,
                    if count == 1 { "" } else { "s" }
                ),
            )
            .with_range(*first),
        );
    }

    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(source.match_indices('\n').map(|(i, _)| i + 1))
        .collect();

    // Pass 1: one symbol per named declaration; remember each scope path's first owner.
    let mut enclosing: Vec<(Vec<String>, Option<usize>)> = vec![(Vec::new(), None)];
    let mut owners: HashMap<Vec<String>, usize> = HashMap::new();
    owners.insert(Vec::new(), 0);
    // Declaration index -> local symbol index; `None` for skipped declarations.
    let mut symbol_of: Vec<Option<usize>> = Vec::with_capacity(facts.declarations.len());

    for decl in facts.declarations {
        let Some(name) = decl.name else {
            symbol_of.push(None);
            unit.diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::ExtractionWarning,
                    path,
                    format!(
                        "skipped {} declaration without a name",
                        decl.kind.as_str()
                    ),
                )
                .with_range(decl.range),
            );
            continue;
        };

        let mut qualified = unit.module_name.clone();
        for segment in decl.scope_path.iter().chain(std::iter::once(&name)) {
            qualified.push('.');
            qualified.push_str(segment);
        }

        let mut own_path = decl.scope_path.clone();
        own_path.push(name.clone());
        let index = unit.symbols.len();
        symbol_of.push(Some(index));
        if decl.kind.is_scope() {
            owners.entry(own_path.clone()).or_insert(index);
        }

        unit.symbols.push(LocalSymbol {
            kind: decl.kind,
            name,
            qualified_name: qualified,
            range: decl.range,
            line: line_of(&line_starts, decl.range.start),
            parent: None,
            signature: truncate(&decl.signature, config.signature_max_len),
            visibility: decl.visibility,
        });
        enclosing.push((decl.scope_path, decl.owner));
    }

    let source_of = |scope: &[String], owner: Option<usize>, exclude: usize| {
        owner
            .and_then(|decl| symbol_of.get(decl).copied().flatten())
            .unwrap_or_else(|| owner_of(&owners, scope, exclude))
    };

    // Pass 2: parent = declaring scope, else owner of the longest scope-path prefix.
    for (index, (scope, owner)) in enclosing.iter().enumerate().skip(1) {
        unit.symbols[index].parent = Some(source_of(scope.as_slice(), *owner, index));
    }

    for site in facts.references {
        if site.kind == ReferenceKind::Reference && !config.emit_references {
            continue;
        }
        let source = source_of(site.scope_path.as_slice(), site.owner, usize::MAX);
        unit.references.push(LocalReference {
            kind: site.kind,
            text: site.text,
            range: site.range,
            source,
        });
    }

    unit.imports = facts.imports;
    unit
}

/// Owner of the longest prefix of `scope` that names a declared scope, never `exclude`.
fn owner_of(owners: &HashMap<Vec<String>, usize>, scope: &[String], exclude: usize) -> usize {
    (0..=scope.len())
        .rev()
        .filter_map(|len| owners.get(&scope[..len]))
        .copied()
        .find(|&owner| owner != exclude)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{analyze, parse};

    fn run(path: &str, language: LanguageKind, src: &str) -> ExtractedUnit {
        let tree = parse(src, language).unwrap();
        let facts = analyze(&tree);
        extract(Path::new(path), &tree, facts, &EngineConfig::default())
    }

    fn find<'u>(unit: &'u ExtractedUnit, qn: &str) -> (usize, &'u LocalSymbol) {
        unit.symbols
            .iter()
            .enumerate()
            .find(|(_, s)| s.qualified_name == qn)
            .unwrap_or_else(|| panic!("no symbol {qn}"))
    }

    #[test]
    fn test_module_names() {
        assert_eq!(module_name(Path::new("pkg/util/parse.py")), "pkg.util.parse");
        assert_eq!(module_name(Path::new("pkg/__init__.py")), "pkg");
        assert_eq!(module_name(Path::new("src/graph/mod.rs")), "src.graph");
        assert_eq!(module_name(Path::new("./web/index.ts")), "web");
        assert_eq!(module_name(Path::new("main.py")), "main");
        assert_eq!(module_name(Path::new("web/lib.js")), "web.lib");
        assert_eq!(module_name(Path::new("src/lib.rs")), "src");
        assert_eq!(module_name(Path::new("")), "<root>");
    }

    #[test]
    fn test_module_symbol_first_then_first_seen_order() {
        let unit = run(
            "a.py",
            LanguageKind::Python,
            "class Dog:\n    def bark(self):\n        pass\n\ndef walk():\n    pass\n",
        );
        let names: Vec<_> = unit.symbols.iter().map(|s| s.qualified_name.as_str()).collect();
        assert_eq!(names, vec!["a", "a.Dog", "a.Dog.bark", "a.walk"]);
        assert_eq!(unit.symbols[0].kind, SymbolKind::Module);
        assert_eq!(unit.symbols[2].kind, SymbolKind::Method);
        assert_eq!(unit.symbols[2].parent, Some(1));
        assert_eq!(unit.symbols[3].parent, Some(0));
        assert_eq!(unit.symbols[3].line, 5);
        assert_eq!(unit.top_level().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_impl_before_struct_still_parents_methods() {
        let unit = run(
            "src/shape.rs",
            LanguageKind::Rust,
            "impl Square { fn side(&self) -> u32 { 1 } }\nstruct Square;\n",
        );
        let (square, _) = find(&unit, "src.shape.Square");
        let (_, side) = find(&unit, "src.shape.Square.side");
        assert_eq!(side.parent, Some(square));
    }

    #[test]
    fn test_overloads_are_distinct_symbols() {
        let unit = run(
            "o.ts",
            LanguageKind::TypeScript,
            "function f(a: string): void;\nfunction f(a: number): void;\nfunction f(a: any) {}\n",
        );
        let count = unit.symbols.iter().filter(|s| s.qualified_name == "o.f").count();
        assert_eq!(count, 3);
    }

    fn all(unit: &ExtractedUnit, qn: &str) -> Vec<usize> {
        unit.symbols
            .iter()
            .enumerate()
            .filter(|(_, s)| s.qualified_name == qn)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_redefined_function_keeps_its_own_children() {
        let unit = run(
            "m.py",
            LanguageKind::Python,
            "def f():\n    def inner():\n        pass\n\ndef f():\n    def inner2():\n        pass\n    helper()\n",
        );
        let fs = all(&unit, "m.f");
        assert_eq!(fs, vec![1, 3]);
        let (_, inner) = find(&unit, "m.f.inner");
        let (_, inner2) = find(&unit, "m.f.inner2");
        assert_eq!(inner.parent, Some(1));
        assert_eq!(inner2.parent, Some(3));
        let call = unit.references.iter().find(|r| r.text == "helper").unwrap();
        assert_eq!(call.source, 3);
    }

    #[test]
    fn test_redefined_class_owns_its_bases() {
        let unit = run(
            "m.py",
            LanguageKind::Python,
            "class A:\n    pass\n\nclass A(Base):\n    pass\n",
        );
        assert_eq!(all(&unit, "m.A"), vec![1, 2]);
        let inherit = unit
            .references
            .iter()
            .find(|r| r.kind == ReferenceKind::Inherit)
            .unwrap();
        assert_eq!(inherit.text, "Base");
        assert_eq!(inherit.source, 2);
    }

    #[test]
    fn test_overload_implementation_owns_its_body() {
        let unit = run(
            "o.ts",
            LanguageKind::TypeScript,
            "function f(a: string): void;\nfunction f(a: any) { g(); }\n",
        );
        assert_eq!(all(&unit, "o.f"), vec![1, 2]);
        assert!(unit.symbols[2].signature.starts_with("function f(a: any)"));
        let call = unit.references.iter().find(|r| r.text == "g").unwrap();
        assert_eq!(call.source, 2);
    }

    #[test]
    fn test_duplicated_rust_fns_keep_nested_items() {
        let unit = run(
            "src/cfg.rs",
            LanguageKind::Rust,
            "#[cfg(unix)]\nfn open() { fn unix_only() {} }\n#[cfg(windows)]\nfn open() { fn win_only() {} win(); }\n",
        );
        let opens = all(&unit, "src.cfg.open");
        assert_eq!(opens.len(), 2);
        let (_, unix_only) = find(&unit, "src.cfg.open.unix_only");
        let (_, win_only) = find(&unit, "src.cfg.open.win_only");
        assert_eq!(unix_only.parent, Some(opens[0]));
        assert_eq!(win_only.parent, Some(opens[1]));
        let call = unit.references.iter().find(|r| r.text == "win").unwrap();
        assert_eq!(call.source, opens[1]);
    }

    #[test]
    fn test_repeated_assignment_keeps_each_binding() {
        let unit = run("v.py", LanguageKind::Python, "x = 1\nx = 2\n");
        let xs = all(&unit, "v.x");
        assert_eq!(xs, vec![1, 2]);
        assert_eq!(unit.symbols[2].line, 2);
    }

    #[test]
    fn test_unnamed_declaration_warns() {
        let unit = run(
            "c.js",
            LanguageKind::JavaScript,
            "class C {\n  [Symbol.iterator]() { return next(); }\n}\n",
        );
        assert!(unit
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::ExtractionWarning));
        let (class, _) = find(&unit, "c.C");
        let call = unit.references.iter().find(|r| r.text == "next").unwrap();
        assert_eq!(call.source, class, "calls in unnamed members belong to the enclosing scope");
    }

    #[test]
    fn test_syntax_errors_give_one_diagnostic() {
        let unit = run(
            "bad.py",
            LanguageKind::Python,
            "def ok():\n    pass\n\ndef broken(:\n\nclass (:\n",
        );
        let parse_errors = unit
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::ParseError)
            .count();
        assert_eq!(parse_errors, 1);
        assert!(!unit.error_spans.is_empty());
        find(&unit, "bad.ok");
    }

    #[test]
    fn test_reference_source_is_innermost_declaration() {
        let unit = run(
            "r.py",
            LanguageKind::Python,
            "def outer():\n    def inner():\n        target()\n    other()\n",
        );
        let (outer, _) = find(&unit, "r.outer");
        let (inner, _) = find(&unit, "r.outer.inner");
        let target = unit.references.iter().find(|r| r.text == "target").unwrap();
        let other = unit.references.iter().find(|r| r.text == "other").unwrap();
        assert_eq!(target.source, inner);
        assert_eq!(other.source, outer);
    }

    #[test]
    fn test_signature_truncated() {
        let tree = parse("def f(a, b, c):\n    pass\n", LanguageKind::Python).unwrap();
        let facts = analyze(&tree);
        let config = EngineConfig {
            signature_max_len: 5,
            ..EngineConfig::default()
        };
        let unit = extract(Path::new("s.py"), &tree, facts, &config);
        assert_eq!(unit.symbols[1].signature, "def f");
    }

    #[test]
    fn test_references_can_be_disabled() {
        let tree = parse("def f(x: Config):\n    pass\n", LanguageKind::Python).unwrap();
        let facts = analyze(&tree);
        let config = EngineConfig {
            emit_references: false,
            ..EngineConfig::default()
        };
        let unit = extract(Path::new("t.py"), &tree, facts, &config);
        assert!(unit.references.is_empty());
    }
}
