pub mod index;
pub mod modules;

pub use index::GlobalIndex;
pub use modules::normalize_specifier;

use std::collections::{BTreeSet, HashMap};

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::extract::ExtractedUnit;
use crate::graph::edge::{Confidence, EdgeKind};
use crate::graph::node::{SymbolId, SymbolKind};
use crate::language::LanguageKind;
use crate::parser::{ImportSite, ReferenceKind};

/// Receiver names that start resolution at the nearest enclosing class.
const RECEIVERS: &[&str] = &["self", "this", "cls", "Self"];

/// Statistics collected while resolving reference and import sites.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolveStats {
    /// Sites bound to exactly one symbol.
    pub resolved: usize,
    /// Sites bound to several equally plausible symbols.
    pub ambiguous: usize,
    /// Sites bound to nothing; their edges target External placeholders.
    pub unresolved: usize,
}

impl ResolveStats {
    pub fn merge(&mut self, other: ResolveStats) {
        self.resolved += other.resolved;
        self.ambiguous += other.ambiguous;
        self.unresolved += other.unresolved;
    }
}

/// Target of an edge produced by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Symbol(SymbolId),
    /// An External placeholder to be interned by the assembler, keyed by raw text.
    External(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdge {
    pub kind: EdgeKind,
    pub source: SymbolId,
    pub target: Target,
    pub confidence: Confidence,
}

/// Resolver output for one unit, in site order: imports first, then references.
#[derive(Debug, Default)]
pub struct UnitResolution {
    pub edges: Vec<PendingEdge>,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: ResolveStats,
}

/// Names an import statement introduces into a file.
#[derive(Debug, Default)]
struct Bindings {
    /// Local name -> qualified names it may stand for.
    names: HashMap<String, Vec<String>>,
    /// Modules whose members are all visible (`from m import *`, `use m::*`).
    wildcards: Vec<String>,
}

impl Bindings {
    fn bind(&mut self, local: &str, target: String) {
        let targets = self.names.entry(local.to_string()).or_default();
        if !targets.contains(&target) {
            targets.push(target);
        }
    }
}

/// What a lookup produced.
enum Outcome {
    Found(Vec<SymbolId>),
    /// A level matched the name but nothing it stands for is in the graph.
    Missing,
}

fn join(base: &str, rest: &str) -> String {
    if base.is_empty() {
        rest.to_string()
    } else if rest.is_empty() {
        base.to_string()
    } else {
        format!("{base}.{rest}")
    }
}

/// Resolves the sites of a single unit against the shared, read-only index.
struct UnitResolver<'a> {
    unit: &'a ExtractedUnit,
    base: u32,
    index: &'a GlobalIndex,
    bindings: Bindings,
}

/// Resolve every import and reference site of `unit`, whose symbols start at id `base`.
pub fn resolve_unit(unit: &ExtractedUnit, base: u32, index: &GlobalIndex) -> UnitResolution {
    let mut resolver = UnitResolver {
        unit,
        base,
        index,
        bindings: Bindings::default(),
    };
    let mut out = UnitResolution::default();

    for site in &unit.imports {
        resolver.import(site, &mut out);
    }
    for reference in &unit.references {
        let kind = match reference.kind {
            ReferenceKind::Call => EdgeKind::Calls,
            ReferenceKind::Inherit => EdgeKind::Inherits,
            ReferenceKind::Reference => EdgeKind::References,
        };
        let source = resolver.global(reference.source);
        let outcome = resolver.resolve(reference.source, &reference.text);
        resolver.emit(
            kind,
            source,
            outcome,
            &reference.text,
            reference.range,
            &mut out,
        );
    }
    out
}

impl<'a> UnitResolver<'a> {
    fn global(&self, local: usize) -> SymbolId {
        SymbolId(self.base + local as u32)
    }

    fn lookup(&self, qualified: &str) -> Vec<SymbolId> {
        self.index.by_qualified(qualified).to_vec()
    }

    /// Record the binding an import introduces and emit its `Imports` edge.
    fn import(&mut self, site: &ImportSite, out: &mut UnitResolution) {
        let module = normalize_specifier(self.unit, &site.specifier);
        let language = self.unit.language;

        let edge_target = if site.wildcard {
            self.bindings.wildcards.push(module.clone());
            module.clone()
        } else if let Some(member) = &site.member {
            let local = site.alias.as_deref().unwrap_or(member);
            let member_qn = join(&module, member);
            self.bindings.bind(local, member_qn.clone());
            if member == "default" {
                // `import Dog from './dog'` usually names the default export.
                self.bindings.bind(local, join(&module, local));
            }
            if self.index.by_qualified(&member_qn).is_empty() {
                module.clone()
            } else {
                member_qn
            }
        } else {
            match (&site.alias, language) {
                (Some(alias), _) => self.bindings.bind(alias, module.clone()),
                (None, LanguageKind::Python) => {
                    // `import a.b` binds `a`.
                    let head = module.split('.').next().unwrap_or(&module).to_string();
                    self.bindings.bind(&head, head.clone());
                }
                (None, LanguageKind::Rust) => {
                    let last = site.specifier.rsplit("::").next().unwrap_or("");
                    if !matches!(last, "" | "crate" | "self" | "super") {
                        self.bindings.bind(last, module.clone());
                    }
                }
                // Side-effect imports bind nothing.
                _ => {}
            }
            module.clone()
        };

        let source = self.global(0);
        let outcome = match self.lookup(&edge_target) {
            found if !found.is_empty() => Outcome::Found(found),
            _ => Outcome::Missing,
        };
        let text = if site.specifier.is_empty() {
            edge_target
        } else {
            site.specifier.clone()
        };
        self.emit(EdgeKind::Imports, source, outcome, &text, site.range, out);
    }

    /// Resolve `text` as seen from local symbol `source`.
    ///
    /// Levels, first match wins: receiver class, lexical scopes innermost first,
    /// imported names, then the global index.
    fn resolve(&self, source: usize, text: &str) -> Outcome {
        let segments: Vec<&str> = text.split('.').filter(|s| !s.is_empty()).collect();
        let Some((&head, rest)) = segments.split_first() else {
            return Outcome::Missing;
        };
        let rest = rest.join(".");

        if RECEIVERS.contains(&head) {
            return match self.receiver_scope(source) {
                Some(class_qn) => self.found_or_missing(self.lookup(&join(&class_qn, &rest))),
                None => Outcome::Missing,
            };
        }

        // Lexical scopes. Class bodies are only visible to the class itself.
        let mut current = Some(source);
        let mut first = true;
        while let Some(local) = current {
            let symbol = &self.unit.symbols[local];
            if first || symbol.kind != SymbolKind::Class {
                let found = self.lookup(&join(&symbol.qualified_name, head));
                if !found.is_empty() {
                    return self.descend(found, &rest);
                }
            }
            first = false;
            current = symbol.parent;
        }

        // Imported names.
        if let Some(targets) = self.bindings.names.get(head) {
            let found: BTreeSet<SymbolId> = targets
                .iter()
                .flat_map(|qn| self.index.by_qualified(qn).iter().copied())
                .collect();
            if found.is_empty() {
                return Outcome::Missing;
            }
            return self.descend(found.into_iter().collect(), &rest);
        }
        let found: BTreeSet<SymbolId> = self
            .bindings
            .wildcards
            .iter()
            .flat_map(|module| self.index.by_qualified(&join(module, head)).iter().copied())
            .collect();
        if !found.is_empty() {
            return self.descend(found.into_iter().collect(), &rest);
        }

        // Global index: the full dotted name, then the head as a module or top-level name.
        if !rest.is_empty() {
            let exact = self.lookup(text);
            if !exact.is_empty() {
                return Outcome::Found(exact);
            }
        }
        let found: BTreeSet<SymbolId> = self
            .index
            .by_qualified(head)
            .iter()
            .chain(self.index.by_name(head))
            .copied()
            .collect();
        if !found.is_empty() {
            return self.descend(found.into_iter().collect(), &rest);
        }
        Outcome::Missing
    }

    /// Follow the remaining dotted segments below each candidate.
    fn descend(&self, candidates: Vec<SymbolId>, rest: &str) -> Outcome {
        if rest.is_empty() {
            return Outcome::Found(candidates);
        }
        let found: BTreeSet<SymbolId> = candidates
            .iter()
            .filter_map(|&id| self.index.qualified_name(id))
            .flat_map(|qn| self.index.by_qualified(&join(qn, rest)).iter().copied())
            .collect();
        self.found_or_missing(found.into_iter().collect())
    }

    fn found_or_missing(&self, found: Vec<SymbolId>) -> Outcome {
        if found.is_empty() {
            Outcome::Missing
        } else {
            Outcome::Found(found)
        }
    }

    /// Qualified name of the class enclosing `source`: the nearest Class on the
    /// parent chain, or the owner path of the nearest Method (a Rust `impl` whose
    /// type is declared elsewhere).
    fn receiver_scope(&self, source: usize) -> Option<String> {
        let mut current = Some(source);
        while let Some(local) = current {
            let symbol = &self.unit.symbols[local];
            match symbol.kind {
                SymbolKind::Class => return Some(symbol.qualified_name.clone()),
                SymbolKind::Method => {
                    let owner = symbol
                        .qualified_name
                        .rsplit_once('.')
                        .map(|(owner, _)| owner.to_string())?;
                    return Some(owner);
                }
                _ => current = symbol.parent,
            }
        }
        None
    }

    fn emit(
        &self,
        kind: EdgeKind,
        source: SymbolId,
        outcome: Outcome,
        text: &str,
        range: crate::graph::node::ByteRange,
        out: &mut UnitResolution,
    ) {
        match outcome {
            Outcome::Found(targets) if targets.len() == 1 => {
                out.stats.resolved += 1;
                out.edges.push(PendingEdge {
                    kind,
                    source,
                    target: Target::Symbol(targets[0]),
                    confidence: Confidence::Resolved,
                });
            }
            Outcome::Found(targets) => {
                out.stats.ambiguous += 1;
                out.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::ResolutionAmbiguity,
                        &self.unit.path,
                        format!(
                            "`{}` ({}) matches {} candidates",
                            text,
                            kind.as_str(),
                            targets.len()
                        ),
                    )
                    .with_range(range),
                );
                for target in targets {
                    out.edges.push(PendingEdge {
                        kind,
                        source,
                        target: Target::Symbol(target),
                        confidence: Confidence::Ambiguous,
                    });
                }
            }
            Outcome::Missing => {
                out.stats.unresolved += 1;
                out.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::UnresolvedReference,
                        &self.unit.path,
                        format!("`{}` ({}) is not declared in the analysed set", text, kind.as_str()),
                    )
                    .with_range(range),
                );
                out.edges.push(PendingEdge {
                    kind,
                    source,
                    target: Target::External(text.to_string()),
                    confidence: Confidence::Unresolved,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::config::EngineConfig;
    use crate::extract::extract;
    use crate::parser::{analyze, parse};

    fn units(files: &[(&str, &str)]) -> (Vec<ExtractedUnit>, Vec<u32>, GlobalIndex) {
        let mut units: Vec<ExtractedUnit> = files
            .iter()
            .map(|(path, src)| {
                let language = crate::language::detect_language(
                    Path::new(path),
                    None,
                    src,
                    &Default::default(),
                );
                let tree = parse(*src, language).unwrap();
                let facts = analyze(&tree);
                extract(Path::new(path), &tree, facts, &EngineConfig::default())
            })
            .collect();
        units.sort_by(|a, b| a.path.cmp(&b.path));
        let mut bases = Vec::new();
        let mut next = 0u32;
        for unit in &units {
            bases.push(next);
            next += unit.symbols.len() as u32;
        }
        let index = GlobalIndex::build(&units, &bases);
        (units, bases, index)
    }

    fn qn(index: &GlobalIndex, target: &Target) -> String {
        match target {
            Target::Symbol(id) => index.qualified_name(*id).unwrap_or("?").to_string(),
            Target::External(text) => format!("<{text}>"),
        }
    }

    fn edges_of(files: &[(&str, &str)], unit_path: &str, kind: EdgeKind) -> Vec<(String, Confidence)> {
        let (units, bases, index) = units(files);
        let pos = units
            .iter()
            .position(|u| u.path == Path::new(unit_path))
            .unwrap();
        resolve_unit(&units[pos], bases[pos], &index)
            .edges
            .into_iter()
            .filter(|e| e.kind == kind)
            .map(|e| (qn(&index, &e.target), e.confidence))
            .collect()
    }

    #[test]
    fn test_cross_file_call_resolves_through_global_index() {
        let edges = edges_of(
            &[("a.py", "def f():\n    g()\n"), ("b.py", "def g():\n    pass\n")],
            "a.py",
            EdgeKind::Calls,
        );
        assert_eq!(edges, vec![("b.g".to_string(), Confidence::Resolved)]);
    }

    #[test]
    fn test_local_declaration_shadows_import_and_global() {
        let files = [
            ("a.py", "from b import g\n\ndef f():\n    def g():\n        pass\n    g()\n"),
            ("b.py", "def g():\n    pass\n"),
        ];
        let edges = edges_of(&files, "a.py", EdgeKind::Calls);
        assert_eq!(edges, vec![("a.f.g".to_string(), Confidence::Resolved)]);
    }

    #[test]
    fn test_import_beats_global() {
        let files = [
            ("a.py", "from c import g\n\ndef f():\n    g()\n"),
            ("b.py", "def g():\n    pass\n"),
            ("c.py", "def g():\n    pass\n"),
        ];
        let edges = edges_of(&files, "a.py", EdgeKind::Calls);
        assert_eq!(edges, vec![("c.g".to_string(), Confidence::Resolved)]);
    }

    #[test]
    fn test_global_name_collision_is_ambiguous() {
        let files = [
            ("a.py", "def f():\n    g()\n"),
            ("b.py", "def g():\n    pass\n"),
            ("c.py", "def g():\n    pass\n"),
        ];
        let edges = edges_of(&files, "a.py", EdgeKind::Calls);
        assert_eq!(
            edges,
            vec![
                ("b.g".to_string(), Confidence::Ambiguous),
                ("c.g".to_string(), Confidence::Ambiguous),
            ]
        );
    }

    #[test]
    fn test_unresolved_targets_external_text() {
        let edges = edges_of(&[("a.py", "def f():\n    os.path.join('x')\n")], "a.py", EdgeKind::Calls);
        assert_eq!(edges, vec![("<os.path.join>".to_string(), Confidence::Unresolved)]);
    }

    #[test]
    fn test_self_receiver_uses_enclosing_class() {
        let files = [(
            "d.py",
            "class Dog:\n    def bark(self):\n        self.wag()\n    def wag(self):\n        pass\n\ndef wag():\n    pass\n",
        )];
        let edges = edges_of(&files, "d.py", EdgeKind::Calls);
        assert_eq!(edges, vec![("d.Dog.wag".to_string(), Confidence::Resolved)]);
    }

    #[test]
    fn test_methods_do_not_see_class_body_names() {
        let files = [(
            "d.py",
            "class Dog:\n    def bark(self):\n        wag()\n    def wag(self):\n        pass\n\ndef wag():\n    pass\n",
        )];
        let edges = edges_of(&files, "d.py", EdgeKind::Calls);
        assert_eq!(edges, vec![("d.wag".to_string(), Confidence::Resolved)]);
    }

    #[test]
    fn test_inheritance_and_imports_edges() {
        let files = [
            ("animals/base.py", "class Animal:\n    pass\n"),
            ("animals/dog.py", "from .base import Animal\n\nclass Dog(Animal):\n    pass\n"),
        ];
        let inherits = edges_of(&files, "animals/dog.py", EdgeKind::Inherits);
        assert_eq!(inherits, vec![("animals.base.Animal".to_string(), Confidence::Resolved)]);
        let imports = edges_of(&files, "animals/dog.py", EdgeKind::Imports);
        assert_eq!(imports, vec![("animals.base.Animal".to_string(), Confidence::Resolved)]);
    }

    #[test]
    fn test_namespace_import_descends() {
        let files = [
            ("app.ts", "import * as util from './util';\nexport function main() { util.parse(); }\n"),
            ("util.ts", "export function parse() {}\n"),
        ];
        let calls = edges_of(&files, "app.ts", EdgeKind::Calls);
        assert_eq!(calls, vec![("util.parse".to_string(), Confidence::Resolved)]);
    }

    #[test]
    fn test_rust_use_and_associated_call() {
        let files = [
            ("src/main.rs", "use crate::shape::Square;\nfn main() { Square::new(); }\n"),
            ("src/shape.rs", "pub struct Square;\nimpl Square { pub fn new() -> Self { Square } }\n"),
        ];
        let calls = edges_of(&files, "src/main.rs", EdgeKind::Calls);
        assert_eq!(calls, vec![("src.shape.Square.new".to_string(), Confidence::Resolved)]);
    }

    #[test]
    fn test_unknown_import_binding_stops_lookup() {
        let files = [
            ("a.py", "from requests import get\n\ndef f():\n    get()\n"),
            ("b.py", "def get():\n    pass\n"),
        ];
        let calls = edges_of(&files, "a.py", EdgeKind::Calls);
        assert_eq!(calls, vec![("<get>".to_string(), Confidence::Unresolved)]);
        let imports = edges_of(&files, "a.py", EdgeKind::Imports);
        assert_eq!(imports, vec![("<requests>".to_string(), Confidence::Unresolved)]);
    }
}
