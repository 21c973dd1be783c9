pub mod fallback;
pub mod javascript;
pub mod languages;
pub mod python;
pub mod rust;

use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Parser, Tree};

use crate::graph::node::{ByteRange, SymbolKind, Visibility};
use crate::language::LanguageKind;

use languages::tree_sitter_language;

// One parser per grammar per worker thread, created on first use.
thread_local! {
    static PARSER_PY: RefCell<Parser> = RefCell::new(new_parser(LanguageKind::Python));
    static PARSER_JS: RefCell<Parser> = RefCell::new(new_parser(LanguageKind::JavaScript));
    static PARSER_TS: RefCell<Parser> = RefCell::new(new_parser(LanguageKind::TypeScript));
    static PARSER_TSX: RefCell<Parser> = RefCell::new(new_parser(LanguageKind::Tsx));
    static PARSER_RS: RefCell<Parser> = RefCell::new(new_parser(LanguageKind::Rust));
}

fn new_parser(language: LanguageKind) -> Parser {
    let mut p = Parser::new();
    if let Some(lang) = tree_sitter_language(language) {
        p.set_language(&lang)
            .expect("bundled grammar is ABI-compatible with tree-sitter");
    }
    p
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// A parse failure severe enough that no tree could be produced at all.
///
/// Ordinary syntax errors do NOT produce this: they are reported as
/// [`SyntaxTree::error_spans`] on a best-effort tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{language:?}: {message}")]
pub struct ParseError {
    pub language: LanguageKind,
    pub message: String,
}

/// A parsed file. Owns its source text; dropped once extraction is done.
pub struct SyntaxTree {
    pub language: LanguageKind,
    source: String,
    /// `None` for the heuristic (PlainText) adapter.
    tree: Option<Tree>,
    /// Byte ranges of ERROR / MISSING nodes, outermost only.
    pub error_spans: Vec<ByteRange>,
}

impl SyntaxTree {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn has_errors(&self) -> bool {
        !self.error_spans.is_empty()
    }

    /// Root node of the concrete syntax tree, if a grammar was used.
    pub fn root(&self) -> Option<Node<'_>> {
        self.tree.as_ref().map(|t| t.root_node())
    }
}

impl std::fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("language", &self.language)
            .field("bytes", &self.source.len())
            .field("error_spans", &self.error_spans)
            .finish()
    }
}

/// A declaration site found in a syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: SymbolKind,
    /// `None` when the name cannot be determined (anonymous or malformed).
    pub name: Option<String>,
    pub range: ByteRange,
    /// Names of the enclosing declarations, outermost first.
    pub scope_path: Vec<String>,
    /// Index in [`SyntaxFacts::declarations`] of the declaration that opened the
    /// innermost scope. `None` at file level and inside scopes opened by name only
    /// (a Rust `impl` block), where the owner is found through `scope_path`.
    pub owner: Option<usize>,
    pub signature: String,
    pub visibility: Option<Visibility>,
}

/// The kind of a reference site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    /// `f()`, `obj.m()`, `new C()`, `Type::new()`.
    Call,
    /// Base-class list, `extends` / `implements`, `impl Trait for T`, supertraits.
    Inherit,
    /// Type annotations and plain attribute access.
    Reference,
}

/// A use of a name that the resolver must bind to a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSite {
    pub kind: ReferenceKind,
    /// Name as written, with `.` separating segments (`self.run`, `os.path.join`, `Foo.new`).
    pub text: String,
    pub range: ByteRange,
    /// Scope path of the innermost enclosing declaration (the edge source).
    pub scope_path: Vec<String>,
    /// Declaration index of the edge source; same rules as [`Declaration::owner`].
    pub owner: Option<usize>,
}

/// An import statement, one site per imported name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSite {
    /// Module specifier exactly as written (`..pkg`, `./util`, `crate::graph`).
    pub specifier: String,
    /// The imported member for `from m import x` / `import { x }` / `use m::x`.
    pub member: Option<String>,
    /// Local binding name when it differs from the default.
    pub alias: Option<String>,
    /// `from m import *`, `use m::*`.
    pub wildcard: bool,
    pub range: ByteRange,
}

/// Everything the extractor and resolver need from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxFacts {
    pub declarations: Vec<Declaration>,
    pub references: Vec<ReferenceSite>,
    pub imports: Vec<ImportSite>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse `text` with the grammar for `language`.
///
/// Syntax errors never fail the call: tree-sitter recovers and the damaged
/// regions are listed in `error_spans`. An error is returned only when the input
/// is binary or the parser yields no tree.
pub fn parse(text: impl Into<String>, language: LanguageKind) -> Result<SyntaxTree, ParseError> {
    let source = text.into();
    if source.contains('\0') {
        return Err(ParseError {
            language,
            message: "input contains NUL bytes; not a text file".into(),
        });
    }

    let tree = match language {
        LanguageKind::Python => PARSER_PY.with(|p| p.borrow_mut().parse(&source, None)),
        LanguageKind::JavaScript => PARSER_JS.with(|p| p.borrow_mut().parse(&source, None)),
        LanguageKind::TypeScript => PARSER_TS.with(|p| p.borrow_mut().parse(&source, None)),
        LanguageKind::Tsx => PARSER_TSX.with(|p| p.borrow_mut().parse(&source, None)),
        LanguageKind::Rust => PARSER_RS.with(|p| p.borrow_mut().parse(&source, None)),
        LanguageKind::PlainText => {
            return Ok(SyntaxTree {
                language,
                source,
                tree: None,
                error_spans: Vec::new(),
            });
        }
    };

    let tree = tree.ok_or_else(|| ParseError {
        language,
        message: "tree-sitter returned no tree".into(),
    })?;

    let mut error_spans = Vec::new();
    if tree.root_node().has_error() {
        collect_error_spans(tree.root_node(), &mut error_spans);
    }

    Ok(SyntaxTree {
        language,
        source,
        tree: Some(tree),
        error_spans,
    })
}

/// Run the language's collector once and return declarations, reference sites
/// and imports together.
pub fn analyze(tree: &SyntaxTree) -> SyntaxFacts {
    let src = tree.source.as_bytes();
    match (tree.language, tree.root()) {
        (LanguageKind::Python, Some(root)) => python::collect(root, src),
        (LanguageKind::JavaScript | LanguageKind::TypeScript | LanguageKind::Tsx, Some(root)) => {
            javascript::collect(root, src)
        }
        (LanguageKind::Rust, Some(root)) => rust::collect(root, src),
        _ => fallback::collect(&tree.source),
    }
}

/// Declarations in first-seen (depth-first, source) order.
pub fn declarations(tree: &SyntaxTree) -> Vec<Declaration> {
    analyze(tree).declarations
}

/// Reference sites in source order.
pub fn reference_sites(tree: &SyntaxTree) -> Vec<ReferenceSite> {
    analyze(tree).references
}

/// Import sites in source order.
pub fn import_sites(tree: &SyntaxTree) -> Vec<ImportSite> {
    analyze(tree).imports
}

// ---------------------------------------------------------------------------
// Helper utilities shared by the language collectors
// ---------------------------------------------------------------------------

fn collect_error_spans(node: Node, out: &mut Vec<ByteRange>) {
    if node.is_error() || node.is_missing() {
        out.push(range_of(node));
        return;
    }
    if !node.has_error() {
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_spans(child, out);
    }
}

/// Extract the UTF-8 text of a node from the original source bytes.
pub(crate) fn node_text<'a>(node: Node<'a>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

pub(crate) fn range_of(node: Node) -> ByteRange {
    ByteRange::new(node.start_byte(), node.end_byte())
}

/// Declaration header: text from the node start up to its body, whitespace collapsed.
pub(crate) fn header_text(node: Node, body: Option<Node>, source: &[u8]) -> String {
    let end = body.map(|b| b.start_byte()).unwrap_or(node.end_byte());
    let raw = source
        .get(node.start_byte()..end.max(node.start_byte()))
        .map(String::from_utf8_lossy)
        .unwrap_or_default();
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(|c: char| c == '{' || c == ':' || c.is_whitespace())
        .to_string()
}

/// What kind of scope a collector is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeKind {
    Module,
    Class,
    Function,
}

/// Shared state for a depth-first walk over one file.
pub(crate) struct Collector<'a> {
    pub src: &'a [u8],
    scope: Vec<String>,
    scope_kinds: Vec<ScopeKind>,
    scope_owners: Vec<Option<usize>>,
    pub facts: SyntaxFacts,
}

impl<'a> Collector<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        Self {
            src,
            scope: Vec::new(),
            scope_kinds: Vec::new(),
            scope_owners: Vec::new(),
            facts: SyntaxFacts::default(),
        }
    }

    pub fn text(&self, node: Node<'a>) -> &'a str {
        node_text(node, self.src)
    }

    /// True directly inside a class / trait / impl / interface body.
    pub fn in_class(&self) -> bool {
        self.scope_kinds.last() == Some(&ScopeKind::Class)
    }

    /// True at file level or directly inside an inline module.
    pub fn at_module_level(&self) -> bool {
        matches!(self.scope_kinds.last(), None | Some(ScopeKind::Module))
    }

    pub fn inside_function(&self) -> bool {
        self.scope_kinds.contains(&ScopeKind::Function)
    }

    /// Owner of the innermost scope.
    fn current_owner(&self) -> Option<usize> {
        self.scope_owners.last().copied().flatten()
    }

    /// Record a declaration and return its index, to be passed to
    /// [`push_scope`](Self::push_scope) when the declaration opens a scope.
    pub fn declare(
        &mut self,
        kind: SymbolKind,
        name: Option<&str>,
        node: Node,
        signature: String,
        visibility: Option<Visibility>,
    ) -> usize {
        let name = name.map(str::trim).filter(|n| !n.is_empty()).map(String::from);
        let owner = self.current_owner();
        self.facts.declarations.push(Declaration {
            kind,
            name,
            range: range_of(node),
            scope_path: self.scope.clone(),
            owner,
            signature,
            visibility,
        });
        self.facts.declarations.len() - 1
    }

    pub fn reference(&mut self, kind: ReferenceKind, text: impl Into<String>, node: Node) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        let owner = self.current_owner();
        self.facts.references.push(ReferenceSite {
            kind,
            text,
            range: range_of(node),
            scope_path: self.scope.clone(),
            owner,
        });
    }

    /// Record a reference whose source is a declaration nested one level below the
    /// current scope (a class's own heritage clause). `decl` is that declaration's
    /// index, or `None` when the owner is known by name only.
    pub fn reference_from(
        &mut self,
        owner: &str,
        decl: Option<usize>,
        kind: ReferenceKind,
        text: impl Into<String>,
        node: Node,
    ) {
        self.scope.push(owner.to_string());
        self.scope_owners.push(decl);
        self.reference(kind, text, node);
        self.scope_owners.pop();
        self.scope.pop();
    }

    pub fn import(&mut self, site: ImportSite) {
        self.facts.imports.push(site);
    }

    /// Enter the scope opened by declaration `name`. `decl` is the index returned
    /// by [`declare`](Self::declare); `None` for scopes without a declaration of
    /// their own, such as a Rust `impl` block.
    pub fn push_scope(&mut self, name: &str, kind: ScopeKind, decl: Option<usize>) {
        self.scope.push(name.to_string());
        self.scope_kinds.push(kind);
        self.scope_owners.push(decl);
    }

    pub fn pop_scope(&mut self) {
        self.scope.pop();
        self.scope_kinds.pop();
        self.scope_owners.pop();
    }

    pub fn finish(self) -> SyntaxFacts {
        self.facts
    }
}
