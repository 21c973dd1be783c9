use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::language::LanguageKind;

/// Handle into the symbol table of a committed graph.
///
/// Ids are dense: a graph with `n` symbols uses exactly `0..n`, assigned by sorting
/// source units by path and then taking declarations in first-seen order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle into the source-unit table. Units are numbered in path order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl UnitId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The kind of symbol stored in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    /// A source file (or a nested module declared inside one).
    Module,
    /// A class, struct, enum, trait or interface.
    Class,
    /// A free function, or a const bound to a function expression.
    Function,
    /// A function declared directly inside a class body / impl block.
    Method,
    /// A module- or class-level binding.
    Variable,
    /// A module-level binding the language (or naming convention) marks constant.
    Constant,
    /// Placeholder for a reference target outside the analysed set.
    External,
}

impl SymbolKind {
    /// Lowercase name used in output and filtering.
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Module => "module",
            SymbolKind::Class => "class",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
            SymbolKind::External => "external",
        }
    }

    /// Parse a CLI filter string. Case-insensitive; accepts a few common aliases.
    pub fn from_str_loose(s: &str) -> Option<SymbolKind> {
        match s.to_lowercase().as_str() {
            "module" | "mod" => Some(SymbolKind::Module),
            "class" | "struct" | "trait" | "interface" | "enum" => Some(SymbolKind::Class),
            "function" | "fn" | "func" => Some(SymbolKind::Function),
            "method" => Some(SymbolKind::Method),
            "variable" | "var" => Some(SymbolKind::Variable),
            "constant" | "const" => Some(SymbolKind::Constant),
            "external" => Some(SymbolKind::External),
            _ => None,
        }
    }

    /// Symbols of these kinds open a scope for name resolution.
    pub fn is_scope(&self) -> bool {
        matches!(
            self,
            SymbolKind::Module | SymbolKind::Class | SymbolKind::Function | SymbolKind::Method
        )
    }
}

/// Visibility, when the source language expresses one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
}

/// Half-open byte range `[start, end)` into a unit's source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when `other` lies entirely within `self`.
    pub fn contains(&self, other: &ByteRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// A named entity in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub kind: SymbolKind,
    /// Simple name as written in source (display text for External placeholders).
    pub name: String,
    /// Dot-separated path from the module root, e.g. `pkg.util.Parser.parse`.
    pub qualified_name: String,
    /// Declaring unit; `None` for synthetic symbols.
    pub unit: Option<UnitId>,
    pub range: ByteRange,
    /// 1-based line of `range.start`, 0 for synthetic symbols.
    pub line: usize,
    /// Enclosing scope; `None` only for root modules.
    pub parent: Option<SymbolId>,
    /// Raw declaration header, for display only.
    pub signature: String,
    pub visibility: Option<Visibility>,
}

impl Symbol {
    pub fn is_external(&self) -> bool {
        self.kind == SymbolKind::External
    }
}

/// Per-file record kept in the committed graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitInfo {
    pub id: UnitId,
    pub path: PathBuf,
    pub language: LanguageKind,
    /// The unit's synthetic Module symbol.
    pub module: SymbolId,
    /// Symbols whose enclosing scope is the unit module, in first-seen order.
    pub top_level: Vec<SymbolId>,
    /// Syntax error spans reported by the grammar adapter.
    pub error_spans: Vec<ByteRange>,
}
