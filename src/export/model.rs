use std::path::PathBuf;

use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::graph::edge::{Confidence, EdgeKind};
use crate::graph::node::{SymbolId, SymbolKind, Visibility};
use crate::language::LanguageKind;

/// Output format for graph export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    /// Complete graph document as JSON (default).
    #[default]
    Json,
    /// Graphviz DOT. Suitable for rendering.
    Dot,
}

/// Granularity level for DOT nodes. JSON export always carries every symbol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Granularity {
    /// One node per symbol; Calls, Inherits and References edges.
    Symbol,
    /// One node per source unit (default); aggregated Imports edges.
    #[default]
    Module,
}

/// Parameters controlling a graph export operation.
#[derive(Debug, Clone, Default)]
pub struct ExportParams {
    pub format: ExportFormat,
    pub granularity: Granularity,
    /// Restrict export to units whose paths start with this prefix.
    pub root_filter: Option<PathBuf>,
    /// Leave External placeholders out of the output.
    pub skip_external: bool,
}

/// Result of a graph export operation.
#[derive(Debug)]
pub struct ExportResult {
    pub content: String,
    pub node_count: usize,
    pub edge_count: usize,
}

#[derive(Debug, Serialize)]
pub struct UnitRecord {
    pub id: u32,
    pub path: PathBuf,
    pub language: LanguageKind,
    pub module: SymbolId,
    pub error_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SymbolRecord {
    pub id: SymbolId,
    pub kind: SymbolKind,
    pub name: String,
    pub qualified_name: String,
    pub file: Option<PathBuf>,
    pub line: usize,
    pub start: usize,
    pub end: usize,
    pub parent: Option<SymbolId>,
    pub signature: String,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Serialize)]
pub struct EdgeRecord {
    pub kind: EdgeKind,
    pub source: SymbolId,
    pub target: SymbolId,
    pub confidence: Confidence,
}

/// The JSON export document.
#[derive(Debug, Serialize)]
pub struct GraphDocument {
    pub units: Vec<UnitRecord>,
    pub symbols: Vec<SymbolRecord>,
    pub edges: Vec<EdgeRecord>,
    pub module_order: Vec<SymbolId>,
    pub cycles: Vec<Vec<SymbolId>>,
    pub diagnostics: Vec<Diagnostic>,
}
