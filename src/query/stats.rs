use std::collections::BTreeMap;

use serde::Serialize;

use crate::graph::CodeGraph;
use crate::graph::edge::{Confidence, EdgeKind};
use crate::graph::node::SymbolKind;
use crate::language::LanguageKind;

/// Aggregated counts derived from a committed graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub unit_count: usize,
    pub symbol_count: usize,
    pub edge_count: usize,
    pub units_by_language: BTreeMap<LanguageKind, usize>,
    pub symbols_by_kind: BTreeMap<SymbolKind, usize>,
    pub edges_by_kind: BTreeMap<EdgeKind, usize>,
    /// Excludes `Contains`, which is always resolved.
    pub edges_by_confidence: BTreeMap<Confidence, usize>,
    pub import_cycles: usize,
    /// Units whose grammar reported syntax errors.
    pub units_with_errors: usize,
}

/// Compute graph statistics from a built `CodeGraph`.
pub fn graph_stats(graph: &CodeGraph) -> GraphStats {
    let mut units_by_language = BTreeMap::new();
    for unit in graph.units() {
        *units_by_language.entry(unit.language).or_insert(0) += 1;
    }

    let mut edges_by_kind = BTreeMap::new();
    let mut edges_by_confidence = BTreeMap::new();
    for edge in graph.edges() {
        *edges_by_kind.entry(edge.kind).or_insert(0) += 1;
        if edge.kind != EdgeKind::Contains {
            *edges_by_confidence.entry(edge.confidence).or_insert(0) += 1;
        }
    }

    GraphStats {
        unit_count: graph.units().len(),
        symbol_count: graph.symbol_count(),
        edge_count: graph.edge_count(),
        units_by_language,
        symbols_by_kind: graph.symbols_by_kind(),
        edges_by_kind,
        edges_by_confidence,
        import_cycles: graph.module_order().cycles.len(),
        units_with_errors: graph
            .units()
            .iter()
            .filter(|u| !u.error_spans.is_empty())
            .count(),
    }
}
