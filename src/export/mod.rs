pub mod dot;
pub mod model;

use std::collections::BTreeSet;

use anyhow::Context;

use crate::graph::CodeGraph;
use crate::graph::node::{Symbol, SymbolId};
use crate::pipeline::Analysis;

use model::{
    EdgeRecord, ExportFormat, ExportParams, ExportResult, GraphDocument, SymbolRecord, UnitRecord,
};

/// Export an analysis as a JSON document or a DOT graph.
///
/// Steps:
/// 1. Pick the visible symbols (root filter, External placeholders).
/// 2. Dispatch to the renderer for the chosen format.
pub fn export_graph(analysis: &Analysis, params: &ExportParams) -> anyhow::Result<ExportResult> {
    let graph = &analysis.graph;
    let visible = visible_symbols(graph, params);

    match params.format {
        ExportFormat::Json => {
            let document = build_document(analysis, &visible);
            let node_count = document.symbols.len();
            let edge_count = document.edges.len();
            let content =
                serde_json::to_string_pretty(&document).context("failed to serialise graph")?;
            Ok(ExportResult {
                content,
                node_count,
                edge_count,
            })
        }
        ExportFormat::Dot => {
            let rendered = dot::render_dot(graph, params.granularity, &visible)
                .context("failed to render DOT")?;
            Ok(rendered)
        }
    }
}

fn in_root(graph: &CodeGraph, symbol: &Symbol, params: &ExportParams) -> bool {
    let Some(prefix) = &params.root_filter else {
        return true;
    };
    symbol
        .unit
        .and_then(|u| graph.unit(u))
        .is_some_and(|u| u.path.starts_with(prefix))
}

/// Declared symbols inside the root filter, plus the External placeholders (and
/// their synthetic root) that those symbols point at.
pub fn visible_symbols(graph: &CodeGraph, params: &ExportParams) -> BTreeSet<SymbolId> {
    let mut visible: BTreeSet<SymbolId> = graph
        .symbols()
        .filter(|s| s.unit.is_some() && in_root(graph, s, params))
        .map(|s| s.id)
        .collect();
    if params.skip_external {
        return visible;
    }

    let externals: BTreeSet<SymbolId> = graph
        .edges()
        .filter(|e| visible.contains(&e.source))
        .filter(|e| graph.symbol(e.target).is_some_and(Symbol::is_external))
        .map(|e| e.target)
        .collect();
    if !externals.is_empty()
        && let Some(root) = graph.external_root()
    {
        visible.insert(root);
    }
    visible.extend(externals);
    visible
}

/// Build the JSON document for the visible part of the graph.
pub fn build_document(analysis: &Analysis, visible: &BTreeSet<SymbolId>) -> GraphDocument {
    let graph = &analysis.graph;

    let units: Vec<UnitRecord> = graph
        .units()
        .iter()
        .filter(|u| visible.contains(&u.module))
        .map(|u| UnitRecord {
            id: u.id.0,
            path: u.path.clone(),
            language: u.language,
            module: u.module,
            error_count: u.error_spans.len(),
        })
        .collect();

    let symbols = visible
        .iter()
        .filter_map(|&id| graph.symbol(id))
        .map(|s| SymbolRecord {
            id: s.id,
            kind: s.kind,
            name: s.name.clone(),
            qualified_name: s.qualified_name.clone(),
            file: s.unit.and_then(|u| graph.unit(u)).map(|u| u.path.clone()),
            line: s.line,
            start: s.range.start,
            end: s.range.end,
            parent: s.parent,
            signature: s.signature.clone(),
            visibility: s.visibility,
        })
        .collect();

    let edges = graph
        .edges()
        .filter(|e| visible.contains(&e.source) && visible.contains(&e.target))
        .map(|e| EdgeRecord {
            kind: e.kind,
            source: e.source,
            target: e.target,
            confidence: e.confidence,
        })
        .collect();

    let order = graph.module_order();
    let paths: BTreeSet<_> = units.iter().map(|u| u.path.clone()).collect();
    GraphDocument {
        units,
        symbols,
        edges,
        module_order: order
            .order
            .iter()
            .copied()
            .filter(|id| visible.contains(id))
            .collect(),
        cycles: order
            .cycles
            .iter()
            .filter(|c| c.iter().all(|id| visible.contains(id)))
            .cloned()
            .collect(),
        diagnostics: analysis
            .diagnostics
            .iter()
            .filter(|d| paths.contains(&d.path))
            .cloned()
            .collect(),
    }
}
