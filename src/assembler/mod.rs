pub mod order;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::extract::ExtractedUnit;
use crate::graph::CodeGraph;
use crate::graph::edge::{Confidence, Edge, EdgeKind};
use crate::graph::node::{ByteRange, Symbol, SymbolId, SymbolKind, UnitId, UnitInfo};
use crate::resolver::{Target, UnitResolution};

/// Name of the synthetic module that parents every External placeholder.
pub const EXTERNAL_ROOT: &str = "<external>";

/// Merge numbered units and their resolutions into a committed graph.
///
/// `units` must already be sorted by path and `bases[i]` must be the first id of
/// unit `i`. Runs single-threaded; the result depends only on its inputs.
pub fn assemble(
    units: &[ExtractedUnit],
    bases: &[u32],
    resolutions: &[UnitResolution],
) -> CodeGraph {
    let mut graph = CodeGraph::new();

    for (i, (unit, &base)) in units.iter().zip(bases).enumerate() {
        let global = |local: usize| SymbolId(base + local as u32);
        let unit_id = UnitId(i as u32);
        for (local, symbol) in unit.symbols.iter().enumerate() {
            graph.push_symbol(Symbol {
                id: global(local),
                kind: symbol.kind,
                name: symbol.name.clone(),
                qualified_name: symbol.qualified_name.clone(),
                unit: Some(unit_id),
                range: symbol.range,
                line: symbol.line,
                parent: symbol.parent.map(global),
                signature: symbol.signature.clone(),
                visibility: symbol.visibility,
            });
        }
        graph.push_unit(UnitInfo {
            id: unit_id,
            path: unit.path.clone(),
            language: unit.language,
            module: global(0),
            top_level: unit.top_level().map(global).collect(),
            error_spans: unit.error_spans.clone(),
        });
    }

    // External placeholders, interned in (unit order, site order).
    let mut next_id = graph.symbol_count() as u32;
    let mut externals: HashMap<&str, SymbolId> = HashMap::new();
    let mut external_root = None;
    for resolution in resolutions {
        for edge in &resolution.edges {
            let Target::External(text) = &edge.target else {
                continue;
            };
            if externals.contains_key(text.as_str()) {
                continue;
            }
            let root = *external_root.get_or_insert_with(|| {
                let id = SymbolId(next_id);
                next_id += 1;
                graph.push_symbol(synthetic(id, SymbolKind::Module, EXTERNAL_ROOT, EXTERNAL_ROOT, None));
                id
            });
            let id = SymbolId(next_id);
            next_id += 1;
            graph.push_symbol(synthetic(
                id,
                SymbolKind::External,
                text,
                &format!("{EXTERNAL_ROOT}.{text}"),
                Some(root),
            ));
            externals.insert(text.as_str(), id);
        }
    }
    if let Some(root) = external_root {
        graph.set_external_root(root);
    }

    // Contains: one edge per parent link, which covers both nesting and module
    // membership. The set guards against a pair being produced twice.
    let mut contains: BTreeSet<(SymbolId, SymbolId)> = BTreeSet::new();
    let parent_links: Vec<(SymbolId, SymbolId)> = graph
        .symbols()
        .filter_map(|s| s.parent.map(|p| (p, s.id)))
        .collect();
    for unit in graph.units() {
        for &top in &unit.top_level {
            contains.insert((unit.module, top));
        }
    }
    contains.extend(parent_links);
    for (source, target) in contains {
        graph.push_edge(Edge {
            kind: EdgeKind::Contains,
            source,
            target,
            confidence: Confidence::Resolved,
        });
    }

    // Resolver edges, deduplicated on (kind, source, target); the first one wins.
    let mut seen: HashSet<(EdgeKind, SymbolId, SymbolId)> = HashSet::new();
    let mut reverse_calls: BTreeMap<SymbolId, BTreeSet<SymbolId>> = BTreeMap::new();
    let mut duplicates = 0usize;
    for resolution in resolutions {
        for pending in &resolution.edges {
            let target = match &pending.target {
                Target::Symbol(id) => *id,
                Target::External(text) => match externals.get(text.as_str()) {
                    Some(id) => *id,
                    None => continue,
                },
            };
            if !seen.insert((pending.kind, pending.source, target)) {
                duplicates += 1;
                continue;
            }
            if pending.kind == EdgeKind::Calls {
                reverse_calls
                    .entry(target)
                    .or_default()
                    .insert(pending.source);
            }
            graph.push_edge(Edge {
                kind: pending.kind,
                source: pending.source,
                target,
                confidence: pending.confidence,
            });
        }
    }

    graph.set_reverse_calls(
        reverse_calls
            .into_iter()
            .map(|(callee, callers)| (callee, callers.into_iter().collect()))
            .collect(),
    );
    let module_order = order::module_order(&graph);
    graph.set_module_order(module_order);

    debug!(
        symbols = graph.symbol_count(),
        edges = graph.edge_count(),
        externals = externals.len(),
        duplicates,
        "graph assembled"
    );
    graph
}

fn synthetic(
    id: SymbolId,
    kind: SymbolKind,
    name: &str,
    qualified_name: &str,
    parent: Option<SymbolId>,
) -> Symbol {
    Symbol {
        id,
        kind,
        name: name.to_string(),
        qualified_name: qualified_name.to_string(),
        unit: None,
        range: ByteRange::default(),
        line: 0,
        parent,
        signature: String::new(),
        visibility: None,
    }
}
