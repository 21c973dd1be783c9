use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;

use crate::graph::CodeGraph;
use crate::graph::edge::EdgeKind;
use crate::graph::node::SymbolId;

/// One module in dependency order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleEntry {
    pub id: SymbolId,
    pub module: String,
    pub file: PathBuf,
}

/// A set of modules that import each other, ordered by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportCycle {
    pub modules: Vec<ModuleEntry>,
}

/// Module dependency order plus every import cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyReport {
    /// Dependencies before dependents.
    pub order: Vec<ModuleEntry>,
    pub cycles: Vec<ImportCycle>,
}

fn entry(graph: &CodeGraph, id: SymbolId) -> Option<ModuleEntry> {
    let symbol = graph.symbol(id)?;
    let unit = graph.unit(symbol.unit?)?;
    Some(ModuleEntry {
        id,
        module: symbol.qualified_name.clone(),
        file: unit.path.clone(),
    })
}

/// Resolve the graph's precomputed module order into displayable entries.
pub fn dependency_report(graph: &CodeGraph) -> DependencyReport {
    let order = graph.module_order();
    DependencyReport {
        order: order
            .order
            .iter()
            .filter_map(|&id| entry(graph, id))
            .collect(),
        cycles: order
            .cycles
            .iter()
            .map(|cycle| ImportCycle {
                modules: cycle.iter().filter_map(|&id| entry(graph, id)).collect(),
            })
            .collect(),
    }
}

/// Unit modules imported by anything declared in `module`, ascending.
///
/// Imports of members count as imports of the member's module; External
/// placeholders and self-imports are skipped.
pub fn imports_of(graph: &CodeGraph, module: SymbolId) -> Vec<SymbolId> {
    let set: BTreeSet<SymbolId> = graph
        .edges()
        .filter(|e| e.kind == EdgeKind::Imports)
        .filter(|e| graph.module_of(e.source) == Some(module))
        .filter_map(|e| graph.module_of(e.target))
        .filter(|&m| m != module && Some(m) != graph.external_root())
        .collect();
    set.into_iter().collect()
}

/// Unit modules that import `module` or one of its members, ascending.
pub fn importers_of(graph: &CodeGraph, module: SymbolId) -> Vec<SymbolId> {
    let set: BTreeSet<SymbolId> = graph
        .edges()
        .filter(|e| e.kind == EdgeKind::Imports)
        .filter(|e| graph.module_of(e.target) == Some(module))
        .filter_map(|e| graph.module_of(e.source))
        .filter(|&m| m != module)
        .collect();
    set.into_iter().collect()
}
