use std::collections::{BTreeSet, HashMap};

use petgraph::Directed;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{Graph, NodeIndex};

use crate::graph::edge::EdgeKind;
use crate::graph::node::SymbolId;
use crate::graph::{CodeGraph, ModuleOrder};

/// Order unit modules so that every module comes after the modules it imports.
///
/// Builds a module-only graph from `Imports` edges (an import of a member counts as
/// an import of the member's module; imports of External placeholders are ignored),
/// collapses strongly connected components, and emits components in dependency
/// order. Ties are broken by the smallest member id, so the result is stable for a
/// given graph. Each component with more than one module is reported as a cycle.
pub fn module_order(graph: &CodeGraph) -> ModuleOrder {
    let mut module_graph: Graph<SymbolId, (), Directed> = Graph::new();
    let mut node_of: HashMap<SymbolId, NodeIndex> = HashMap::new();

    let mut modules: Vec<SymbolId> = graph.units().iter().map(|u| u.module).collect();
    modules.sort();
    for &module in &modules {
        node_of.insert(module, module_graph.add_node(module));
    }

    let mut seen = BTreeSet::new();
    for edge in graph.edges().filter(|e| e.kind == EdgeKind::Imports) {
        let Some(from) = graph.module_of(edge.source) else {
            continue;
        };
        let Some(to) = graph.module_of(edge.target) else {
            continue;
        };
        if from == to || !seen.insert((from, to)) {
            continue;
        }
        if let (Some(&a), Some(&b)) = (node_of.get(&from), node_of.get(&to)) {
            module_graph.add_edge(a, b, ());
        }
    }

    let sccs = kosaraju_scc(&module_graph);

    let mut component_of: HashMap<NodeIndex, usize> = HashMap::new();
    let mut members: Vec<Vec<SymbolId>> = Vec::with_capacity(sccs.len());
    for (c, scc) in sccs.iter().enumerate() {
        let mut ids: Vec<SymbolId> = scc.iter().map(|&n| module_graph[n]).collect();
        ids.sort();
        for &n in scc {
            component_of.insert(n, c);
        }
        members.push(ids);
    }

    // pending[c] = distinct dependency components not yet emitted.
    let mut pending: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); members.len()];
    let mut dependents: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); members.len()];
    for edge in module_graph.edge_indices() {
        let Some((a, b)) = module_graph.edge_endpoints(edge) else {
            continue;
        };
        let (ca, cb) = (component_of[&a], component_of[&b]);
        if ca != cb {
            pending[ca].insert(cb);
            dependents[cb].insert(ca);
        }
    }

    let mut ready: BTreeSet<(SymbolId, usize)> = (0..members.len())
        .filter(|&c| pending[c].is_empty())
        .map(|c| (members[c][0], c))
        .collect();

    let mut order = Vec::with_capacity(modules.len());
    while let Some(next) = ready.pop_first() {
        let c = next.1;
        order.extend(members[c].iter().copied());
        for &dependent in &dependents[c] {
            pending[dependent].remove(&c);
            if pending[dependent].is_empty() {
                ready.insert((members[dependent][0], dependent));
            }
        }
    }

    let mut cycles: Vec<Vec<SymbolId>> = members.into_iter().filter(|m| m.len() > 1).collect();
    cycles.sort();

    ModuleOrder { order, cycles }
}
