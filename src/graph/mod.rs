pub mod edge;
pub mod node;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use edge::{Direction, Edge, EdgeKind};
use node::{Symbol, SymbolId, SymbolKind, UnitId, UnitInfo};

/// Module-level import ordering computed at commit time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleOrder {
    /// Module symbols, dependencies before dependents. Members of an import cycle
    /// appear together, ordered by id, at the position of the cycle.
    pub order: Vec<SymbolId>,
    /// Each import cycle as a set of module ids, sorted ascending; cycles sorted by
    /// their first member.
    pub cycles: Vec<Vec<SymbolId>>,
}

/// The committed code context graph.
///
/// Symbols live in a petgraph `DiGraph` whose node index *is* the [`SymbolId`];
/// nodes are never removed, so handles stay valid for the graph's lifetime.
/// Once returned by the pipeline a `CodeGraph` is never mutated, which makes it
/// safe to share between reader threads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeGraph {
    graph: DiGraph<Symbol, Edge, u32>,
    units: Vec<UnitInfo>,
    /// Qualified name -> every symbol bearing it (overload sets share a name).
    qualified_index: BTreeMap<String, Vec<SymbolId>>,
    /// Callee -> callers, derived from `Calls` edges.
    reverse_calls: BTreeMap<SymbolId, Vec<SymbolId>>,
    module_order: ModuleOrder,
    /// Synthetic parent of all External placeholders, if any exist.
    external_root: Option<SymbolId>,
}

impl CodeGraph {
    pub(crate) fn new() -> Self {
        Self {
            graph: DiGraph::default(),
            units: Vec::new(),
            qualified_index: BTreeMap::new(),
            reverse_calls: BTreeMap::new(),
            module_order: ModuleOrder::default(),
            external_root: None,
        }
    }

    /// Append a symbol. The caller assigns ids densely; the node index must match.
    pub(crate) fn push_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = symbol.id;
        self.qualified_index
            .entry(symbol.qualified_name.clone())
            .or_default()
            .push(id);
        let idx = self.graph.add_node(symbol);
        debug_assert_eq!(idx.index(), id.index(), "symbol ids must be dense");
        id
    }

    pub(crate) fn push_edge(&mut self, edge: Edge) {
        self.graph.add_edge(
            NodeIndex::new(edge.source.index()),
            NodeIndex::new(edge.target.index()),
            edge,
        );
    }

    pub(crate) fn push_unit(&mut self, unit: UnitInfo) {
        debug_assert_eq!(unit.id.index(), self.units.len(), "unit ids must be dense");
        self.units.push(unit);
    }

    pub(crate) fn set_external_root(&mut self, id: SymbolId) {
        self.external_root = Some(id);
    }

    pub(crate) fn set_reverse_calls(&mut self, index: BTreeMap<SymbolId, Vec<SymbolId>>) {
        self.reverse_calls = index;
    }

    pub(crate) fn set_module_order(&mut self, order: ModuleOrder) {
        self.module_order = order;
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.graph.node_weight(NodeIndex::new(id.index()))
    }

    /// All symbols in id order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.graph.node_weights()
    }

    /// All edges in commit order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edge_weights()
    }

    pub fn symbol_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn units(&self) -> &[UnitInfo] {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> Option<&UnitInfo> {
        self.units.get(id.index())
    }

    pub fn unit_by_path(&self, path: &Path) -> Option<&UnitInfo> {
        self.units.iter().find(|u| u.path == path)
    }

    /// Every symbol with exactly this qualified name, ascending by id.
    pub fn lookup(&self, qualified_name: &str) -> &[SymbolId] {
        self.qualified_index
            .get(qualified_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterate `(qualified_name, ids)` in name order.
    pub fn qualified_names(&self) -> impl Iterator<Item = (&str, &[SymbolId])> {
        self.qualified_index
            .iter()
            .map(|(name, ids)| (name.as_str(), ids.as_slice()))
    }

    /// Edges of `kind` touching `id` in `direction`, sorted by (source, target).
    pub fn edges_of(&self, id: SymbolId, kind: EdgeKind, direction: Direction) -> Vec<&Edge> {
        if self.symbol(id).is_none() {
            return Vec::new();
        }
        let mut edges: Vec<&Edge> = self
            .graph
            .edges_directed(NodeIndex::new(id.index()), direction.into())
            .map(|e| e.weight())
            .filter(|e| e.kind == kind)
            .collect();
        edges.sort_by_key(|e| (e.source, e.target));
        edges
    }

    /// Symbols one `kind` edge away from `id` in `direction`, ascending and unique.
    pub fn neighbors(&self, id: SymbolId, kind: EdgeKind, direction: Direction) -> Vec<SymbolId> {
        let set: BTreeSet<SymbolId> = self
            .edges_of(id, kind, direction)
            .into_iter()
            .map(|e| match direction {
                Direction::Outgoing => e.target,
                Direction::Incoming => e.source,
            })
            .collect();
        set.into_iter().collect()
    }

    /// Direct children via `Contains`.
    pub fn children(&self, id: SymbolId) -> Vec<SymbolId> {
        self.neighbors(id, EdgeKind::Contains, Direction::Outgoing)
    }

    /// Callers recorded in the reverse-call index.
    pub fn callers_of(&self, id: SymbolId) -> &[SymbolId] {
        self.reverse_calls
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn reverse_calls(&self) -> &BTreeMap<SymbolId, Vec<SymbolId>> {
        &self.reverse_calls
    }

    pub fn module_order(&self) -> &ModuleOrder {
        &self.module_order
    }

    pub fn external_root(&self) -> Option<SymbolId> {
        self.external_root
    }

    /// The root module enclosing `id` (itself, when `id` is a root module).
    pub fn module_of(&self, id: SymbolId) -> Option<SymbolId> {
        let mut current = self.symbol(id)?;
        // Contains is a forest, so the chain is at most symbol_count long.
        for _ in 0..self.symbol_count() {
            match current.parent {
                Some(parent) => current = self.symbol(parent)?,
                None => return Some(current.id),
            }
        }
        None
    }

    /// Ids of the scope chain from `id`'s parent up to its root module.
    pub fn ancestors(&self, id: SymbolId) -> Vec<SymbolId> {
        let mut chain = Vec::new();
        let mut current = self.symbol(id).and_then(|s| s.parent);
        while let Some(parent) = current {
            if chain.len() >= self.symbol_count() {
                break;
            }
            chain.push(parent);
            current = self.symbol(parent).and_then(|s| s.parent);
        }
        chain
    }

    /// Count of symbols broken down by kind.
    pub fn symbols_by_kind(&self) -> BTreeMap<SymbolKind, usize> {
        let mut map = BTreeMap::new();
        for sym in self.symbols() {
            *map.entry(sym.kind).or_insert(0) += 1;
        }
        map
    }
}

impl PartialEq for CodeGraph {
    fn eq(&self, other: &Self) -> bool {
        self.units == other.units
            && self.symbols().eq(other.symbols())
            && self.edges().eq(other.edges())
            && self.qualified_index == other.qualified_index
            && self.reverse_calls == other.reverse_calls
            && self.module_order == other.module_order
            && self.external_root == other.external_root
    }
}

impl Eq for CodeGraph {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::edge::Confidence;
    use crate::graph::node::ByteRange;

    fn sym(id: u32, kind: SymbolKind, qn: &str, parent: Option<u32>) -> Symbol {
        Symbol {
            id: SymbolId(id),
            kind,
            name: qn.rsplit('.').next().unwrap_or(qn).to_string(),
            qualified_name: qn.to_string(),
            unit: Some(UnitId(0)),
            range: ByteRange::new(0, 1),
            line: 1,
            parent: parent.map(SymbolId),
            signature: String::new(),
            visibility: None,
        }
    }

    fn contains(source: u32, target: u32) -> Edge {
        Edge {
            kind: EdgeKind::Contains,
            source: SymbolId(source),
            target: SymbolId(target),
            confidence: Confidence::Resolved,
        }
    }

    fn sample() -> CodeGraph {
        let mut graph = CodeGraph::new();
        graph.push_symbol(sym(0, SymbolKind::Module, "a", None));
        graph.push_symbol(sym(1, SymbolKind::Class, "a.Dog", Some(0)));
        graph.push_symbol(sym(2, SymbolKind::Method, "a.Dog.bark", Some(1)));
        graph.push_symbol(sym(3, SymbolKind::Method, "a.Dog.bark", Some(1)));
        graph.push_edge(contains(0, 1));
        graph.push_edge(contains(1, 2));
        graph.push_edge(contains(1, 3));
        graph
    }

    #[test]
    fn test_lookup_keeps_overload_set() {
        let graph = sample();
        assert_eq!(graph.lookup("a.Dog.bark"), &[SymbolId(2), SymbolId(3)]);
        assert!(graph.lookup("a.Cat").is_empty());
    }

    #[test]
    fn test_children_sorted() {
        let graph = sample();
        assert_eq!(graph.children(SymbolId(1)), vec![SymbolId(2), SymbolId(3)]);
        assert_eq!(
            graph.neighbors(SymbolId(2), EdgeKind::Contains, Direction::Incoming),
            vec![SymbolId(1)]
        );
    }

    #[test]
    fn test_module_of_and_ancestors() {
        let graph = sample();
        assert_eq!(graph.module_of(SymbolId(3)), Some(SymbolId(0)));
        assert_eq!(graph.ancestors(SymbolId(3)), vec![SymbolId(1), SymbolId(0)]);
        assert!(graph.ancestors(SymbolId(0)).is_empty());
    }

    #[test]
    fn test_unknown_id_is_empty() {
        let graph = sample();
        assert!(graph.symbol(SymbolId(99)).is_none());
        assert!(graph.children(SymbolId(99)).is_empty());
    }

    #[test]
    fn test_symbols_by_kind() {
        let graph = sample();
        let breakdown = graph.symbols_by_kind();
        assert_eq!(breakdown.get(&SymbolKind::Method), Some(&2));
        assert_eq!(breakdown.get(&SymbolKind::Class), Some(&1));
    }
}
