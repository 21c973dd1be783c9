use std::collections::{BTreeSet, VecDeque};

use serde::Serialize;

use crate::graph::CodeGraph;
use crate::graph::edge::{Direction, EdgeKind};
use crate::graph::node::SymbolId;

/// Transitive inheritance around one class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Hierarchy {
    /// Base classes, traits and interfaces, nearest first.
    pub ancestors: Vec<SymbolId>,
    /// Subclasses and implementors, nearest first.
    pub descendants: Vec<SymbolId>,
}

/// Follow `Inherits` edges from `id` in `direction`, breadth first.
///
/// Terminates on inheritance cycles (`class A(B)`, `class B(A)`); each symbol is
/// reported once, at its first-reached depth, and `id` itself never appears.
/// Within a depth, symbols are ordered by id.
pub fn walk_inherits(graph: &CodeGraph, id: SymbolId, direction: Direction) -> Vec<SymbolId> {
    let mut visited: BTreeSet<SymbolId> = BTreeSet::from([id]);
    let mut frontier: VecDeque<SymbolId> = VecDeque::from([id]);
    let mut out = Vec::new();
    while let Some(current) = frontier.pop_front() {
        for next in graph.neighbors(current, EdgeKind::Inherits, direction) {
            if visited.insert(next) {
                out.push(next);
                frontier.push_back(next);
            }
        }
    }
    out
}

pub fn ancestors(graph: &CodeGraph, id: SymbolId) -> Vec<SymbolId> {
    walk_inherits(graph, id, Direction::Outgoing)
}

pub fn descendants(graph: &CodeGraph, id: SymbolId) -> Vec<SymbolId> {
    walk_inherits(graph, id, Direction::Incoming)
}

pub fn hierarchy(graph: &CodeGraph, id: SymbolId) -> Hierarchy {
    Hierarchy {
        ancestors: ancestors(graph, id),
        descendants: descendants(graph, id),
    }
}
