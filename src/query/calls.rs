use std::collections::{BTreeSet, VecDeque};

use crate::graph::CodeGraph;
use crate::graph::edge::{Direction, EdgeKind};
use crate::graph::node::SymbolId;

/// Direct callers of `id`, ascending, from the reverse-call index.
pub fn callers(graph: &CodeGraph, id: SymbolId) -> Vec<SymbolId> {
    graph.callers_of(id).to_vec()
}

/// Direct callees of `id`, ascending.
pub fn callees(graph: &CodeGraph, id: SymbolId) -> Vec<SymbolId> {
    graph.neighbors(id, EdgeKind::Calls, Direction::Outgoing)
}

/// Everything reachable over `Calls` edges from `id` in `direction`, with BFS depth.
///
/// Recursion and call cycles are handled by a visited set; `id` itself is not
/// reported. `max_depth` of `None` means unbounded. Results are sorted by depth,
/// then id.
pub fn call_closure(
    graph: &CodeGraph,
    id: SymbolId,
    direction: Direction,
    max_depth: Option<usize>,
) -> Vec<(SymbolId, usize)> {
    let mut visited: BTreeSet<SymbolId> = BTreeSet::from([id]);
    let mut queue: VecDeque<(SymbolId, usize)> = VecDeque::from([(id, 0)]);
    let mut out = Vec::new();

    while let Some((current, depth)) = queue.pop_front() {
        if max_depth.is_some_and(|max| depth >= max) {
            continue;
        }
        let next = match direction {
            Direction::Outgoing => callees(graph, current),
            Direction::Incoming => callers(graph, current),
        };
        for n in next {
            if visited.insert(n) {
                out.push((n, depth + 1));
                queue.push_back((n, depth + 1));
            }
        }
    }
    out.sort_by_key(|&(id, depth)| (depth, id));
    out
}
