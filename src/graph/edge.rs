use serde::{Deserialize, Serialize};

use super::node::SymbolId;

/// The kind of directed edge between two symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Caller -> callee.
    Calls,
    /// Subclass / implementor -> base class, trait or interface.
    Inherits,
    /// Importing module -> imported module or symbol.
    Imports,
    /// Referencing scope -> referenced symbol (type annotations, attribute access).
    References,
    /// Enclosing scope -> declared symbol. Forms a forest over the graph.
    Contains,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Calls => "calls",
            EdgeKind::Inherits => "inherits",
            EdgeKind::Imports => "imports",
            EdgeKind::References => "references",
            EdgeKind::Contains => "contains",
        }
    }
}

/// How confidently the target of an edge was identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Confidence {
    /// Exactly one candidate.
    Resolved,
    /// One of several equally plausible candidates; a sibling edge exists per candidate.
    Ambiguous,
    /// No candidate; the target is an External placeholder.
    Unresolved,
}

/// A directed, typed relationship between two symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub kind: EdgeKind,
    pub source: SymbolId,
    pub target: SymbolId,
    pub confidence: Confidence,
}

/// Direction for neighbour queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Edges leaving the symbol.
    Outgoing,
    /// Edges arriving at the symbol.
    Incoming,
}

impl From<Direction> for petgraph::Direction {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Outgoing => petgraph::Direction::Outgoing,
            Direction::Incoming => petgraph::Direction::Incoming,
        }
    }
}
