use std::path::PathBuf;

use anyhow::Result;
use regex::RegexBuilder;
use serde::Serialize;

use crate::graph::CodeGraph;
use crate::graph::node::{SymbolId, SymbolKind};

/// A single matching symbol returned by `find_symbols`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FindResult {
    pub id: SymbolId,
    pub name: String,
    pub qualified_name: String,
    pub kind: SymbolKind,
    /// Declaring unit's path; `None` for External placeholders.
    pub file_path: Option<PathBuf>,
    pub line: usize,
}

/// Find symbols whose simple or qualified name matches the regex `pattern`.
///
/// - `case_insensitive`: enable case-insensitive regex matching
/// - `kinds`: if non-empty, only include symbols of these kinds
///
/// Returns results sorted by id, which is path order then declaration order.
pub fn find_symbols(
    graph: &CodeGraph,
    pattern: &str,
    case_insensitive: bool,
    kinds: &[SymbolKind],
) -> Result<Vec<FindResult>> {
    let re = RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| anyhow::anyhow!("invalid symbol pattern '{}': {}", pattern, e))?;

    let results = graph
        .symbols()
        .filter(|s| kinds.is_empty() || kinds.contains(&s.kind))
        .filter(|s| re.is_match(&s.name) || re.is_match(&s.qualified_name))
        .map(|s| FindResult {
            id: s.id,
            name: s.name.clone(),
            qualified_name: s.qualified_name.clone(),
            kind: s.kind,
            file_path: s
                .unit
                .and_then(|u| graph.unit(u))
                .map(|u| u.path.clone()),
            line: s.line,
        })
        .collect();

    Ok(results)
}
