use std::path::PathBuf;

use serde::Serialize;

use crate::graph::CodeGraph;
use crate::graph::edge::{Direction, EdgeKind};
use crate::graph::node::{SymbolKind, UnitId};
use crate::language::LanguageKind;

/// How many symbols a summary lists by name.
pub const TOP_SYMBOLS: usize = 10;

/// Condensed description of one source unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub file: PathBuf,
    pub language: LanguageKind,
    /// Declared symbols, excluding the unit's own module.
    pub num_symbols: usize,
    /// Distinct outgoing `Calls` edges from symbols declared in the unit.
    pub num_calls: usize,
    /// Qualified names of the first declared symbols, in id order.
    pub top_symbols: Vec<String>,
}

pub fn file_summary(graph: &CodeGraph, unit: UnitId) -> Option<FileSummary> {
    let info = graph.unit(unit)?;
    let declared: Vec<_> = graph
        .symbols()
        .filter(|s| s.unit == Some(unit) && s.id != info.module)
        .collect();

    let num_calls = graph
        .symbols()
        .filter(|s| s.unit == Some(unit) && s.kind != SymbolKind::External)
        .map(|s| graph.edges_of(s.id, EdgeKind::Calls, Direction::Outgoing).len())
        .sum();

    Some(FileSummary {
        file: info.path.clone(),
        language: info.language,
        num_symbols: declared.len(),
        num_calls,
        top_symbols: declared
            .iter()
            .take(TOP_SYMBOLS)
            .map(|s| s.qualified_name.clone())
            .collect(),
    })
}

/// Summaries for every unit, in path order.
pub fn all_summaries(graph: &CodeGraph) -> Vec<FileSummary> {
    graph
        .units()
        .iter()
        .filter_map(|u| file_summary(graph, u.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::pipeline::analyze;
    use crate::source::{CancellationToken, SourceInput};

    #[test]
    fn test_summary_counts() {
        let mut src = String::from("def main():\n    a()\n    a()\n    b()\n\n");
        for i in 0..12 {
            src.push_str(&format!("def f{i}():\n    pass\n\n"));
        }
        src.push_str("def a():\n    pass\n\ndef b():\n    pass\n");
        let analysis = analyze(
            vec![SourceInput::new("tool.py", src)],
            &EngineConfig::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        let summary = file_summary(&analysis.graph, UnitId(0)).unwrap();
        assert_eq!(summary.file, PathBuf::from("tool.py"));
        assert_eq!(summary.language, LanguageKind::Python);
        assert_eq!(summary.num_symbols, 15);
        // a() twice collapses to one edge
        assert_eq!(summary.num_calls, 2);
        assert_eq!(summary.top_symbols.len(), TOP_SYMBOLS);
        assert_eq!(summary.top_symbols[0], "tool.main");
        assert_eq!(summary.top_symbols[1], "tool.f0");
    }

    #[test]
    fn test_unknown_unit() {
        let analysis = analyze(Vec::new(), &EngineConfig::default(), &CancellationToken::new()).unwrap();
        assert!(file_summary(&analysis.graph, UnitId(3)).is_none());
        assert!(all_summaries(&analysis.graph).is_empty());
    }
}
