use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write};

use crate::export::model::{ExportResult, Granularity};
use crate::graph::CodeGraph;
use crate::graph::edge::EdgeKind;
use crate::graph::node::{SymbolId, SymbolKind};

/// Escape a label for use inside a double-quoted DOT string.
pub fn escape_label(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Get the DOT fillcolor for a symbol kind.
fn symbol_fillcolor(kind: SymbolKind) -> &'static str {
    match kind {
        SymbolKind::Function | SymbolKind::Method => "#AED6F1",
        SymbolKind::Class => "#A9DFBF",
        SymbolKind::Constant | SymbolKind::Variable => "#FAD7A0",
        SymbolKind::Module => "#D7BDE2",
        SymbolKind::External => "#EAECEE",
    }
}

/// DOT edge style attributes for a given EdgeKind.
fn edge_style(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Calls => "style=solid color=blue",
        EdgeKind::Inherits => "style=solid arrowhead=onormal",
        EdgeKind::References => "style=dotted",
        EdgeKind::Imports => "style=dashed",
        EdgeKind::Contains => "style=invis",
    }
}

/// Render the visible part of the graph as DOT.
pub fn render_dot(
    graph: &CodeGraph,
    granularity: Granularity,
    visible: &BTreeSet<SymbolId>,
) -> Result<ExportResult, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "digraph code_graph {{")?;
    writeln!(out, "    rankdir=TB;")?;
    writeln!(out, "    node [style=filled fontname=monospace];")?;

    let (node_count, edge_count) = match granularity {
        Granularity::Symbol => render_symbols(graph, visible, &mut out)?,
        Granularity::Module => render_modules(graph, visible, &mut out)?,
    };

    writeln!(out, "}}")?;
    Ok(ExportResult {
        content: out,
        node_count,
        edge_count,
    })
}

/// One node per symbol; semantic edges only.
fn render_symbols(
    graph: &CodeGraph,
    visible: &BTreeSet<SymbolId>,
    out: &mut String,
) -> Result<(usize, usize), fmt::Error> {
    let mut nodes = 0;
    for &id in visible {
        let Some(s) = graph.symbol(id) else {
            continue;
        };
        if s.kind == SymbolKind::Module {
            continue;
        }
        nodes += 1;
        writeln!(
            out,
            "    n{} [label=\"{} ({})\" fillcolor=\"{}\"];",
            id.0,
            escape_label(&s.qualified_name),
            s.kind.as_str(),
            symbol_fillcolor(s.kind)
        )?;
    }

    let mut edges = 0;
    for e in graph.edges() {
        if !matches!(e.kind, EdgeKind::Calls | EdgeKind::Inherits | EdgeKind::References) {
            continue;
        }
        if e.source == e.target || !visible.contains(&e.source) || !visible.contains(&e.target) {
            continue;
        }
        edges += 1;
        writeln!(out, "    n{} -> n{} [{}];", e.source.0, e.target.0, edge_style(e.kind))?;
    }
    Ok((nodes, edges))
}

/// One node per unit; Imports edges aggregated per module pair.
fn render_modules(
    graph: &CodeGraph,
    visible: &BTreeSet<SymbolId>,
    out: &mut String,
) -> Result<(usize, usize), fmt::Error> {
    let mut nodes = 0;
    for unit in graph.units() {
        if !visible.contains(&unit.module) {
            continue;
        }
        nodes += 1;
        writeln!(
            out,
            "    n{} [label=\"{}\" fillcolor=\"{}\"];",
            unit.module.0,
            escape_label(&unit.path.display().to_string()),
            symbol_fillcolor(SymbolKind::Module)
        )?;
    }

    let mut counts: BTreeMap<(SymbolId, SymbolId), usize> = BTreeMap::new();
    for e in graph.edges().filter(|e| e.kind == EdgeKind::Imports) {
        let (Some(from), Some(to)) = (graph.module_of(e.source), graph.module_of(e.target)) else {
            continue;
        };
        if from == to || !visible.contains(&from) || !visible.contains(&to) {
            continue;
        }
        if graph.symbol(to).is_none_or(|s| s.unit.is_none()) {
            continue;
        }
        *counts.entry((from, to)).or_insert(0) += 1;
    }
    for ((from, to), count) in &counts {
        let label = if *count == 1 {
            "1 import".to_string()
        } else {
            format!("{} imports", count)
        };
        writeln!(out, "    n{} -> n{} [label=\"{}\" {}];", from.0, to.0, label, edge_style(EdgeKind::Imports))?;
    }
    Ok((nodes, counts.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::pipeline::analyze;
    use crate::source::{CancellationToken, SourceInput};

    fn graph() -> CodeGraph {
        analyze(
            vec![
                SourceInput::new("a.py", "import b\nfrom b import g\n\ndef f():\n    g()\n"),
                SourceInput::new("b.py", "def g():\n    pass\n"),
            ],
            &EngineConfig::default(),
            &CancellationToken::new(),
        )
        .unwrap()
        .graph
    }

    #[test]
    fn test_escape_label() {
        assert_eq!(escape_label(r#"say "hi"\"#), r#"say \"hi\"\\"#);
    }

    #[test]
    fn test_module_dot_aggregates_imports() {
        let g = graph();
        let visible: BTreeSet<SymbolId> = g.symbols().map(|s| s.id).collect();
        let result = render_dot(&g, Granularity::Module, &visible).unwrap();
        assert_eq!(result.node_count, 2);
        assert_eq!(result.edge_count, 1);
        assert!(result.content.contains("label=\"2 imports\""));
        assert!(result.content.starts_with("digraph code_graph {"));
    }

    #[test]
    fn test_symbol_dot_has_call_edge() {
        let g = graph();
        let visible: BTreeSet<SymbolId> = g.symbols().map(|s| s.id).collect();
        let result = render_dot(&g, Granularity::Symbol, &visible).unwrap();
        let f = g.lookup("a.f")[0];
        let gid = g.lookup("b.g")[0];
        assert!(result.content.contains(&format!("n{} -> n{} [style=solid color=blue];", f.0, gid.0)));
        assert_eq!(result.edge_count, 1);
    }
}
