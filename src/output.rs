use serde::Serialize;

use ccg_engine::{Analysis, Confidence, DiagnosticKind, EdgeKind, Severity, SymbolKind};

/// Aggregate statistics produced by an indexing run.
#[derive(Debug, Serialize)]
pub struct IndexStats {
    pub file_count: usize,
    pub symbol_count: usize,
    pub classes: usize,
    pub functions: usize,
    pub methods: usize,
    pub variables: usize,
    pub constants: usize,
    pub externals: usize,
    pub calls: usize,
    pub imports: usize,
    pub inherits: usize,
    pub references: usize,
    pub resolved_edges: usize,
    pub ambiguous_edges: usize,
    pub unresolved_edges: usize,
    pub import_cycles: usize,
    pub warnings: usize,
    pub errors: usize,
    /// Files that could not be read.
    pub skipped: usize,
    /// True when the graph came from `.ccg/graph.bin`.
    pub from_cache: bool,
    /// Wall-clock time for the run in seconds.
    pub elapsed_secs: f64,
}

impl IndexStats {
    pub fn collect(analysis: &Analysis, from_cache: bool, elapsed_secs: f64) -> Self {
        let graph = &analysis.graph;
        let kinds = graph.symbols_by_kind();
        let kind = |k: SymbolKind| kinds.get(&k).copied().unwrap_or(0);
        let edges = |k: EdgeKind| graph.edges().filter(|e| e.kind == k).count();
        let confidence = |c: Confidence| {
            graph
                .edges()
                .filter(|e| e.kind != EdgeKind::Contains && e.confidence == c)
                .count()
        };
        let severity = |s: Severity| analysis.diagnostics.iter().filter(|d| d.severity == s).count();

        Self {
            file_count: graph.units().len(),
            symbol_count: graph.symbol_count(),
            classes: kind(SymbolKind::Class),
            functions: kind(SymbolKind::Function),
            methods: kind(SymbolKind::Method),
            variables: kind(SymbolKind::Variable),
            constants: kind(SymbolKind::Constant),
            externals: kind(SymbolKind::External),
            calls: edges(EdgeKind::Calls),
            imports: edges(EdgeKind::Imports),
            inherits: edges(EdgeKind::Inherits),
            references: edges(EdgeKind::References),
            resolved_edges: confidence(Confidence::Resolved),
            ambiguous_edges: confidence(Confidence::Ambiguous),
            unresolved_edges: confidence(Confidence::Unresolved),
            import_cycles: graph.module_order().cycles.len(),
            warnings: severity(Severity::Warning),
            errors: severity(Severity::Error),
            skipped: analysis
                .diagnostics
                .iter()
                .filter(|d| d.kind == DiagnosticKind::FatalIo)
                .count(),
            from_cache,
            elapsed_secs,
        }
    }
}

/// Print a summary of the indexing run.
///
/// - `json = true`: emit a pretty-printed JSON object to stdout.
/// - `json = false`: emit a cargo-style human-readable summary to stdout.
///
/// If `stats.skipped > 0`, a warning line is written to **stderr** so that
/// the stdout stream remains clean for downstream JSON consumers.
pub fn print_summary(stats: &IndexStats, json: bool) {
    if stats.skipped > 0 {
        eprintln!("warning: {} files could not be read", stats.skipped);
    }

    if json {
        match serde_json::to_string_pretty(stats) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("error serialising stats: {}", e),
        }
        return;
    }

    let source = if stats.from_cache { " (cached)" } else { "" };
    println!(
        "Indexed {} files in {:.2}s{}",
        stats.file_count, stats.elapsed_secs, source
    );
    println!(
        "  {} symbols: {} classes, {} functions, {} methods, {} variables, {} constants, {} external",
        stats.symbol_count,
        stats.classes,
        stats.functions,
        stats.methods,
        stats.variables,
        stats.constants,
        stats.externals,
    );
    println!(
        "  {} calls, {} imports, {} inherits, {} references",
        stats.calls, stats.imports, stats.inherits, stats.references,
    );
    println!(
        "  Resolved {} edges ({} ambiguous, {} unresolved)",
        stats.resolved_edges, stats.ambiguous_edges, stats.unresolved_edges,
    );
    if stats.import_cycles > 0 {
        println!("  {} import cycles", stats.import_cycles);
    }
    if stats.warnings + stats.errors > 0 {
        println!("  {} warnings, {} errors", stats.warnings, stats.errors);
    }
}
