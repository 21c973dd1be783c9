use std::io::IsTerminal;
use std::path::Path;

use crate::graph::CodeGraph;
use crate::graph::node::SymbolId;
use crate::query::deps::DependencyReport;
use crate::query::find::FindResult;
use crate::query::stats::GraphStats;
use crate::query::summary::FileSummary;

/// Output format for query results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One line per result (default).
    #[default]
    Compact,
    /// Columnar table, bold headers when stdout is a terminal.
    Table,
    /// Pretty-printed JSON.
    Json,
}

fn bold(s: &str) -> String {
    if std::io::stdout().is_terminal() {
        format!("\x1b[1m{s}\x1b[0m")
    } else {
        s.to_string()
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("error serialising results: {}", e),
    }
}

fn display_path(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "<external>".to_string())
}

/// Format and print find results to stdout according to the selected output format.
pub fn format_find_results(results: &[FindResult], format: OutputFormat) {
    match format {
        OutputFormat::Compact => {
            for r in results {
                println!(
                    "def {} {}:{} {}",
                    r.qualified_name,
                    display_path(r.file_path.as_deref()),
                    r.line,
                    r.kind.as_str()
                );
            }
            println!("{} definitions found", results.len());
        }

        OutputFormat::Table => {
            let name_w = results
                .iter()
                .map(|r| r.qualified_name.len())
                .max()
                .unwrap_or(6)
                .max(6);
            let file_w = results
                .iter()
                .map(|r| display_path(r.file_path.as_deref()).len())
                .max()
                .unwrap_or(4)
                .max(4);

            println!(
                "{}",
                bold(&format!(
                    "{:<name_w$}  {:<file_w$}  {:>4}  {}",
                    "SYMBOL", "FILE", "LINE", "KIND"
                ))
            );
            println!("{}", "-".repeat(name_w + file_w + 14));
            for r in results {
                println!(
                    "{:<name_w$}  {:<file_w$}  {:>4}  {}",
                    r.qualified_name,
                    display_path(r.file_path.as_deref()),
                    r.line,
                    r.kind.as_str(),
                );
            }
        }

        OutputFormat::Json => print_json(results),
    }
}

/// Format and print graph statistics.
pub fn format_stats(stats: &GraphStats, format: OutputFormat) {
    match format {
        OutputFormat::Compact => {
            println!("units {}", stats.unit_count);
            println!("symbols {}", stats.symbol_count);
            println!("edges {}", stats.edge_count);
            let kinds: Vec<String> = stats
                .symbols_by_kind
                .iter()
                .map(|(k, n)| format!("{} {}", k.as_str(), n))
                .collect();
            println!("{}", kinds.join(" "));
            let edges: Vec<String> = stats
                .edges_by_kind
                .iter()
                .map(|(k, n)| format!("{} {}", k.as_str(), n))
                .collect();
            println!("{}", edges.join(" "));
            println!(
                "cycles {} units-with-errors {}",
                stats.import_cycles, stats.units_with_errors
            );
        }

        OutputFormat::Table => {
            println!("{}", bold("=== Graph Overview ==="));
            println!("Units:    {}", stats.unit_count);
            println!("Symbols:  {}", stats.symbol_count);
            println!("Edges:    {}", stats.edge_count);
            println!();
            println!("{}", bold("--- Languages ---"));
            for (lang, n) in &stats.units_by_language {
                println!("  {:<12}{}", lang.display_name(), n);
            }
            println!();
            println!("{}", bold("--- Symbols ---"));
            for (kind, n) in &stats.symbols_by_kind {
                println!("  {:<12}{}", kind.as_str(), n);
            }
            println!();
            println!("{}", bold("--- Edges ---"));
            for (kind, n) in &stats.edges_by_kind {
                println!("  {:<12}{}", kind.as_str(), n);
            }
            for (confidence, n) in &stats.edges_by_confidence {
                println!("  {:<12}{}", format!("{:?}", confidence).to_lowercase(), n);
            }
            println!();
            println!("Import cycles:      {}", stats.import_cycles);
            println!("Units with errors:  {}", stats.units_with_errors);
        }

        OutputFormat::Json => print_json(stats),
    }
}

/// Format and print module dependency order and cycles.
pub fn format_deps(report: &DependencyReport, format: OutputFormat) {
    match format {
        OutputFormat::Compact => {
            for (i, entry) in report.order.iter().enumerate() {
                println!("{} {} {}", i + 1, entry.module, entry.file.display());
            }
            for cycle in &report.cycles {
                let names: Vec<&str> = cycle.modules.iter().map(|m| m.module.as_str()).collect();
                println!("cycle {}", names.join(" <-> "));
            }
            println!("{} modules, {} cycles", report.order.len(), report.cycles.len());
        }

        OutputFormat::Table => {
            println!("{}", bold("=== Module Order (dependencies first) ==="));
            for (i, entry) in report.order.iter().enumerate() {
                println!("{:>4}  {:<40}  {}", i + 1, entry.module, entry.file.display());
            }
            for (i, cycle) in report.cycles.iter().enumerate() {
                println!();
                println!("{}", bold(&format!("=== Cycle {} ===", i + 1)));
                for m in &cycle.modules {
                    println!("  {}", m.file.display());
                }
            }
        }

        OutputFormat::Json => print_json(report),
    }
}

/// Format and print per-file summaries.
pub fn format_summaries(summaries: &[FileSummary], format: OutputFormat) {
    match format {
        OutputFormat::Compact => {
            for s in summaries {
                println!(
                    "file {} {} symbols {} calls {}",
                    s.file.display(),
                    s.language.display_name(),
                    s.num_symbols,
                    s.num_calls
                );
                for name in &s.top_symbols {
                    println!("  {}", name);
                }
            }
        }

        OutputFormat::Table => {
            for s in summaries {
                println!("{}", bold(&s.file.display().to_string()));
                println!("  Language: {}", s.language.display_name());
                println!("  Symbols:  {}", s.num_symbols);
                println!("  Calls:    {}", s.num_calls);
                if !s.top_symbols.is_empty() {
                    println!("  Top:      {}", s.top_symbols.join(", "));
                }
                println!();
            }
        }

        OutputFormat::Json => print_json(summaries),
    }
}

/// Format a list of `(symbol, depth)` pairs, e.g. a caller closure or an
/// inheritance chain, under a heading naming the subject symbol.
pub fn format_symbol_list(
    graph: &CodeGraph,
    heading: &str,
    items: &[(SymbolId, usize)],
    format: OutputFormat,
) {
    let rows: Vec<serde_json::Value> = items
        .iter()
        .filter_map(|&(id, depth)| {
            let symbol = graph.symbol(id)?;
            let file = symbol
                .unit
                .and_then(|u| graph.unit(u))
                .map(|u| u.path.as_path());
            Some(serde_json::json!({
                "id": id.0,
                "qualified_name": symbol.qualified_name,
                "kind": symbol.kind.as_str(),
                "file": display_path(file),
                "line": symbol.line,
                "depth": depth,
            }))
        })
        .collect();

    match format {
        OutputFormat::Compact | OutputFormat::Table => {
            if format == OutputFormat::Table {
                println!("{}", bold(heading));
            }
            for row in &rows {
                println!(
                    "{}{} {}:{}",
                    "  ".repeat(row["depth"].as_u64().unwrap_or(1).saturating_sub(1) as usize),
                    row["qualified_name"].as_str().unwrap_or_default(),
                    row["file"].as_str().unwrap_or_default(),
                    row["line"],
                );
            }
            println!("{} symbols", rows.len());
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "subject": heading,
            "results": rows,
        })),
    }
}
