mod cli;
mod logger;
mod output;

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use ccg_engine::cache::{is_stale, load_cache, save_cache};
use ccg_engine::export::export_graph;
use ccg_engine::export::model::ExportParams;
use ccg_engine::graph::edge::Direction;
use ccg_engine::query::{calls, deps, find, hierarchy, output as fmt, snippet, stats, summary};
use ccg_engine::walker::{load_sources, walk_project};
use ccg_engine::{
    Analysis, CancellationToken, CodeGraph, EngineConfig, EngineError, Severity, SymbolId,
    SymbolKind,
};

use cli::{Cli, Commands};
use output::{IndexStats, print_summary};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_logger(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Index {
            path,
            json,
            all_diagnostics,
        } => {
            let start = Instant::now();
            let (analysis, from_cache) = build_analysis(&path, cli.cache)?;
            for d in &analysis.diagnostics {
                if all_diagnostics || d.severity != Severity::Info {
                    eprintln!("{}", d);
                }
            }
            let stats = IndexStats::collect(&analysis, from_cache, start.elapsed().as_secs_f64());
            print_summary(&stats, json);
        }

        Commands::Find {
            pattern,
            path,
            case_insensitive,
            kind,
            format,
        } => {
            let kinds = parse_kinds(&kind)?;
            let (analysis, _) = build_analysis(&path, cli.cache)?;
            let results = find::find_symbols(&analysis.graph, &pattern, case_insensitive, &kinds)?;
            fmt::format_find_results(&results, format);
        }

        Commands::Deps { path, format } => {
            let (analysis, _) = build_analysis(&path, cli.cache)?;
            fmt::format_deps(&deps::dependency_report(&analysis.graph), format);
        }

        Commands::Summary { path, file, format } => {
            let (analysis, _) = build_analysis(&path, cli.cache)?;
            let graph = &analysis.graph;
            let summaries: Vec<_> = match file {
                Some(file) => {
                    let unit = graph
                        .unit_by_path(&file)
                        .with_context(|| format!("{} is not part of the graph", file.display()))?;
                    summary::file_summary(graph, unit.id).into_iter().collect()
                }
                None => summary::all_summaries(graph),
            };
            fmt::format_summaries(&summaries, format);
        }

        Commands::Stats { path, format } => {
            let (analysis, _) = build_analysis(&path, cli.cache)?;
            fmt::format_stats(&stats::graph_stats(&analysis.graph), format);
        }

        Commands::Calls {
            symbol,
            path,
            callees,
            depth,
            format,
        } => {
            let (analysis, _) = build_analysis(&path, cli.cache)?;
            let graph = &analysis.graph;
            let direction = if callees {
                Direction::Outgoing
            } else {
                Direction::Incoming
            };
            let mut items = Vec::new();
            for &id in lookup(graph, &symbol)? {
                items.extend(calls::call_closure(graph, id, direction, Some(depth.max(1))));
            }
            let heading = if callees { "callees of" } else { "callers of" };
            fmt::format_symbol_list(graph, &format!("{heading} {symbol}"), &items, format);
        }

        Commands::Hierarchy {
            symbol,
            path,
            format,
        } => {
            let (analysis, _) = build_analysis(&path, cli.cache)?;
            let graph = &analysis.graph;
            for &id in lookup(graph, &symbol)? {
                let h = hierarchy::hierarchy(graph, id);
                let up: Vec<_> = h.ancestors.iter().map(|&a| (a, 1)).collect();
                let down: Vec<_> = h.descendants.iter().map(|&d| (d, 1)).collect();
                fmt::format_symbol_list(graph, &format!("ancestors of {symbol}"), &up, format);
                fmt::format_symbol_list(graph, &format!("descendants of {symbol}"), &down, format);
            }
        }

        Commands::Show {
            symbol,
            path,
            context,
        } => {
            let (analysis, _) = build_analysis(&path, cli.cache)?;
            let graph = &analysis.graph;
            for &id in lookup(graph, &symbol)? {
                print_snippet(&path, graph, id, context)?;
            }
        }

        Commands::Export {
            path,
            format,
            granularity,
            root,
            no_external,
            output,
        } => {
            let (analysis, _) = build_analysis(&path, cli.cache)?;
            let params = ExportParams {
                format,
                granularity,
                root_filter: root,
                skip_external: no_external,
            };
            let result = export_graph(&analysis, &params)?;
            match output {
                Some(target) => {
                    std::fs::write(&target, &result.content)
                        .with_context(|| format!("failed to write {}", target.display()))?;
                    eprintln!(
                        "Exported {} nodes, {} edges to {}",
                        result.node_count,
                        result.edge_count,
                        target.display()
                    );
                }
                None => println!("{}", result.content),
            }
        }
    }

    Ok(())
}

/// Index `root`, going through the on-disk cache when `use_cache` is set.
///
/// Returns the analysis and whether it was served from the cache.
fn build_analysis(root: &Path, use_cache: bool) -> Result<(Analysis, bool)> {
    let config = EngineConfig::load(root);

    if use_cache {
        match load_cache(root) {
            Ok(Some(envelope)) if !is_stale(root, &envelope) => {
                info!("using cached graph");
                return Ok((envelope.analysis, true));
            }
            Ok(Some(_)) => info!("cache is stale, re-indexing"),
            Ok(None) => {}
            Err(EngineError::CacheVersion { found, expected }) => {
                warn!("cache version {found} (expected {expected}), re-indexing")
            }
            Err(err) => warn!("could not read cache: {err}"),
        }
    }

    let files = walk_project(root, &config, false, None)?;
    let inputs = load_sources(root, &files, &config);
    let analysis = ccg_engine::analyze(inputs, &config, &CancellationToken::new())
        .with_context(|| format!("failed to analyse {}", root.display()))?;

    if use_cache && let Err(err) = save_cache(root, &analysis) {
        warn!("could not write cache: {err}");
    }
    Ok((analysis, false))
}

fn parse_kinds(raw: &[String]) -> Result<Vec<SymbolKind>> {
    raw.iter()
        .map(|k| {
            SymbolKind::from_str_loose(k).with_context(|| format!("unknown symbol kind '{}'", k))
        })
        .collect()
}

fn lookup<'g>(graph: &'g CodeGraph, qualified_name: &str) -> Result<&'g [SymbolId]> {
    let ids = graph.lookup(qualified_name);
    if ids.is_empty() {
        anyhow::bail!("no symbol named '{}'", qualified_name);
    }
    Ok(ids)
}

fn print_snippet(root: &Path, graph: &CodeGraph, id: SymbolId, context: usize) -> Result<()> {
    let Some(symbol) = graph.symbol(id) else {
        return Ok(());
    };
    let Some(unit) = symbol.unit.and_then(|u| graph.unit(u)) else {
        println!("{} is external", symbol.qualified_name);
        return Ok(());
    };
    let text = std::fs::read_to_string(root.join(&unit.path))
        .with_context(|| format!("failed to read {}", unit.path.display()))?;
    let (first_line, body) = snippet::snippet(&text, symbol.range, context);
    println!("{}:{} {}", unit.path.display(), first_line, symbol.qualified_name);
    for (offset, line) in body.lines().enumerate() {
        println!("{:>5} | {}", first_line + offset, line);
    }
    Ok(())
}
