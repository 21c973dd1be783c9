use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::assembler::assemble;
use crate::config::EngineConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::EngineError;
use crate::extract::{extract, ExtractedUnit};
use crate::graph::CodeGraph;
use crate::language::detect_language;
use crate::parser;
use crate::resolver::{resolve_unit, GlobalIndex, ResolveStats, UnitResolution};
use crate::source::{CancellationToken, SourceInput};

/// Result of one analysis run: the committed graph plus every diagnostic raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub graph: CodeGraph,
    /// Ordered by unit path; within a unit, extraction diagnostics precede resolution ones.
    pub diagnostics: Vec<Diagnostic>,
}

/// Phase-one outcome for a single input.
enum Extracted {
    Unit(Box<ExtractedUnit>),
    /// The file could not be read; it contributes nothing but this diagnostic.
    Unreadable(Diagnostic),
}

/// Build a code graph from `inputs`.
///
/// Files are parsed and extracted in parallel, numbered and indexed at a barrier,
/// resolved in parallel against the shared index, and assembled on the calling
/// thread. Per-file failures become diagnostics; only cancellation or an invalid
/// configuration fail the run.
pub fn analyze(
    inputs: Vec<SourceInput>,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> Result<Analysis, EngineError> {
    config.validate()?;

    if config.threads > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
        {
            Ok(pool) => return pool.install(|| run(inputs, config, cancel)),
            Err(err) => warn!("could not build a {}-thread pool: {err}; using the global pool", config.threads),
        }
    }
    run(inputs, config, cancel)
}

fn run(
    inputs: Vec<SourceInput>,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> Result<Analysis, EngineError> {
    let _span = info_span!("analyze", files = inputs.len()).entered();

    // Phase 1: parse + extract, one file per task.
    let extracted: Vec<Option<Extracted>> = inputs
        .into_par_iter()
        .map(|input| {
            if cancel.is_cancelled() {
                return None;
            }
            Some(extract_one(input, config))
        })
        .collect();
    if cancel.is_cancelled() {
        info!("cancelled after extraction");
        return Err(EngineError::Cancelled);
    }

    let mut units = Vec::new();
    let mut unreadable = Vec::new();
    for item in extracted.into_iter().flatten() {
        match item {
            Extracted::Unit(unit) => units.push(*unit),
            Extracted::Unreadable(diagnostic) => unreadable.push(diagnostic),
        }
    }

    // Barrier: deterministic numbering, then a single writer builds the index.
    units.sort_by(|a, b| a.path.cmp(&b.path));
    let mut bases = Vec::with_capacity(units.len());
    let mut next = 0u32;
    for unit in &units {
        bases.push(next);
        next += unit.symbols.len() as u32;
    }
    let index = GlobalIndex::build(&units, &bases);
    debug!(units = units.len(), symbols = index.len(), "index built");

    // Phase 2: resolve against the read-only index.
    let resolutions: Vec<Option<UnitResolution>> = units
        .par_iter()
        .zip(bases.par_iter())
        .map(|(unit, &base)| {
            if cancel.is_cancelled() {
                return None;
            }
            Some(resolve_unit(unit, base, &index))
        })
        .collect();
    if cancel.is_cancelled() {
        info!("cancelled after resolution");
        return Err(EngineError::Cancelled);
    }
    let resolutions: Vec<UnitResolution> = resolutions.into_iter().flatten().collect();

    let mut stats = ResolveStats::default();
    for resolution in &resolutions {
        stats.merge(resolution.stats);
    }
    debug!(
        resolved = stats.resolved,
        ambiguous = stats.ambiguous,
        unresolved = stats.unresolved,
        "references resolved"
    );

    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }
    let graph = assemble(&units, &bases, &resolutions);

    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    for (unit, resolution) in units.into_iter().zip(resolutions) {
        diagnostics.extend(unit.diagnostics);
        diagnostics.extend(resolution.diagnostics);
    }
    diagnostics.extend(unreadable);
    // Stable: keeps the per-unit order established above.
    diagnostics.sort_by(|a, b| a.path.cmp(&b.path));

    info!(
        units = graph.units().len(),
        symbols = graph.symbol_count(),
        edges = graph.edge_count(),
        diagnostics = diagnostics.len(),
        "analysis complete"
    );
    Ok(Analysis { graph, diagnostics })
}

fn extract_one(input: SourceInput, config: &EngineConfig) -> Extracted {
    let SourceInput {
        path,
        language_hint,
        text,
    } = input;

    let text = match text {
        Ok(text) => text,
        Err(err) => {
            debug!(path = %path.display(), "unreadable: {err}");
            return Extracted::Unreadable(Diagnostic::new(
                DiagnosticKind::FatalIo,
                path,
                format!("cannot read file: {err}"),
            ));
        }
    };

    let language = detect_language(&path, language_hint.as_deref(), &text, &config.languages);
    let text_len = text.len();
    let unit = match parser::parse(text, language) {
        Ok(tree) => {
            let facts = parser::analyze(&tree);
            extract(&path, &tree, facts, config)
        }
        Err(err) => {
            let mut unit = ExtractedUnit::module_only(&path, language, text_len);
            unit.diagnostics.push(Diagnostic::new(
                DiagnosticKind::ParseError,
                &path,
                format!("could not parse: {err}"),
            ));
            unit
        }
    };
    Extracted::Unit(Box::new(unit))
}
