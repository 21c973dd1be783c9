//! Code Context Graph engine.
//!
//! Parses a set of source files (Python, JavaScript, TypeScript/TSX, Rust, with a
//! heuristic fallback for anything else) into one deterministic graph of symbols
//! and typed edges, then answers structural queries over it.
//!
//! ```no_run
//! use ccg_engine::{analyze, CancellationToken, EngineConfig, SourceInput};
//!
//! let inputs = vec![
//!     SourceInput::new("a.py", "from b import g\n\ndef f():\n    g()\n"),
//!     SourceInput::new("b.py", "def g():\n    pass\n"),
//! ];
//! let analysis = analyze(inputs, &EngineConfig::default(), &CancellationToken::new())?;
//! let f = analysis.graph.lookup("a.f")[0];
//! assert_eq!(analysis.graph.symbol(f).map(|s| s.line), Some(3));
//! # Ok::<(), ccg_engine::EngineError>(())
//! ```

pub mod assembler;
pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod extract;
pub mod graph;
pub mod language;
pub mod parser;
pub mod pipeline;
pub mod query;
pub mod resolver;
pub mod source;
pub mod walker;

pub use config::EngineConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use error::EngineError;
pub use graph::CodeGraph;
pub use graph::edge::{Confidence, Direction, Edge, EdgeKind};
pub use graph::node::{ByteRange, Symbol, SymbolId, SymbolKind, UnitId, Visibility};
pub use language::LanguageKind;
pub use pipeline::{analyze, Analysis};
pub use source::{CancellationToken, SourceInput};
