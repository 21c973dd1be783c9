use std::path::PathBuf;

use clap::{Parser, Subcommand};

use ccg_engine::export::model::{ExportFormat, Granularity};
use ccg_engine::query::output::OutputFormat;

/// Build a code context graph for a Python, JavaScript, TypeScript or Rust tree.
///
/// ccg parses every source file under a directory into one graph of symbols
/// (modules, classes, functions, methods, variables) connected by calls,
/// inheritance, imports, references and containment, then answers queries over it.
#[derive(Parser, Debug)]
#[command(
    name = "ccg",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    /// Debug-level logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Errors only on stderr.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Reuse `.ccg/graph.bin` when it is up to date, and refresh it otherwise.
    #[arg(long, global = true)]
    pub cache: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a project directory and print a summary of the graph.
    Index {
        /// Path to the project root to index.
        path: PathBuf,

        /// Output results as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,

        /// Print every diagnostic, not just warnings and errors.
        #[arg(long)]
        all_diagnostics: bool,
    },

    /// Find symbol definitions by regex over simple and qualified names.
    Find {
        /// Symbol name or regex pattern (e.g. "UserService" or "User.*Service").
        pattern: String,

        /// Path to the project root to index and query.
        path: PathBuf,

        /// Case-insensitive pattern matching.
        #[arg(short = 'i', long)]
        case_insensitive: bool,

        /// Filter by symbol kind (comma-separated: module,class,function,method,variable,constant,external).
        #[arg(long, value_delimiter = ',')]
        kind: Vec<String>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Module dependency order (dependencies first) and import cycles.
    Deps {
        /// Path to the project root to index and query.
        path: PathBuf,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Per-file summary: language, symbol and call counts, leading symbols.
    Summary {
        /// Path to the project root to index and query.
        path: PathBuf,

        /// Only summarise this file (relative to the project root).
        #[arg(long)]
        file: Option<PathBuf>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Graph statistics: symbols, edges and confidence breakdown.
    Stats {
        /// Path to the project root to index and query.
        path: PathBuf,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Callers (or callees) of a symbol, optionally transitive.
    Calls {
        /// Qualified name, e.g. `pkg.util.parse`.
        symbol: String,

        /// Path to the project root to index and query.
        path: PathBuf,

        /// Follow callees instead of callers.
        #[arg(long)]
        callees: bool,

        /// Maximum BFS depth; 1 means direct calls only.
        #[arg(long, default_value_t = 1)]
        depth: usize,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Ancestors and descendants of a class over inheritance edges.
    Hierarchy {
        /// Qualified name of the class, trait or interface.
        symbol: String,

        /// Path to the project root to index and query.
        path: PathBuf,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
        format: OutputFormat,
    },

    /// Print the source of a symbol with surrounding lines.
    Show {
        /// Qualified name of the symbol.
        symbol: String,

        /// Path to the project root to index and query.
        path: PathBuf,

        /// Lines of context on each side.
        #[arg(long, default_value_t = ccg_engine::query::snippet::DEFAULT_CONTEXT_LINES)]
        context: usize,
    },

    /// Export the graph as JSON or Graphviz DOT.
    Export {
        /// Path to the project root to index and export.
        path: PathBuf,

        /// Output format.
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,

        /// DOT node granularity.
        #[arg(long, value_enum, default_value_t = Granularity::Module)]
        granularity: Granularity,

        /// Only export units under this path prefix (relative to the project root).
        #[arg(long)]
        root: Option<PathBuf>,

        /// Leave External placeholders out.
        #[arg(long)]
        no_external: bool,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
