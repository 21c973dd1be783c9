/// Integration test suite: drives the engine through its public API on inline
/// fixtures, then runs the compiled `ccg` binary against a temporary project.
///
/// `CARGO_BIN_EXE_ccg` is set by Cargo during `cargo test` and points at the
/// binary for the current profile.
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use ccg_engine::cache::{load_cache, save_cache};
use ccg_engine::export::export_graph;
use ccg_engine::export::model::ExportParams;
use ccg_engine::query::{calls, deps, hierarchy};
use ccg_engine::walker::{load_sources, walk_project};
use ccg_engine::{
    analyze, Analysis, CancellationToken, CodeGraph, Confidence, DiagnosticKind, Direction,
    EdgeKind, EngineConfig, EngineError, SourceInput, SymbolKind,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn run(files: &[(&str, &str)]) -> Analysis {
    let inputs = files
        .iter()
        .map(|(path, text)| SourceInput::new(*path, *text))
        .collect();
    analyze(inputs, &EngineConfig::default(), &CancellationToken::new()).expect("analysis")
}

fn id(graph: &CodeGraph, qualified_name: &str) -> ccg_engine::SymbolId {
    let ids = graph.lookup(qualified_name);
    assert_eq!(ids.len(), 1, "expected one symbol named {qualified_name}");
    ids[0]
}

const MIXED: &[(&str, &str)] = &[
    (
        "pkg/__init__.py",
        "from pkg.models import User\n",
    ),
    (
        "pkg/models.py",
        "class Base:\n    def save(self):\n        pass\n\nclass User(Base):\n    def save(self):\n        self.validate()\n        Base.save(self)\n\n    def validate(self):\n        pass\n",
    ),
    (
        "pkg/service.py",
        "from pkg.models import User\nimport json\n\nLIMIT = 10\n\ndef load(raw: str) -> User:\n    data = json.loads(raw)\n    return make(data)\n\ndef make(data):\n    return User()\n",
    ),
    (
        "web/app.ts",
        "import { parse } from './util';\nimport * as util from './util';\n\nexport class App extends Base {\n  run(): void { parse(); util.format(); }\n}\n",
    ),
    (
        "web/util.ts",
        "export function parse(): void {}\nexport function format(): string { return ''; }\nexport function format(x: number): string;\n",
    ),
    (
        "src/main.rs",
        "mod shape;\nuse crate::shape::Square;\n\nfn main() {\n    let s = Square::new(2);\n    s.area();\n}\n",
    ),
    (
        "src/shape.rs",
        "pub trait Area { fn area(&self) -> u32; }\npub struct Square { side: u32 }\nimpl Square { pub fn new(side: u32) -> Self { Square { side } } }\nimpl Area for Square { fn area(&self) -> u32 { self.side * self.side } }\n",
    ),
];

// ---------------------------------------------------------------------------
// Engine properties
// ---------------------------------------------------------------------------

#[test]
fn test_two_file_example() {
    let analysis = run(&[
        ("a.py", "def f():\n    g()\n"),
        ("b.py", "def g():\n    pass\n"),
    ]);
    let graph = &analysis.graph;

    let functions: Vec<_> = graph
        .symbols()
        .filter(|s| s.kind == SymbolKind::Function)
        .map(|s| s.qualified_name.as_str())
        .collect();
    assert_eq!(functions, vec!["a.f", "b.g"]);

    let (f, g) = (id(graph, "a.f"), id(graph, "b.g"));
    let calls: Vec<_> = graph.edges().filter(|e| e.kind == EdgeKind::Calls).collect();
    assert_eq!(calls.len(), 1);
    assert_eq!((calls[0].source, calls[0].target), (f, g));
    assert_eq!(calls[0].confidence, Confidence::Resolved);

    // No import edges: the order falls back to id order.
    assert_eq!(graph.module_order().order, vec![id(graph, "a"), id(graph, "b")]);
    assert_eq!(graph.callers_of(g), &[f]);
}

#[test]
fn test_import_decides_module_order() {
    let analysis = run(&[
        ("a.py", "from b import g\n\ndef f():\n    g()\n"),
        ("b.py", "def g():\n    pass\n"),
    ]);
    let graph = &analysis.graph;
    assert_eq!(graph.module_order().order, vec![id(graph, "b"), id(graph, "a")]);
}

#[test]
fn test_determinism_across_runs_and_input_order() {
    let first = run(MIXED);
    let second = run(MIXED);
    assert_eq!(first, second);

    let mut reversed: Vec<_> = MIXED.to_vec();
    reversed.reverse();
    let third = run(&reversed);
    assert_eq!(first, third);

    let a = export_graph(&first, &ExportParams::default()).unwrap().content;
    let b = export_graph(&third, &ExportParams::default()).unwrap().content;
    assert_eq!(a, b);
}

#[test]
fn test_no_dangling_edges_and_dense_ids() {
    let analysis = run(MIXED);
    let graph = &analysis.graph;
    for (i, symbol) in graph.symbols().enumerate() {
        assert_eq!(symbol.id.index(), i);
    }
    for edge in graph.edges() {
        assert!(graph.symbol(edge.source).is_some(), "dangling source in {edge:?}");
        assert!(graph.symbol(edge.target).is_some(), "dangling target in {edge:?}");
        if edge.confidence == Confidence::Unresolved {
            assert!(graph.symbol(edge.target).unwrap().is_external());
        }
    }
}

#[test]
fn test_contains_forest() {
    let analysis = run(MIXED);
    let graph = &analysis.graph;
    let modules: BTreeSet<_> = graph.units().iter().map(|u| u.module).collect();
    for symbol in graph.symbols() {
        let parents = graph.neighbors(symbol.id, EdgeKind::Contains, Direction::Incoming);
        let is_root = modules.contains(&symbol.id) || Some(symbol.id) == graph.external_root();
        if is_root {
            assert!(parents.is_empty(), "{} has a parent", symbol.qualified_name);
        } else {
            assert_eq!(parents.len(), 1, "{} parents: {parents:?}", symbol.qualified_name);
            assert_eq!(Some(parents[0]), symbol.parent);
        }
    }
}

#[test]
fn test_lexical_shadowing_beats_import() {
    let analysis = run(&[
        ("a.py", "from b import helper\n\ndef run():\n    def helper():\n        pass\n    helper()\n"),
        ("b.py", "def helper():\n    pass\n"),
    ]);
    let graph = &analysis.graph;
    let run_id = id(graph, "a.run");
    let targets = graph.neighbors(run_id, EdgeKind::Calls, Direction::Outgoing);
    assert_eq!(targets, vec![id(graph, "a.run.helper")]);
}

#[test]
fn test_same_named_declarations_own_their_edges() {
    let analysis = run(&[
        (
            "m.py",
            "def helper():\n    pass\n\ndef f():\n    def inner():\n        pass\n\ndef f():\n    def inner2():\n        pass\n    helper()\n\nclass Base:\n    pass\n\nclass A:\n    pass\n\nclass A(Base):\n    pass\n",
        ),
        ("o.ts", "function g(): void {}\nfunction f(a: string): void;\nfunction f(a: any) { g(); }\n"),
    ]);
    let graph = &analysis.graph;

    let fs = graph.lookup("m.f");
    assert_eq!(fs.len(), 2);
    let inner2 = id(graph, "m.f.inner2");
    assert_eq!(graph.symbol(inner2).unwrap().parent, Some(fs[1]));
    assert_eq!(
        graph.neighbors(inner2, EdgeKind::Contains, Direction::Incoming),
        vec![fs[1]]
    );
    assert_eq!(graph.symbol(id(graph, "m.f.inner")).unwrap().parent, Some(fs[0]));
    assert_eq!(graph.callers_of(id(graph, "m.helper")), &[fs[1]]);

    let classes = graph.lookup("m.A");
    assert_eq!(classes.len(), 2);
    let base = id(graph, "m.Base");
    assert!(hierarchy::ancestors(graph, classes[0]).is_empty());
    assert_eq!(hierarchy::ancestors(graph, classes[1]), vec![base]);

    let overloads = graph.lookup("o.f");
    assert_eq!(overloads.len(), 2);
    let implementation = graph.symbol(overloads[1]).unwrap();
    assert!(implementation.signature.starts_with("function f(a: any)"));
    assert_eq!(graph.callers_of(id(graph, "o.g")), &[overloads[1]]);
}

#[test]
fn test_mixed_languages_resolve() {
    let analysis = run(MIXED);
    let graph = &analysis.graph;

    // Python: inheritance, receiver calls, import bindings
    let user = id(graph, "pkg.models.User");
    let base = id(graph, "pkg.models.Base");
    assert_eq!(hierarchy::ancestors(graph, user), vec![base]);
    let save = id(graph, "pkg.models.User.save");
    let callees = graph.neighbors(save, EdgeKind::Calls, Direction::Outgoing);
    assert!(callees.contains(&id(graph, "pkg.models.User.validate")));
    assert!(callees.contains(&id(graph, "pkg.models.Base.save")));
    let make = id(graph, "pkg.service.make");
    assert_eq!(graph.neighbors(make, EdgeKind::Calls, Direction::Outgoing), vec![user]);
    assert_eq!(graph.symbol(id(graph, "pkg.service.LIMIT")).unwrap().kind, SymbolKind::Constant);

    // TypeScript: named import, namespace descent into an overload set
    let run_id = id(graph, "web.app.App.run");
    let ts_calls = graph.edges_of(run_id, EdgeKind::Calls, Direction::Outgoing);
    assert!(ts_calls
        .iter()
        .any(|e| e.target == id(graph, "web.util.parse") && e.confidence == Confidence::Resolved));
    let formats = graph.lookup("web.util.format");
    assert_eq!(formats.len(), 2);
    let ambiguous: Vec<_> = ts_calls
        .iter()
        .filter(|e| e.confidence == Confidence::Ambiguous)
        .map(|e| e.target)
        .collect();
    assert_eq!(ambiguous, formats.to_vec());
    assert!(analysis
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::ResolutionAmbiguity));

    // Rust: `use crate::...` and associated functions on an impl'd type
    let main = id(graph, "src.main");
    let new = id(graph, "src.shape.Square.new");
    assert!(graph.neighbors(main, EdgeKind::Calls, Direction::Outgoing).contains(&new));
    let square = id(graph, "src.shape.Square");
    assert_eq!(hierarchy::ancestors(graph, square), vec![id(graph, "src.shape.Area")]);
}

#[test]
fn test_partial_failure_is_tolerated() {
    let inputs = vec![
        SourceInput::new("good.py", "def ok():\n    pass\n"),
        SourceInput::new("broken.py", "def half(:\n    pass\n\ndef fine():\n    pass\n"),
        SourceInput::new("blob.py", "\0\u{1}\u{2}"),
        SourceInput::unreadable("gone.py", io::Error::new(io::ErrorKind::NotFound, "gone")),
    ];
    let analysis = analyze(inputs, &EngineConfig::default(), &CancellationToken::new()).unwrap();
    let graph = &analysis.graph;

    let paths: Vec<_> = graph.units().iter().map(|u| u.path.clone()).collect();
    assert_eq!(
        paths,
        vec![PathBuf::from("blob.py"), PathBuf::from("broken.py"), PathBuf::from("good.py")]
    );
    assert_eq!(graph.lookup("good.ok").len(), 1);
    assert_eq!(graph.lookup("broken.fine").len(), 1);

    let kinds: Vec<_> = analysis.diagnostics.iter().map(|d| (d.path.clone(), d.kind)).collect();
    assert!(kinds.contains(&(PathBuf::from("gone.py"), DiagnosticKind::FatalIo)));
    assert!(kinds.contains(&(PathBuf::from("blob.py"), DiagnosticKind::ParseError)));
    assert!(kinds.contains(&(PathBuf::from("broken.py"), DiagnosticKind::ParseError)));
}

#[test]
fn test_import_cycle_reported_not_fatal() {
    let analysis = run(&[
        ("a.py", "import b\n"),
        ("b.py", "import c\n"),
        ("c.py", "import a\n"),
    ]);
    let graph = &analysis.graph;
    let report = deps::dependency_report(graph);
    assert_eq!(report.order.len(), 3);
    assert_eq!(report.cycles.len(), 1);
    let names: Vec<_> = report.cycles[0].modules.iter().map(|m| m.module.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[test]
fn test_inheritance_cycle_queries_terminate() {
    let analysis = run(&[
        ("x.py", "from y import B\n\nclass A(B):\n    pass\n"),
        ("y.py", "from x import A\n\nclass B(A):\n    pass\n"),
    ]);
    let graph = &analysis.graph;
    let (a, b) = (id(graph, "x.A"), id(graph, "y.B"));
    assert_eq!(hierarchy::ancestors(graph, a), vec![b]);
    assert_eq!(hierarchy::descendants(graph, a), vec![b]);
    assert_eq!(graph.module_order().cycles.len(), 1);
}

#[test]
fn test_recursive_calls_terminate() {
    let analysis = run(&[("r.py", "def even(n):\n    return odd(n)\n\ndef odd(n):\n    return even(n)\n")]);
    let graph = &analysis.graph;
    let even = id(graph, "r.even");
    let closure = calls::call_closure(graph, even, Direction::Outgoing, None);
    assert_eq!(closure, vec![(id(graph, "r.odd"), 1)]);
}

#[test]
fn test_cancelled_run_yields_no_graph() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let inputs = MIXED.iter().map(|(p, t)| SourceInput::new(*p, *t)).collect();
    let result = analyze(inputs, &EngineConfig::default(), &cancel);
    assert!(matches!(result, Err(EngineError::Cancelled)));
}

#[test]
fn test_graph_shared_between_threads() {
    let analysis = run(MIXED);
    let graph = &analysis.graph;
    let expected = graph.lookup("pkg.models.User").to_vec();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                assert_eq!(graph.lookup("pkg.models.User"), expected.as_slice());
                let _ = deps::dependency_report(graph);
            });
        }
    });
}

#[test]
fn test_walk_analyse_and_cache_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());

    let config = EngineConfig::load(dir.path());
    let files = walk_project(dir.path(), &config, false, None).unwrap();
    let inputs = load_sources(dir.path(), &files, &config);
    let analysis = analyze(inputs, &config, &CancellationToken::new()).unwrap();
    save_cache(dir.path(), &analysis).unwrap();

    let loaded = load_cache(dir.path()).unwrap().unwrap();
    assert_eq!(loaded.analysis, analysis);
    // ignored by ccg.toml
    assert!(analysis.graph.unit_by_path(Path::new("legacy/old.py")).is_none());
}

// ---------------------------------------------------------------------------
// Binary
// ---------------------------------------------------------------------------

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ccg"))
}

fn write_fixture(root: &Path) {
    std::fs::create_dir_all(root.join("app")).unwrap();
    std::fs::create_dir_all(root.join("legacy")).unwrap();
    std::fs::write(root.join("ccg.toml"), "exclude = [\"legacy\"]\n").unwrap();
    std::fs::write(
        root.join("app/main.py"),
        "from app.util import helper\n\ndef main():\n    helper()\n",
    )
    .unwrap();
    std::fs::write(root.join("app/util.py"), "def helper():\n    pass\n").unwrap();
    std::fs::write(root.join("legacy/old.py"), "def old():\n    pass\n").unwrap();
}

/// Run a ccg command and assert it exits successfully. Returns stdout.
fn run_success(args: &[&str]) -> String {
    let out = Command::new(binary())
        .args(args)
        .output()
        .expect("failed to invoke ccg binary");
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        out.status.success(),
        "command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
        args,
        out.status,
        stdout,
        stderr
    );
    stdout
}

/// Run a ccg command and assert it exits with a non-zero status. Returns stderr.
fn run_failure(args: &[&str]) -> String {
    let out = Command::new(binary())
        .args(args)
        .output()
        .expect("failed to invoke ccg binary");
    assert!(!out.status.success(), "command {:?} unexpectedly succeeded", args);
    String::from_utf8_lossy(&out.stderr).to_string()
}

#[test]
fn test_cli_index_json() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let root = dir.path().to_str().unwrap();

    let stdout = run_success(&["index", root, "--json"]);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
    assert_eq!(json["file_count"], 2);
    assert_eq!(json["calls"], 1);
    assert_eq!(json["from_cache"], false);
}

#[test]
fn test_cli_index_uses_cache_second_time() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let root = dir.path().to_str().unwrap();

    run_success(&["--cache", "index", root, "--json"]);
    assert!(dir.path().join(".ccg/graph.bin").exists());
    let stdout = run_success(&["--cache", "index", root, "--json"]);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["from_cache"], true);
}

#[test]
fn test_cli_find_and_calls() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let root = dir.path().to_str().unwrap();

    let stdout = run_success(&["find", "help", root]);
    assert!(stdout.contains("def app.util.helper app/util.py:1 function"), "got: {stdout}");
    assert!(stdout.contains("1 definitions found"));

    let stdout = run_success(&["calls", "app.util.helper", root]);
    assert!(stdout.contains("app.main.main"), "got: {stdout}");
}

#[test]
fn test_cli_deps_json() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let root = dir.path().to_str().unwrap();

    let stdout = run_success(&["deps", root, "--format", "json"]);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let order: Vec<_> = json["order"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["module"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(order, vec!["app.util", "app.main"]);
}

#[test]
fn test_cli_export_dot() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let root = dir.path().to_str().unwrap();

    let stdout = run_success(&["export", root, "--format", "dot"]);
    assert!(stdout.starts_with("digraph code_graph {"));
    assert!(stdout.contains("1 import"));
}

#[test]
fn test_cli_unknown_symbol_fails() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let stderr = run_failure(&["show", "app.nothing", dir.path().to_str().unwrap()]);
    assert!(stderr.contains("no symbol named 'app.nothing'"));
}
