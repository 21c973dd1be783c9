use std::path::{Component, Path, PathBuf};

use crate::extract::{module_name, ExtractedUnit};
use crate::language::LanguageKind;

/// Extensions stripped from JS/TS import specifiers before mapping them to modules.
const SCRIPT_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts"];

/// Map an import specifier, as written in `unit`, to a dotted module name.
///
/// - Python: `a.b` stays, `.b` / `..pkg` are relative to the importing package.
/// - JS/TS: `./x` / `../x` are resolved against the importing file's directory;
///   bare specifiers (`react`, `@scope/pkg`) keep their text with `/` as `.`.
/// - Rust: `crate::`, `self::` and `super::` are anchored at the crate `src`
///   directory and the importing module.
pub fn normalize_specifier(unit: &ExtractedUnit, specifier: &str) -> String {
    match unit.language {
        LanguageKind::Python => python_module(unit, specifier),
        LanguageKind::JavaScript | LanguageKind::TypeScript | LanguageKind::Tsx => {
            script_module(&unit.path, specifier)
        }
        LanguageKind::Rust => rust_module(&unit.module_name, specifier),
        LanguageKind::PlainText => specifier.to_string(),
    }
}

fn parent(qualified: &str) -> &str {
    qualified.rsplit_once('.').map(|(p, _)| p).unwrap_or("")
}

fn join(base: &str, rest: &str) -> String {
    match (base.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base}.{rest}"),
    }
}

fn python_module(unit: &ExtractedUnit, specifier: &str) -> String {
    let level = specifier.chars().take_while(|&c| c == '.').count();
    let rest = &specifier[level..];
    if level == 0 {
        return rest.to_string();
    }
    let mut base = if unit.is_package {
        unit.module_name.as_str()
    } else {
        parent(&unit.module_name)
    };
    for _ in 1..level {
        base = parent(base);
    }
    join(base, rest)
}

fn script_module(importer: &Path, specifier: &str) -> String {
    if !(specifier.starts_with("./") || specifier.starts_with("../") || specifier == "." || specifier == "..") {
        return specifier.trim_start_matches('@').replace('/', ".");
    }
    let dir = importer.parent().unwrap_or(Path::new(""));
    let mut resolved = PathBuf::new();
    for component in dir.join(specifier).components() {
        match component {
            Component::ParentDir => {
                resolved.pop();
            }
            Component::CurDir => {}
            other => resolved.push(other.as_os_str()),
        }
    }
    let has_script_ext = resolved
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| SCRIPT_EXTENSIONS.contains(&e))
        .unwrap_or(false);
    if !has_script_ext {
        // `./util` names `util.ts` or `util/index.ts`; both map to the same module name.
        resolved.set_extension("js");
    }
    module_name(&resolved)
}

fn rust_module(importer: &str, specifier: &str) -> String {
    let segments: Vec<&str> = specifier.split("::").filter(|s| !s.is_empty()).collect();
    let Some((&first, rest)) = segments.split_first() else {
        return String::new();
    };
    let (base, rest) = match first {
        "crate" => (crate_root(importer).to_string(), rest),
        "self" => (importer.to_string(), rest),
        "super" => {
            let mut base = parent(importer);
            let mut rest = rest;
            while let Some((&"super", tail)) = rest.split_first() {
                base = parent(base);
                rest = tail;
            }
            (base.to_string(), rest)
        }
        _ => (String::new(), &segments[..]),
    };
    join(&base, &rest.join("."))
}

/// Everything up to and including the last `src` segment; empty when there is none.
fn crate_root(module: &str) -> &str {
    let segments: Vec<&str> = module.split('.').collect();
    match segments.iter().rposition(|s| *s == "src") {
        Some(pos) => {
            let len: usize = segments[..=pos].iter().map(|s| s.len()).sum::<usize>() + pos;
            &module[..len]
        }
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(path: &str, language: LanguageKind) -> ExtractedUnit {
        ExtractedUnit::module_only(Path::new(path), language, 0)
    }

    #[test]
    fn test_python_relative() {
        let m = unit("pkg/sub/mod.py", LanguageKind::Python);
        assert_eq!(normalize_specifier(&m, "os.path"), "os.path");
        assert_eq!(normalize_specifier(&m, ".b"), "pkg.sub.b");
        assert_eq!(normalize_specifier(&m, "."), "pkg.sub");
        assert_eq!(normalize_specifier(&m, "..util"), "pkg.util");

        let init = unit("pkg/sub/__init__.py", LanguageKind::Python);
        assert_eq!(normalize_specifier(&init, ".b"), "pkg.sub.b");
    }

    #[test]
    fn test_script_relative() {
        let m = unit("web/app/main.ts", LanguageKind::TypeScript);
        assert_eq!(normalize_specifier(&m, "./util"), "web.app.util");
        assert_eq!(normalize_specifier(&m, "./util.js"), "web.app.util");
        assert_eq!(normalize_specifier(&m, "../lib/index"), "web.lib");
        assert_eq!(normalize_specifier(&m, "../lib"), "web.lib");
        assert_eq!(normalize_specifier(&m, "react"), "react");
        assert_eq!(normalize_specifier(&m, "@scope/pkg"), "scope.pkg");
    }

    #[test]
    fn test_rust_paths() {
        let m = unit("src/graph/node.rs", LanguageKind::Rust);
        assert_eq!(normalize_specifier(&m, "crate::parser"), "src.parser");
        assert_eq!(normalize_specifier(&m, "self::inner"), "src.graph.node.inner");
        assert_eq!(normalize_specifier(&m, "super::edge"), "src.graph.edge");
        assert_eq!(normalize_specifier(&m, "super::super::lib"), "src.lib");
        assert_eq!(normalize_specifier(&m, "std::fmt"), "std.fmt");

        let nested = unit("crates/core/src/lib.rs", LanguageKind::Rust);
        assert_eq!(normalize_specifier(&nested, "crate::a"), "crates.core.src.a");
    }
}
