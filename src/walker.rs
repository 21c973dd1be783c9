use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::cache::envelope::CACHE_DIR;
use crate::config::EngineConfig;
use crate::language::LanguageKind;
use crate::source::SourceInput;

/// Directory names never descended into, whatever the ignore files say.
const HARD_EXCLUDES: &[&str] = &["node_modules", "__pycache__", CACHE_DIR];

/// Walk a project directory and collect source files, relative to `root`.
///
/// Respects `.gitignore` rules, always skips the directories in `HARD_EXCLUDES`,
/// and applies any additional exclusions from `config.exclude`. A file is kept when
/// its extension is a built-in language extension or has a configured override.
///
/// When `verbose` is true, each discovered file path is printed to stderr.
///
/// When `allowed_languages` is `Some(set)`, only files whose extension maps to one
/// of the languages in the set are included.
///
/// The result is sorted, so the same tree always yields the same input order.
pub fn walk_project(
    root: &Path,
    config: &EngineConfig,
    verbose: bool,
    allowed_languages: Option<&HashSet<LanguageKind>>,
) -> anyhow::Result<Vec<PathBuf>> {
    if !root.is_dir() {
        anyhow::bail!("{} is not a directory", root.display());
    }

    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(true)
        // Read .gitignore files even when the directory is not inside a git repository.
        .require_git(false)
        .build();

    let mut files = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                warn!("{err}");
                continue;
            }
        };

        if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);

        if is_hard_excluded(relative) || is_excluded_by_config(relative, config) {
            continue;
        }

        let ext = relative.extension().and_then(|e| e.to_str()).unwrap_or("");
        let Some(language) = language_for_extension(ext, config) else {
            continue;
        };
        if let Some(langs) = allowed_languages
            && !langs.contains(&language)
        {
            continue;
        }

        if verbose {
            eprintln!("{}", relative.display());
        }
        files.push(relative.to_path_buf());
    }

    files.sort();
    debug!(root = %root.display(), files = files.len(), "walk complete");
    Ok(files)
}

/// Read every walked file into a `SourceInput`, keeping the walk order.
pub fn load_sources(root: &Path, files: &[PathBuf], config: &EngineConfig) -> Vec<SourceInput> {
    files
        .iter()
        .map(|relative| SourceInput::read_from(root, relative, config.max_file_bytes))
        .collect()
}

fn language_for_extension(ext: &str, config: &EngineConfig) -> Option<LanguageKind> {
    config
        .languages
        .get(ext)
        .and_then(|name| LanguageKind::from_str_loose(name))
        .or_else(|| LanguageKind::from_extension(ext))
        // Plain text is only analysed when asked for by an override.
        .filter(|lang| lang.has_grammar() || config.languages.contains_key(ext))
}

/// Returns true if any component of `path` is a hard-excluded directory.
fn is_hard_excluded(path: &Path) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|s| HARD_EXCLUDES.contains(&s))
            .unwrap_or(false)
    })
}

/// Returns true if `path` matches any exclusion pattern from config.
fn is_excluded_by_config(path: &Path, config: &EngineConfig) -> bool {
    let path_str = path.to_string_lossy();

    for pattern in &config.exclude {
        let Ok(matcher) = glob::Pattern::new(pattern) else {
            warn!("ignoring invalid exclude pattern `{pattern}`");
            continue;
        };
        if matcher.matches(&path_str) {
            return true;
        }
        // Also check if any component matches the pattern directly.
        for component in path.components() {
            if let Some(s) = component.as_os_str().to_str()
                && matcher.matches(s)
            {
                return true;
            }
        }
    }

    false
}
