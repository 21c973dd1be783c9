use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::EngineError;
use crate::pipeline::Analysis;

/// Current cache format version. Bump whenever a serialized type changes shape:
/// bincode encodes enums by discriminant and structs positionally.
pub const CACHE_VERSION: u32 = 1;

/// Cache directory name (created in project root).
pub const CACHE_DIR: &str = ".ccg";
/// Cache file name within CACHE_DIR.
pub const CACHE_FILE: &str = "graph.bin";

/// Metadata for a cached file: mtime (seconds since epoch) + file size.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FileMeta {
    pub mtime_secs: u64,
    pub size: u64,
}

/// Envelope wrapping a committed analysis with version and staleness metadata.
///
/// `version` must stay the first field: `load_cache` decodes it on its own before
/// attempting the full payload.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct CacheEnvelope {
    pub version: u32,
    pub project_root: PathBuf,
    /// Keyed by unit path, relative to `project_root`.
    pub file_meta: BTreeMap<PathBuf, FileMeta>,
    pub analysis: Analysis,
}

/// Build the cache file path for a project: `<project_root>/.ccg/graph.bin`
pub fn cache_path(project_root: &Path) -> PathBuf {
    project_root.join(CACHE_DIR).join(CACHE_FILE)
}

fn file_meta(path: &Path) -> Option<FileMeta> {
    let metadata = std::fs::metadata(path).ok()?;
    let mtime_secs = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Some(FileMeta {
        mtime_secs,
        size: metadata.len(),
    })
}

/// Collect current filesystem metadata for every unit in the analysis.
pub fn collect_file_meta(project_root: &Path, analysis: &Analysis) -> BTreeMap<PathBuf, FileMeta> {
    analysis
        .graph
        .units()
        .iter()
        .filter_map(|u| Some((u.path.clone(), file_meta(&project_root.join(&u.path))?)))
        .collect()
}

/// Save the analysis to disk atomically using bincode serialization.
///
/// Writes to a temp file first, then renames to the final path.
/// Creates the `.ccg/` directory if it doesn't exist.
pub fn save_cache(project_root: &Path, analysis: &Analysis) -> Result<(), EngineError> {
    let cache_dir = project_root.join(CACHE_DIR);
    std::fs::create_dir_all(&cache_dir)?;

    let envelope = CacheEnvelope {
        version: CACHE_VERSION,
        project_root: project_root.to_path_buf(),
        file_meta: collect_file_meta(project_root, analysis),
        analysis: analysis.clone(),
    };

    // Atomic write: temp file in same directory, then rename
    let target = cache_path(project_root);
    let mut tmp = tempfile::NamedTempFile::new_in(&cache_dir)?;
    bincode::serde::encode_into_std_write(&envelope, &mut tmp, bincode::config::standard())?;
    tmp.as_file().flush()?;
    tmp.persist(&target)?;

    info!(path = %target.display(), "cache written");
    Ok(())
}

/// Load the cached analysis from disk.
///
/// Returns `Ok(None)` when no cache file exists and `EngineError::CacheVersion`
/// when the file was written by a different format version.
pub fn load_cache(project_root: &Path) -> Result<Option<CacheEnvelope>, EngineError> {
    let target = cache_path(project_root);
    let bytes = match std::fs::read(&target) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let (found, _) = bincode::serde::decode_from_slice::<u32, _>(&bytes, bincode::config::standard())?;
    if found != CACHE_VERSION {
        return Err(EngineError::CacheVersion {
            found,
            expected: CACHE_VERSION,
        });
    }

    let (envelope, _) =
        bincode::serde::decode_from_slice::<CacheEnvelope, _>(&bytes, bincode::config::standard())?;
    debug!(units = envelope.analysis.graph.units().len(), "cache loaded");
    Ok(Some(envelope))
}

/// True when any cached unit changed on disk, disappeared, or the cache was
/// written for another root.
pub fn is_stale(project_root: &Path, envelope: &CacheEnvelope) -> bool {
    if envelope.project_root != project_root {
        return true;
    }
    envelope
        .file_meta
        .iter()
        .any(|(path, meta)| file_meta(&project_root.join(path)).as_ref() != Some(meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::pipeline::analyze;
    use crate::source::{CancellationToken, SourceInput};

    fn sample(root: &Path) -> Analysis {
        std::fs::write(root.join("a.py"), "def f():\n    g()\n").unwrap();
        std::fs::write(root.join("b.py"), "def g():\n    pass\n").unwrap();
        let inputs = ["a.py", "b.py"]
            .iter()
            .map(|p| SourceInput::read_from(root, Path::new(p), 1 << 20))
            .collect();
        analyze(inputs, &EngineConfig::default(), &CancellationToken::new()).unwrap()
    }

    #[test]
    fn test_roundtrip_cache() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let analysis = sample(tmp_dir.path());

        save_cache(tmp_dir.path(), &analysis).unwrap();
        let loaded = load_cache(tmp_dir.path()).unwrap().expect("cache should load");

        assert_eq!(loaded.version, CACHE_VERSION);
        assert_eq!(loaded.analysis, analysis);
        assert_eq!(loaded.file_meta.len(), 2);
        assert!(!is_stale(tmp_dir.path(), &loaded));
    }

    #[test]
    fn test_load_missing_cache_returns_none() {
        let tmp_dir = tempfile::tempdir().unwrap();
        assert!(load_cache(tmp_dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_version_mismatch() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let dir = tmp_dir.path().join(CACHE_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        let bytes = bincode::serde::encode_to_vec(CACHE_VERSION + 1, bincode::config::standard()).unwrap();
        std::fs::write(dir.join(CACHE_FILE), bytes).unwrap();

        match load_cache(tmp_dir.path()) {
            Err(EngineError::CacheVersion { found, expected }) => {
                assert_eq!(found, CACHE_VERSION + 1);
                assert_eq!(expected, CACHE_VERSION);
            }
            other => panic!("expected version error, got {:?}", other.map(|e| e.is_some())),
        }
    }

    #[test]
    fn test_edit_marks_stale() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let analysis = sample(tmp_dir.path());
        save_cache(tmp_dir.path(), &analysis).unwrap();
        let loaded = load_cache(tmp_dir.path()).unwrap().unwrap();

        std::fs::write(tmp_dir.path().join("b.py"), "def g():\n    return 1234567\n").unwrap();
        assert!(is_stale(tmp_dir.path(), &loaded));
    }
}
