use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One file handed to the engine.
///
/// Reading is the caller's job; a failed read is passed through as `Err` and
/// becomes a `FatalIo` diagnostic instead of aborting the run.
#[derive(Debug)]
pub struct SourceInput {
    pub path: PathBuf,
    pub language_hint: Option<String>,
    pub text: io::Result<String>,
}

impl SourceInput {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language_hint: None,
            text: Ok(text.into()),
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.language_hint = Some(hint.into());
        self
    }

    pub fn unreadable(path: impl Into<PathBuf>, err: io::Error) -> Self {
        Self {
            path: path.into(),
            language_hint: None,
            text: Err(err),
        }
    }

    /// Read `root/relative` from disk, recording `relative` as the unit path.
    ///
    /// Files larger than `max_bytes` are reported as unreadable. Invalid UTF-8 is
    /// replaced rather than rejected.
    pub fn read_from(root: &Path, relative: &Path, max_bytes: u64) -> Self {
        let full = root.join(relative);
        let text = std::fs::metadata(&full).and_then(|meta| {
            if meta.len() > max_bytes {
                Err(io::Error::other(format!(
                    "file is {} bytes, limit is {}",
                    meta.len(),
                    max_bytes
                )))
            } else {
                // Invalid UTF-8 still yields a unit; the parser flags it.
                std::fs::read(&full).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            }
        });
        Self {
            path: relative.to_path_buf(),
            language_hint: None,
            text,
        }
    }
}

/// Cooperative cancellation flag shared between the caller and a running analysis.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
