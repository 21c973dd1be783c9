pub mod envelope;

pub use envelope::{cache_path, is_stale, load_cache, save_cache, CacheEnvelope, CACHE_VERSION};
