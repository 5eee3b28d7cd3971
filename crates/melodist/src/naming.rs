//! Output file naming.

use std::path::{Path, PathBuf};

/// First `<dir>/<base><n><ext>` that does not exist yet, counting from 1.
pub fn unique_path(dir: &Path, base: &str, ext: &str) -> PathBuf {
    (1u64..)
        .map(|n| dir.join(format!("{base}{n}{ext}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| dir.join(format!("{base}{ext}")))
}

/// File stem of `path`, or `"output"` for paths without one.
pub fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}
