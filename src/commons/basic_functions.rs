use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Create a directory (and parents) if it does not exist yet.
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("Failed to create output directory: {}", path.display()))
}

/// File size in megabytes, for operator-facing output reports.
pub fn file_size_mb(path: &Path) -> Result<f64> {
    let metadata = fs::metadata(path)
        .with_context(|| format!("Failed to read metadata for {}", path.display()))?;
    Ok(metadata.len() as f64 / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b/c");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        // Calling again on an existing directory is fine
        ensure_dir(&nested).unwrap();
    }

    #[test]
    fn test_file_size_mb() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("data.bin");
        std::fs::write(&file, vec![0u8; 1024 * 1024]).unwrap();
        let size = file_size_mb(&file).unwrap();
        assert!((size - 1.0).abs() < 1e-9);
    }
}
