//! File system utils.

use std::path::{Path, PathBuf};

use anyhow::Context;

pub struct FsHandler;

impl FsHandler {
    /// Create a directory (and its parents) if it doesn't exist yet.
    pub fn ensure_directory(path: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;
        tracing::debug!("Ensured directory exists: {}", path.display());

        Ok(())
    }

    /// Replace the content of `path` with `contents`.
    ///
    /// The data is first written to a sibling temporary file which is then renamed
    /// over `path`, so readers observe either the old file or the complete new one.
    /// Missing parent directories are created.
    pub fn write_atomic(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::ensure_directory(&parent)?;

        let file_name = path
            .file_name()
            .with_context(|| format!("Output path has no file name: {}", path.display()))?;
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = parent.join(tmp_name);

        if let Err(e) = std::fs::write(&tmp_path, contents) {
            // A partially written file may exist; a directory in the way is left alone.
            if tmp_path.is_file() {
                let _ = std::fs::remove_file(&tmp_path);
            }
            return Err(e).with_context(|| format!("Failed to write {}", tmp_path.display()));
        }

        if let Err(e) = std::fs::rename(&tmp_path, path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_write_atomic_creates_missing_directories() {
        let dir = TempDir::new("ballot-fs").unwrap();
        let path = dir.path().join("a/b/c/out.json");

        FsHandler::write_atomic(&path, b"{}").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        assert!(!dir.path().join("a/b/c/out.json.tmp").exists());
    }

    #[test]
    fn test_write_atomic_overwrites() {
        let dir = TempDir::new("ballot-fs").unwrap();
        let path = dir.path().join("out.json");

        FsHandler::write_atomic(&path, b"a much longer first version").unwrap();
        FsHandler::write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_write_atomic_fails_when_parent_is_a_file() {
        let dir = TempDir::new("ballot-fs").unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let result = FsHandler::write_atomic(&blocker.join("out.json"), b"{}");

        assert!(result.is_err());
    }

    #[test]
    fn test_write_atomic_failed_write_keeps_destination() {
        let dir = TempDir::new("ballot-fs").unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, b"previous").unwrap();
        // A directory where the temporary file should go makes the write fail.
        std::fs::create_dir(dir.path().join("out.json.tmp")).unwrap();

        let result = FsHandler::write_atomic(&path, b"next");

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous");
        assert!(dir.path().join("out.json.tmp").is_dir());
    }

    #[test]
    fn test_ensure_directory_is_idempotent() {
        let dir = TempDir::new("ballot-fs").unwrap();
        let nested = dir.path().join("x/y");

        FsHandler::ensure_directory(&nested).unwrap();
        FsHandler::ensure_directory(&nested).unwrap();

        assert!(nested.is_dir());
    }
}
