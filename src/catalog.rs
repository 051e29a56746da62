//! Read-only file catalog over the repository directory.

use crate::error::CatalogError;
use crate::protocol::trim_line_ending;
use std::path::{Component, Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

/// View over a single flat directory of files.
///
/// Nothing is cached; every call goes back to the filesystem.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    root: PathBuf,
}

impl FileCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Names of the regular files directly inside the repository, sorted.
    ///
    /// A missing or unreadable directory lists as empty.
    pub async fn list(&self) -> Vec<String> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(repository = %self.root.display(), error = %e, "Cannot read repository");
                return Vec::new();
            }
        };

        let mut names = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(repository = %self.root.display(), error = %e, "Repository listing interrupted");
                    break;
                }
            };
            // Follow symlinks so a link to a regular file is listed like one.
            let is_file = tokio::fs::metadata(entry.path())
                .await
                .map(|m| m.is_file())
                .unwrap_or(false);
            if is_file {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        names
    }

    /// Open `name` for line-by-line streaming.
    pub async fn open(&self, name: &str) -> Result<FileLines, CatalogError> {
        let path = self
            .resolve(name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(CatalogError::NotFound(name.to_string())),
        }

        let file = File::open(&path).await.map_err(|source| CatalogError::Read {
            name: name.to_string(),
            source,
        })?;
        Ok(FileLines::new(name, file))
    }

    /// Map a requested name to a path directly under the root.
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => Some(self.root.join(part)),
            _ => None,
        }
    }
}

/// Lines of one catalog file, read lazily in file order.
///
/// Bytes that are not valid UTF-8 are replaced rather than failing the read.
pub struct FileLines {
    name: String,
    reader: BufReader<File>,
}

impl FileLines {
    fn new(name: &str, file: File) -> Self {
        Self {
            name: name.to_string(),
            reader: BufReader::new(file),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next line without its terminator, or `None` at end of file.
    pub async fn next_line(&mut self) -> Result<Option<String>, CatalogError> {
        let mut buf = Vec::new();
        let read = self
            .reader
            .read_until(b'\n', &mut buf)
            .await
            .map_err(|source| CatalogError::Read {
                name: self.name.clone(),
                source,
            })?;
        if read == 0 {
            return Ok(None);
        }
        trim_line_ending(&mut buf);
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    async fn collect(mut lines: FileLines) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(line) = lines.next_line().await.expect("readable") {
            out.push(line);
        }
        out
    }

    #[tokio::test]
    async fn list_skips_directories() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("file2.txt"), "two").expect("write");
        fs::write(dir.path().join("file1.txt"), "one").expect("write");
        fs::create_dir(dir.path().join("nested")).expect("mkdir");
        fs::write(dir.path().join("nested").join("inner.txt"), "x").expect("write");

        let catalog = FileCatalog::new(dir.path());
        assert_eq!(catalog.list().await, vec!["file1.txt", "file2.txt"]);
    }

    #[tokio::test]
    async fn list_missing_repository_is_empty() {
        let dir = TempDir::new().expect("tempdir");
        let catalog = FileCatalog::new(dir.path().join("absent"));
        assert!(catalog.list().await.is_empty());
    }

    #[tokio::test]
    async fn list_sees_new_files() {
        let dir = TempDir::new().expect("tempdir");
        let catalog = FileCatalog::new(dir.path());
        assert!(catalog.list().await.is_empty());
        fs::write(dir.path().join("late.txt"), "x").expect("write");
        assert_eq!(catalog.list().await, vec!["late.txt"]);
    }

    #[tokio::test]
    async fn open_reads_lines_in_order() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("notes.txt"), "alpha\r\nbeta\n\ngamma").expect("write");
        let catalog = FileCatalog::new(dir.path());
        let lines = catalog.open("notes.txt").await.expect("open");
        assert_eq!(lines.name(), "notes.txt");
        assert_eq!(collect(lines).await, vec!["alpha", "beta", "", "gamma"]);
    }

    #[tokio::test]
    async fn open_empty_file_yields_nothing() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("empty.txt"), "").expect("write");
        let catalog = FileCatalog::new(dir.path());
        let lines = catalog.open("empty.txt").await.expect("open");
        assert!(collect(lines).await.is_empty());
    }

    #[tokio::test]
    async fn open_rejects_missing_and_non_files() {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir(dir.path().join("nested")).expect("mkdir");
        fs::write(dir.path().join("nested").join("inner.txt"), "x").expect("write");
        let catalog = FileCatalog::new(dir.path());

        for name in ["missing.txt", "nested", "nested/inner.txt", "../etc", "", "."] {
            assert!(
                matches!(catalog.open(name).await, Err(CatalogError::NotFound(_))),
                "{name:?} should not resolve"
            );
        }
    }

    #[tokio::test]
    async fn non_utf8_lines_are_still_streamed() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("menu.txt"), b"caf\xe9\nsecond line\n").expect("write");
        let catalog = FileCatalog::new(dir.path());
        let lines = catalog.open("menu.txt").await.expect("open");
        assert_eq!(collect(lines).await, vec!["caf\u{FFFD}", "second line"]);
    }

    #[tokio::test]
    async fn io_failure_is_a_read_error() {
        let dir = TempDir::new().expect("tempdir");
        // Opening a directory succeeds on Unix; reading from it does not.
        let handle = File::open(dir.path()).await.expect("open directory");
        let mut lines = FileLines::new("dir", handle);
        assert!(matches!(
            lines.next_line().await,
            Err(CatalogError::Read { .. })
        ));
    }
}
