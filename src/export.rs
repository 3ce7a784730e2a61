use crate::error::PersistenceError;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Destination for exported documents and backups.
#[cfg_attr(test, mockall::automock)]
pub trait ExportSink: Send + Sync {
    /// Write `contents` under `filename`, returning where it ended up.
    fn export(&self, filename: &str, contents: &str) -> Result<String, PersistenceError>;
}

/// Writes exports as files into a directory.
#[derive(Debug, Clone)]
pub struct FileExportSink {
    dir: Utf8PathBuf,
}

impl FileExportSink {
    pub fn new<P: AsRef<Utf8Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }
}

impl ExportSink for FileExportSink {
    fn export(&self, filename: &str, contents: &str) -> Result<String, PersistenceError> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename.starts_with('.') {
            return Err(PersistenceError::Unavailable(format!(
                "invalid export filename '{filename}'"
            )));
        }

        fs::create_dir_all(&self.dir).map_err(|e| PersistenceError::Io {
            operation: "create directory",
            key: self.dir.to_string(),
            source: e,
        })?;

        let path = self.dir.join(filename);
        fs::write(&path, contents).map_err(|e| PersistenceError::Io {
            operation: "export",
            key: path.to_string(),
            source: e,
        })?;

        tracing::info!("Exported {} ({} bytes)", path, contents.len());
        Ok(path.into_string())
    }
}
