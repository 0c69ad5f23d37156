use crate::model::SourceError;
use crate::source::traits::{DatasetSource, SourceFile};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

const SUPPORTED_EXTENSIONS: [&str; 2] = ["csv", "txt"];

/// Reads a delimited text export of the bid spreadsheet from disk.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SourceError {
        SourceError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn check_format(&self) -> Result<(), SourceError> {
        let extension = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            Ok(())
        } else {
            Err(SourceError::UnsupportedFormat(self.path.display().to_string()))
        }
    }
}

#[async_trait::async_trait]
impl DatasetSource for FileSource {
    async fn fetch(&self) -> Result<SourceFile, SourceError> {
        self.check_format()?;
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        let modified = self.modified().await?;
        debug!("Read {} bytes from {}", content.len(), self.path.display());

        Ok(SourceFile {
            path: self.path.clone(),
            content,
            modified,
        })
    }

    async fn modified(&self) -> Result<Option<DateTime<Utc>>, SourceError> {
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        Ok(metadata.modified().ok().map(DateTime::<Utc>::from))
    }
}
