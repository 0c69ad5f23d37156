use crate::model::SourceError;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Raw content of one uploaded dataset file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
    pub modified: Option<DateTime<Utc>>,
}

#[async_trait::async_trait]
pub trait DatasetSource: Send + Sync {
    async fn fetch(&self) -> Result<SourceFile, SourceError>;

    /// Last modification time, used to skip unchanged sources in watch mode.
    async fn modified(&self) -> Result<Option<DateTime<Utc>>, SourceError>;
}
