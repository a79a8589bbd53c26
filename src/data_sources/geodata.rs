//! Public geodata snapshot.
//!
//! A snapshot is a JSON file of [`SourceRecord`]s generated out of band and
//! read in-process on every sync pass, so a refreshed file is picked up
//! without a restart.

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::SourceBatch;
use crate::error::SourceError;

/// Location of a geodata snapshot file.
#[derive(Debug, Clone)]
pub struct GeodataSnapshot {
    path: PathBuf,
}

impl GeodataSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the snapshot. Entries are decoded one by one.
    pub async fn load(&self) -> Result<SourceBatch, SourceError> {
        let json = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.display().to_string(),
                source,
            })?;

        let values: Vec<Value> = serde_json::from_str(&json)?;
        Ok(SourceBatch::from_values(values))
    }
}
