use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

use super::DataStore;
use crate::error::AppError;
use crate::models::Record;

/// Records exported as a JSON array of [`Record`] objects.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DataStore for JsonFileStore {
    async fn load_records(&self) -> Result<Vec<Record>, AppError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<Record> = serde_json::from_str(&raw)?;
        info!("Loaded {} records from {}", records.len(), self.path.display());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IssueCategory, SatisfactionLevel, SurveyResponse};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_loads_records_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");
        let records = vec![
            Record::new("1", "Ana", "Centro", "+55 11 90000-0000").with_survey(SurveyResponse::new(
                IssueCategory::Transport,
                SatisfactionLevel::Dissatisfied,
            )),
            Record::new("2", "Bruno", "Vila Nova", "+55 11 90000-0000"),
        ];
        std::fs::write(&path, serde_json::to_string(&records).unwrap()).unwrap();

        let store = JsonFileStore::new(&path);
        let loaded = store.load_records().await.unwrap();

        assert_eq!(loaded, records);
    }

    #[tokio::test]
    async fn test_empty_file_is_no_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, "").unwrap();

        let loaded = JsonFileStore::new(&path).load_records().await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));

        assert!(matches!(store.load_records().await, Err(AppError::Io(_))));
    }
}
