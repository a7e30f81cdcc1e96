use std::fs;
use std::io;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::errors::{AppError, AppResult};

/// Raw records of the static review export, read once at startup.
#[derive(Debug, Clone, Default)]
pub struct LocalDataset {
    records: Vec<Value>,
}

impl LocalDataset {
    /// A missing file yields an empty dataset; a file that is not a JSON
    /// array is rejected.
    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(
                    target: "dataset",
                    path = %path.display(),
                    "review dataset missing; serving no local reviews"
                );
                return Ok(Self::default());
            }
            Err(err) => return Err(AppError::Io(err)),
        };

        match serde_json::from_str::<Value>(&contents)? {
            Value::Array(records) => {
                info!(target: "dataset", path = %path.display(), records = records.len(), "review dataset loaded");
                Ok(Self { records })
            }
            _ => Err(AppError::Config(format!(
                "review dataset at {} must be a JSON array",
                path.display()
            ))),
        }
    }

    pub fn from_records(records: Vec<Value>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Value] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let dataset = LocalDataset::load(&dir.path().join("absent.json")).unwrap();
        assert!(dataset.is_empty());
    }

    #[test]
    fn loads_array_of_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mock_reviews.json");
        fs::write(&path, r#"[{"result": {"id": 1}}, {"result": {"id": 2}}]"#).unwrap();
        let dataset = LocalDataset::load(&path).unwrap();
        assert_eq!(dataset.len(), 2);
    }

    #[test]
    fn rejects_non_array_documents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mock_reviews.json");
        fs::write(&path, r#"{"result": {"id": 1}}"#).unwrap();
        assert!(matches!(LocalDataset::load(&path), Err(AppError::Config(_))));

        fs::write(&path, "[{").unwrap();
        assert!(matches!(LocalDataset::load(&path), Err(AppError::Json(_))));
    }
}
