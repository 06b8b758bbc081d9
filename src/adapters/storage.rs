use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = Path::new(&self.base_path).join(path);
        tracing::debug!("Reading {}", full_path.display());
        let data = fs::read(full_path)?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::AnalyzerError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_relative_to_base_path() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("datos.csv"), b"a,b\n1,2\n").unwrap();

        let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());
        let data = storage.read_file("datos.csv").await.unwrap();

        assert_eq!(data, b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());

        let result = storage.read_file("nope.csv").await;
        assert!(matches!(result, Err(AnalyzerError::IoError(_))));
    }
}
