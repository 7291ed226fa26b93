use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        Path::new(&self.base_path).join(path)
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = fs::read(self.resolve(path))?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    async fn list_files(&self, dir: &str, extension: &str) -> Result<Option<Vec<String>>> {
        let full_path = self.resolve(dir);
        if !full_path.is_dir() {
            return Ok(None);
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&full_path)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                files.push(name.to_string());
            }
        }

        files.sort();
        Ok(Some(files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_list_files_filters_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());

        for name in ["page-10.webp", "page-02.webp", "notes.txt", "page-01.webp"] {
            storage
                .write_file(&format!("images/2016/{}", name), b"x")
                .await
                .unwrap();
        }

        let files = storage.list_files("images/2016", "webp").await.unwrap();
        assert_eq!(
            files,
            Some(vec![
                "page-01.webp".to_string(),
                "page-02.webp".to_string(),
                "page-10.webp".to_string()
            ])
        );
        assert_eq!(storage.list_files("images/2099", "webp").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_then_read_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().to_str().unwrap().to_string());

        storage.write_file("out/nested/a.json", b"[]").await.unwrap();
        assert!(storage.exists("out/nested/a.json").await);
        assert_eq!(storage.read_file("out/nested/a.json").await.unwrap(), b"[]");
    }
}
