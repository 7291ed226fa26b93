use crate::config::toml_config::TomlConfig;
use crate::core::Storage;
use crate::utils::error::{EtlError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
pub(crate) struct MockStorage {
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MockStorage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn put(&self, path: &str, data: &[u8]) {
        let mut files = self.files.lock().await;
        files.insert(path.to_string(), data.to_vec());
    }

    /// 建立 page-01.webp .. page-NN.webp
    pub(crate) async fn put_images(&self, dir: &str, count: usize) {
        for i in 1..=count {
            self.put(&format!("{}/page-{:02}.webp", dir, i), format!("img{}", i).as_bytes())
                .await;
        }
    }

    pub(crate) async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned()
    }
}

impl Storage for MockStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let files = self.files.lock().await;
        files.get(path).cloned().ok_or_else(|| {
            EtlError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path),
            ))
        })
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut files = self.files.lock().await;
        files.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        let files = self.files.lock().await;
        files.contains_key(path)
    }

    async fn list_files(&self, dir: &str, extension: &str) -> Result<Option<Vec<String>>> {
        let files = self.files.lock().await;
        let prefix = format!("{}/", dir);
        let suffix = format!(".{}", extension);

        let mut found = false;
        let mut names = Vec::new();
        for path in files.keys() {
            if let Some(name) = path.strip_prefix(&prefix) {
                found = true;
                if !name.contains('/') && name.ends_with(&suffix) {
                    names.push(name.to_string());
                }
            }
        }

        Ok(found.then_some(names))
    }
}

pub(crate) fn sample_config() -> TomlConfig {
    TomlConfig::from_toml_str(
        r#"
[paths]
catalog = "data/pastpaper_papers.json"
images_dir = "data/images"
output_dir = "data"
new_papers = "data/new_papers.json"
preview_image_base = "file:///srv/images"

[[years]]
year = 2016
folder = "2016"

[[years]]
year = 2012
folder = "2012"

[[years]]
year = 2013
folder = "2013"

[[special_folders]]
prefix = "2012practice"
folder = "2012-practice"
year = 2012

[remote]
base_url = "http://127.0.0.1:9"
service_key = "test-key"
"#,
    )
    .expect("sample config parses")
}
