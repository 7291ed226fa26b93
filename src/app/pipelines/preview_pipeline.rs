use crate::config::toml_config::TomlConfig;
use crate::core::{MappingEntry, Pipeline, Storage};
use crate::output::html::render_mapping_preview;
use crate::utils::error::Result;

/// 將 paper_page_mapping.json 轉成可人工核對的 HTML
pub struct PreviewPipeline<S: Storage> {
    storage: S,
    config: TomlConfig,
}

impl<S: Storage> PreviewPipeline<S> {
    pub fn new(storage: S, config: TomlConfig) -> Self {
        Self { storage, config }
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for PreviewPipeline<S> {
    type Extracted = Vec<MappingEntry>;
    type Transformed = String;

    fn name(&self) -> &str {
        "preview"
    }

    async fn extract(&self) -> Result<Vec<MappingEntry>> {
        let bytes = self.storage.read_file(&self.config.mapping_file()).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn transform(&self, entries: Vec<MappingEntry>) -> Result<String> {
        Ok(render_mapping_preview(
            &entries,
            &self.config.preview_image_base(),
        ))
    }

    async fn load(&self, html: String) -> Result<String> {
        let output_path = self.config.output_file("mapping_preview.html");
        self.storage.write_file(&output_path, html.as_bytes()).await?;
        tracing::info!("🖼️ Preview written to {}", output_path);
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipelines::test_support::{sample_config, MockStorage};
    use crate::core::etl::EtlEngine;
    use crate::utils::error::EtlError;

    #[tokio::test]
    async fn test_preview_renders_mapping_file() {
        let storage = MockStorage::new();
        let mapping = serde_json::json!([
            {"paper_id": "2016-1.1", "db_id": "a", "year": 2016, "paper_number": "1.1",
             "topic": "Sports", "image": "2016/page-01.webp"}
        ]);
        storage
            .put("data/paper_page_mapping.json", mapping.to_string().as_bytes())
            .await;

        let engine = EtlEngine::new(PreviewPipeline::new(storage.clone(), sample_config()));
        let path = engine.run().await.unwrap();
        assert_eq!(path, "data/mapping_preview.html");

        let html = String::from_utf8(storage.get_file(&path).await.unwrap()).unwrap();
        assert!(html.contains("2016-1.1 &mdash; 1.1"));
        assert!(html.contains("file:///srv/images/2016/page-01.webp"));
    }

    #[tokio::test]
    async fn test_preview_without_mapping_fails() {
        let pipeline = PreviewPipeline::new(MockStorage::new(), sample_config());
        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, EtlError::IoError(_)));
    }
}
