use crate::config::toml_config::TomlConfig;
use crate::core::folders::{group_by_paper, FolderResolver, PaperImages};
use crate::core::{MappingEntry, Pipeline, Storage};
use crate::output::sql::page_images_update;
use crate::utils::error::Result;

/// 由對應檔產生更新 page_images 欄位的 SQL
pub struct PageImagesSqlPipeline<S: Storage> {
    storage: S,
    config: TomlConfig,
}

impl<S: Storage> PageImagesSqlPipeline<S> {
    pub fn new(storage: S, config: TomlConfig) -> Self {
        Self { storage, config }
    }

    fn table(&self) -> &str {
        self.config
            .remote
            .as_ref()
            .map(|remote| remote.table())
            .unwrap_or("pastpaper_papers")
    }

    fn public_base(&self) -> &str {
        self.config
            .remote
            .as_ref()
            .map(|remote| remote.public_base())
            .unwrap_or("/paper-images")
    }
}

/// 讀取對應檔並丟棄資料夾不符的對應
pub(crate) async fn load_filtered_mapping<S: Storage>(
    storage: &S,
    config: &TomlConfig,
) -> Result<Vec<MappingEntry>> {
    let path = config.mapping_file();
    let bytes = storage.read_file(&path).await?;
    let entries: Vec<MappingEntry> = serde_json::from_slice(&bytes)?;

    let (kept, dropped) = FolderResolver::from_config(config).filter_mapping(entries);
    if dropped > 0 {
        tracing::warn!("⚠️ Dropped {} mappings pointing at the wrong folder", dropped);
    }
    tracing::info!("📄 {} mappings loaded from {}", kept.len(), path);
    Ok(kept)
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for PageImagesSqlPipeline<S> {
    type Extracted = Vec<MappingEntry>;
    type Transformed = Vec<String>;

    fn name(&self) -> &str {
        "page-images-sql"
    }

    async fn extract(&self) -> Result<Vec<MappingEntry>> {
        load_filtered_mapping(&self.storage, &self.config).await
    }

    async fn transform(&self, entries: Vec<MappingEntry>) -> Result<Vec<String>> {
        let base = self.public_base().trim_end_matches('/');
        let mut statements = Vec::new();

        for PaperImages {
            paper_id,
            db_id,
            images,
        } in group_by_paper(&entries)
        {
            let Some(db_id) = db_id else {
                tracing::warn!("⏭️ {} has no database id, skipped", paper_id);
                continue;
            };
            let urls: Vec<String> = images
                .iter()
                .map(|image| format!("{}/{}", base, image))
                .collect();
            statements.push(page_images_update(self.table(), &db_id, &urls));
        }

        Ok(statements)
    }

    async fn load(&self, statements: Vec<String>) -> Result<String> {
        let mut sql = statements.join("\n");
        sql.push('\n');

        let output_path = self.config.output_file("update_page_images.sql");
        self.storage.write_file(&output_path, sql.as_bytes()).await?;
        tracing::info!(
            "📝 {} UPDATE statements written to {}",
            statements.len(),
            output_path
        );
        Ok(output_path)
    }
}
