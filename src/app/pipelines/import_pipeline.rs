use crate::app::pipelines::scan::load_catalog;
use crate::config::toml_config::TomlConfig;
use crate::core::catalog::{Catalog, MergeOutcome};
use crate::core::{Pipeline, Record, Storage};
use crate::output::sql::{insert_statement, insert_transaction};
use crate::utils::error::Result;
use chrono::Utc;

/// 將新試卷合併進目錄，並產生對應的 INSERT SQL
pub struct ImportPipeline<S: Storage> {
    storage: S,
    config: TomlConfig,
    split: bool,
}

#[derive(Debug)]
pub struct ImportInput {
    pub catalog: Catalog,
    pub new_papers: Vec<Record>,
}

#[derive(Debug)]
pub struct ImportResult {
    pub catalog: Catalog,
    pub outcome: MergeOutcome,
}

impl<S: Storage> ImportPipeline<S> {
    pub fn new(storage: S, config: TomlConfig) -> Self {
        Self {
            storage,
            config,
            split: false,
        }
    }

    /// 另外把每筆 INSERT 寫成獨立檔案，供一次只能執行一句的工具使用
    pub fn with_split(mut self, split: bool) -> Self {
        self.split = split;
        self
    }

    fn table(&self) -> &str {
        self.config
            .remote
            .as_ref()
            .map(|remote| remote.table())
            .unwrap_or("pastpaper_papers")
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for ImportPipeline<S> {
    type Extracted = ImportInput;
    type Transformed = ImportResult;

    fn name(&self) -> &str {
        "import"
    }

    async fn extract(&self) -> Result<ImportInput> {
        let catalog = load_catalog(&self.storage, &self.config).await?;
        let new_papers_path = self.config.new_papers_file()?;
        let bytes = self.storage.read_file(new_papers_path).await?;
        let new_papers: Vec<Record> = serde_json::from_slice(&bytes)?;
        tracing::info!("📥 {} new papers in {}", new_papers.len(), new_papers_path);
        Ok(ImportInput {
            catalog,
            new_papers,
        })
    }

    async fn transform(&self, input: ImportInput) -> Result<ImportResult> {
        let ImportInput {
            mut catalog,
            new_papers,
        } = input;
        let outcome = catalog.merge_new(new_papers, Utc::now());

        for paper_id in &outcome.skipped {
            tracing::info!("  SKIP {} (already exists)", paper_id);
        }
        for paper_id in &outcome.added {
            tracing::info!("  ADD {}", paper_id);
        }
        Ok(ImportResult { catalog, outcome })
    }

    async fn load(&self, result: ImportResult) -> Result<String> {
        let catalog_json = result.catalog.to_json_pretty()?;
        self.storage
            .write_file(&self.config.paths.catalog, catalog_json.as_bytes())
            .await?;
        tracing::info!(
            "💾 Catalog now has {} records ({} added, {} skipped)",
            result.catalog.len(),
            result.outcome.added.len(),
            result.outcome.skipped.len()
        );

        let added: Vec<&Record> = result
            .outcome
            .added
            .iter()
            .filter_map(|paper_id| result.catalog.get(paper_id))
            .collect();
        let sql = insert_transaction(self.table(), added.iter().copied());
        let sql_path = self.config.output_file("insert_new_papers.sql");
        self.storage.write_file(&sql_path, sql.as_bytes()).await?;
        tracing::info!("📝 SQL written to {}", sql_path);

        if self.split {
            for (i, record) in added.iter().enumerate() {
                let statement = format!("{};\n", insert_statement(self.table(), record));
                let path = self.config.output_file(&format!(
                    "insert_new_papers/{:03}_{}.sql",
                    i + 1,
                    record.paper_id
                ));
                self.storage.write_file(&path, statement.as_bytes()).await?;
            }
            tracing::info!(
                "📝 {} statement files written to {}",
                added.len(),
                self.config.output_file("insert_new_papers")
            );
        }

        Ok(sql_path)
    }
}
