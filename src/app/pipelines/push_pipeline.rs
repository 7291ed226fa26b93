use crate::adapters::supabase::{InsertOutcome, SupabaseClient};
use crate::app::pipelines::scan::load_catalog;
use crate::config::toml_config::TomlConfig;
use crate::core::{Pipeline, Record, Storage};
use crate::utils::error::Result;
use std::time::Duration;

/// 透過 REST API 插入新試卷；已存在的列視為成功
pub struct PushPipeline<S: Storage> {
    storage: S,
    config: TomlConfig,
    client: SupabaseClient,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PushReport {
    pub inserted: Vec<String>,
    pub duplicates: Vec<String>,
    pub failed: Vec<String>,
}

impl<S: Storage> PushPipeline<S> {
    pub fn new(storage: S, config: TomlConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.upload.timeout_seconds());
        let client = SupabaseClient::new(config.require_remote()?, timeout)?;
        Ok(Self {
            storage,
            config,
            client,
        })
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for PushPipeline<S> {
    type Extracted = Vec<Record>;
    type Transformed = PushReport;

    fn name(&self) -> &str {
        "push"
    }

    /// 以新試卷檔列出的 paper_id 從目錄取出完整記錄 (含 id 與時間戳)
    async fn extract(&self) -> Result<Vec<Record>> {
        let catalog = load_catalog(&self.storage, &self.config).await?;
        let bytes = self
            .storage
            .read_file(self.config.new_papers_file()?)
            .await?;
        let new_papers: Vec<Record> = serde_json::from_slice(&bytes)?;

        let mut rows = Vec::with_capacity(new_papers.len());
        for paper in &new_papers {
            match catalog.get(&paper.paper_id) {
                Some(record) => rows.push(record.clone()),
                None => tracing::warn!("⏭️ {} not in catalog, run import first", paper.paper_id),
            }
        }
        Ok(rows)
    }

    async fn transform(&self, rows: Vec<Record>) -> Result<PushReport> {
        let mut report = PushReport::default();

        for record in rows {
            let row = serde_json::to_value(&record)?;
            match self.client.insert_row(&row).await {
                Ok(InsertOutcome::Inserted) => {
                    tracing::info!("  ✅ {}", record.paper_id);
                    report.inserted.push(record.paper_id);
                }
                Ok(InsertOutcome::Duplicate) => {
                    tracing::info!("  ⏭️ {} (already exists)", record.paper_id);
                    report.duplicates.push(record.paper_id);
                }
                Err(e) => {
                    tracing::error!("  ❌ {}: {}", record.paper_id, e);
                    report.failed.push(record.paper_id);
                }
            }
        }

        Ok(report)
    }

    async fn load(&self, report: PushReport) -> Result<String> {
        let summary = format!(
            "{} inserted, {} already present, {} failed",
            report.inserted.len(),
            report.duplicates.len(),
            report.failed.len()
        );
        tracing::info!("📊 {}", summary);
        Ok(summary)
    }
}
