use crate::adapters::supabase::{is_retryable, SupabaseClient};
use crate::app::pipelines::page_images_pipeline::load_filtered_mapping;
use crate::config::toml_config::{TomlConfig, UploadConfig};
use crate::core::folders::{group_by_paper, PaperImages};
use crate::core::{Pipeline, Storage};
use crate::utils::error::Result;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// 已上傳圖片 -> 公開網址
pub type Checkpoint = BTreeMap<String, String>;

/// 上傳圖片到物件儲存，可中斷後續傳，最後更新每份試卷的 page_images
pub struct UploadPipeline<S: Storage> {
    storage: S,
    config: TomlConfig,
    client: SupabaseClient,
}

pub struct UploadInput {
    pub papers: Vec<PaperImages>,
    pub checkpoint: Checkpoint,
    pub todo: Vec<String>,
}

#[derive(Debug)]
pub struct UploadReport {
    pub papers: Vec<PaperImages>,
    pub checkpoint: Checkpoint,
    pub uploaded: usize,
    pub resumed: usize,
    pub failed: Vec<String>,
}

/// 第 attempt 次重試前的等待時間：backoff * 2^(attempt-1)
pub fn backoff_delay(backoff_ms: u64, attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(backoff_ms.saturating_mul(factor))
}

impl<S: Storage> UploadPipeline<S> {
    pub fn new(storage: S, config: TomlConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.upload.timeout_seconds());
        let client = SupabaseClient::new(config.require_remote()?, timeout)?;
        Ok(Self {
            storage,
            config,
            client,
        })
    }

    fn settings(&self) -> &UploadConfig {
        &self.config.upload
    }

    async fn read_checkpoint(&self) -> Result<Checkpoint> {
        let path = self.config.checkpoint_file();
        if !self.storage.exists(&path).await {
            return Ok(Checkpoint::new());
        }
        let bytes = self.storage.read_file(&path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        let json = serde_json::to_string_pretty(checkpoint)?;
        self.storage
            .write_file(&self.config.checkpoint_file(), json.as_bytes())
            .await
    }

    async fn upload_with_retry(&self, image: &str, body: Vec<u8>) -> Result<String> {
        let max_retries = self.settings().max_retries();
        let mut attempt = 0;

        loop {
            match self.client.upload_object(image, body.clone()).await {
                Ok(url) => return Ok(url),
                Err(e) if attempt < max_retries && is_retryable(&e) => {
                    attempt += 1;
                    let delay = backoff_delay(self.settings().retry_backoff_ms(), attempt);
                    tracing::warn!(
                        "🔄 {} failed ({}), retry {}/{} in {:?}",
                        image,
                        e,
                        attempt,
                        max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn upload_one(&self, image: String) -> (String, Result<String>) {
        let local_path = self.config.image_folder(&image);
        let result = match self.storage.read_file(&local_path).await {
            Ok(body) => self.upload_with_retry(&image, body).await,
            Err(e) => Err(e),
        };
        (image, result)
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for UploadPipeline<S> {
    type Extracted = UploadInput;
    type Transformed = UploadReport;

    fn name(&self) -> &str {
        "upload"
    }

    async fn extract(&self) -> Result<UploadInput> {
        let entries = load_filtered_mapping(&self.storage, &self.config).await?;
        let checkpoint = self.read_checkpoint().await?;

        let all_images: BTreeSet<String> = entries.iter().map(|e| e.image.clone()).collect();
        let todo: Vec<String> = all_images
            .iter()
            .filter(|image| !checkpoint.contains_key(*image))
            .cloned()
            .collect();
        tracing::info!(
            "🗂️ {} unique images, {} already uploaded, {} to go",
            all_images.len(),
            all_images.len() - todo.len(),
            todo.len()
        );

        Ok(UploadInput {
            papers: group_by_paper(&entries),
            checkpoint,
            todo,
        })
    }

    async fn transform(&self, input: UploadInput) -> Result<UploadReport> {
        let UploadInput {
            papers,
            mut checkpoint,
            todo,
        } = input;
        let resumed = checkpoint.len();
        let total = todo.len();
        let flush_every = self.settings().checkpoint_every().max(1);

        let mut uploads = stream::iter(todo.into_iter().map(|image| self.upload_one(image)))
            .buffer_unordered(self.settings().concurrency().max(1));

        let mut uploaded = 0;
        let mut since_flush = 0;
        let mut failed = Vec::new();
        while let Some((image, result)) = uploads.next().await {
            match result {
                Ok(url) => {
                    checkpoint.insert(image, url);
                    uploaded += 1;
                    since_flush += 1;
                    if since_flush >= flush_every {
                        self.write_checkpoint(&checkpoint).await?;
                        since_flush = 0;
                        tracing::info!("  {}/{} uploaded", uploaded, total);
                    }
                }
                Err(e) => {
                    tracing::error!("❌ {}: {}", image, e);
                    failed.push(image);
                }
            }
        }
        failed.sort();

        Ok(UploadReport {
            papers,
            checkpoint,
            uploaded,
            resumed,
            failed,
        })
    }

    async fn load(&self, report: UploadReport) -> Result<String> {
        self.write_checkpoint(&report.checkpoint).await?;

        let mut updated = 0;
        let mut patch_failed = 0;
        for paper in &report.papers {
            let Some(db_id) = &paper.db_id else {
                tracing::warn!("⏭️ {} has no database id, not updated", paper.paper_id);
                continue;
            };
            let urls: Vec<String> = paper
                .images
                .iter()
                .filter_map(|image| report.checkpoint.get(image).cloned())
                .collect();
            if urls.is_empty() {
                continue;
            }

            match self.client.update_page_images(db_id, &urls).await {
                Ok(()) => updated += 1,
                Err(e) => {
                    tracing::error!("❌ Update {} failed: {}", paper.paper_id, e);
                    patch_failed += 1;
                }
            }
        }

        tracing::info!(
            "📊 Uploaded {} (resumed {}), failed {}, updated {} papers ({} update failures)",
            report.uploaded,
            report.resumed,
            report.failed.len(),
            updated,
            patch_failed
        );
        Ok(self.config.checkpoint_file())
    }
}
