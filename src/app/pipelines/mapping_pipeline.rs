use crate::app::pipelines::scan::{reconcile_all, scan_inputs, FolderOutcome, ScannedInput};
use crate::config::toml_config::TomlConfig;
use crate::core::{MappingEntry, Pipeline, Storage};
use crate::utils::error::{EtlError, Result};

/// 產生 paper_page_mapping.json
pub struct MappingPipeline<S: Storage> {
    storage: S,
    config: TomlConfig,
    write_csv: bool,
}

#[derive(Debug, Clone)]
pub struct MappingResult {
    pub outcomes: Vec<FolderOutcome>,
    pub entries: Vec<MappingEntry>,
}

impl<S: Storage> MappingPipeline<S> {
    pub fn new(storage: S, config: TomlConfig) -> Self {
        Self {
            storage,
            config,
            write_csv: false,
        }
    }

    pub fn with_csv(mut self, write_csv: bool) -> Self {
        self.write_csv = write_csv;
        self
    }

    fn csv_path(&self) -> String {
        let json_path = self.config.mapping_file();
        match json_path.strip_suffix(".json") {
            Some(stem) => format!("{}.csv", stem),
            None => format!("{}.csv", json_path),
        }
    }
}

pub fn mapping_to_csv(entries: &[MappingEntry]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer.into_inner().map_err(|e| EtlError::ProcessingError {
        message: format!("CSV flush failed: {}", e),
    })
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for MappingPipeline<S> {
    type Extracted = ScannedInput;
    type Transformed = MappingResult;

    fn name(&self) -> &str {
        "mapping"
    }

    async fn extract(&self) -> Result<ScannedInput> {
        scan_inputs(&self.storage, &self.config).await
    }

    async fn transform(&self, data: ScannedInput) -> Result<MappingResult> {
        let outcomes = reconcile_all(&data, &self.config)?;
        let entries = outcomes
            .iter()
            .flat_map(|outcome| outcome.alignment.matched.iter().cloned())
            .collect();
        Ok(MappingResult { outcomes, entries })
    }

    async fn load(&self, result: MappingResult) -> Result<String> {
        let output_path = self.config.mapping_file();
        let json = serde_json::to_string_pretty(&result.entries)?;
        self.storage.write_file(&output_path, json.as_bytes()).await?;

        if self.write_csv {
            let csv_path = self.csv_path();
            let csv_data = mapping_to_csv(&result.entries)?;
            self.storage.write_file(&csv_path, &csv_data).await?;
            tracing::info!("📄 CSV copy saved to {}", csv_path);
        }

        let unmatched: usize = result
            .outcomes
            .iter()
            .map(|o| o.alignment.unmatched_images.len())
            .sum();
        tracing::info!(
            "📊 Generated {} mappings ({} images without a catalog record) -> {}",
            result.entries.len(),
            unmatched,
            output_path
        );
        Ok(output_path)
    }
}
