use crate::app::pipelines::scan::{reconcile_all, scan_inputs, ScannedInput};
use crate::config::toml_config::TomlConfig;
use crate::core::{Pipeline, Storage};
use crate::output::html::{render_missing_grid, MissingCard};
use crate::utils::error::Result;
use serde_json::{json, Value};

/// 收集有圖片但沒有目錄記錄的試卷，輸出補錄範本與 HTML 清單
pub struct MissingPipeline<S: Storage> {
    storage: S,
    config: TomlConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingPaper {
    pub label: String,
    pub year: i32,
    pub paper_number: String,
    pub image: String,
}

impl<S: Storage> MissingPipeline<S> {
    pub fn new(storage: S, config: TomlConfig) -> Self {
        Self { storage, config }
    }
}

pub fn backfill_template(missing: &[MissingPaper]) -> Value {
    let question = |number: u32| {
        json!({
            "text": format!("TODO: question {}", number),
            "number": number,
            "difficulty": "medium",
            "difficulty_level": "4-6",
        })
    };

    Value::Array(
        missing
            .iter()
            .map(|paper| {
                json!({
                    "year": paper.year,
                    "paper_number": paper.paper_number,
                    "paper_id": paper.label,
                    "topic": "TODO: fill in topic",
                    "part_a_title": "TODO",
                    "part_a_source": "Unknown source",
                    "part_a_article": ["TODO: paste article text here"],
                    "part_a_discussion_points": [
                        "TODO: discussion point 1",
                        "TODO: discussion point 2",
                        "TODO: discussion point 3",
                        "TODO: discussion point 4",
                    ],
                    "part_b_questions": [question(1), question(2)],
                })
            })
            .collect(),
    )
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for MissingPipeline<S> {
    type Extracted = ScannedInput;
    type Transformed = Vec<MissingPaper>;

    fn name(&self) -> &str {
        "missing"
    }

    async fn extract(&self) -> Result<ScannedInput> {
        scan_inputs(&self.storage, &self.config).await
    }

    async fn transform(&self, data: ScannedInput) -> Result<Vec<MissingPaper>> {
        let outcomes = reconcile_all(&data, &self.config)?;
        let missing: Vec<MissingPaper> = outcomes
            .iter()
            .flat_map(|outcome| {
                outcome
                    .alignment
                    .unmatched_images
                    .iter()
                    .map(move |unmatched| MissingPaper {
                        label: format!("{}-{}", outcome.label, unmatched.position),
                        year: outcome.year,
                        paper_number: unmatched.position.clone(),
                        image: unmatched.image.clone(),
                    })
            })
            .collect();

        for paper in &missing {
            tracing::info!("  {}", paper.label);
        }
        Ok(missing)
    }

    async fn load(&self, missing: Vec<MissingPaper>) -> Result<String> {
        if missing.is_empty() {
            tracing::info!("✅ No missing papers found!");
            return Ok(String::new());
        }

        let template_path = self.config.output_file("missing_papers_template.json");
        let template = serde_json::to_string_pretty(&backfill_template(&missing))?;
        self.storage
            .write_file(&template_path, template.as_bytes())
            .await?;

        let cards: Vec<MissingCard> = missing
            .iter()
            .map(|paper| MissingCard {
                label: paper.label.clone(),
                image: paper.image.clone(),
            })
            .collect();
        let html_path = self.config.output_file("missing_papers.html");
        let html = render_missing_grid(&cards, &self.config.preview_image_base());
        self.storage.write_file(&html_path, html.as_bytes()).await?;

        tracing::info!(
            "📝 {} missing papers: template {}, review page {}",
            missing.len(),
            template_path,
            html_path
        );
        Ok(template_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipelines::test_support::{sample_config, MockStorage};

    #[tokio::test]
    async fn test_missing_pipeline_collects_unmatched_images() {
        let storage = MockStorage::new();
        let catalog = json!([
            {"id": "a", "year": 2016, "paper_number": "1.1", "paper_id": "2016-1.1", "topic": "T1"},
            {"id": "b", "year": 2016, "paper_number": "1.3", "paper_id": "2016-1.3", "topic": "T2"},
            {"id": "c", "year": 2012, "paper_number": "1.1", "paper_id": "2012practice-1.1", "topic": "T3"}
        ]);
        storage
            .put("data/pastpaper_papers.json", catalog.to_string().as_bytes())
            .await;
        storage.put_images("data/images/2016", 4).await;
        storage.put_images("data/images/2012-practice", 2).await;

        let pipeline = MissingPipeline::new(storage.clone(), sample_config());
        let extracted = pipeline.extract().await.unwrap();
        let missing = pipeline.transform(extracted).await.unwrap();

        let labels: Vec<&str> = missing.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["2016-1.2", "2016-2.1", "2012practice-1.2"]);
        assert_eq!(missing[1].image, "2016/page-04.webp");

        let path = pipeline.load(missing).await.unwrap();
        assert_eq!(path, "data/missing_papers_template.json");

        let template: Value =
            serde_json::from_slice(&storage.get_file(&path).await.unwrap()).unwrap();
        assert_eq!(template.as_array().unwrap().len(), 3);
        assert_eq!(template[0]["paper_id"], "2016-1.2");
        assert_eq!(template[0]["paper_number"], "1.2");
        assert_eq!(template[0]["part_b_questions"][1]["number"], 2);

        let html =
            String::from_utf8(storage.get_file("data/missing_papers.html").await.unwrap()).unwrap();
        assert!(html.contains("MISSING: 2012practice-1.2"));
        assert!(html.contains("file:///srv/images/2012-practice/page-02.webp"));
    }

    #[tokio::test]
    async fn test_nothing_missing_writes_nothing() {
        let storage = MockStorage::new();
        storage.put("data/pastpaper_papers.json", b"[]").await;

        let pipeline = MissingPipeline::new(storage.clone(), sample_config());
        let extracted = pipeline.extract().await.unwrap();
        let missing = pipeline.transform(extracted).await.unwrap();
        assert!(missing.is_empty());

        assert_eq!(pipeline.load(missing).await.unwrap(), "");
        assert!(!storage.exists("data/missing_papers_template.json").await);
    }
}
