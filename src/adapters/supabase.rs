use crate::config::toml_config::RemoteConfig;
use crate::utils::error::{EtlError, Result};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

/// 遠端 REST / Storage API 的薄封裝
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
    bucket: String,
    table: String,
}

/// 插入一列的結果；重複主鍵視為已存在
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

pub fn content_type_for(path: &str) -> &'static str {
    match path.rsplit('.').next().map(str::to_ascii_lowercase).as_deref() {
        Some("webp") => "image/webp",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

impl SupabaseClient {
    pub fn new(remote: &RemoteConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: remote.base_url().to_string(),
            service_key: remote.service_key.clone(),
            bucket: remote.bucket().to_string(),
            table: remote.table().to_string(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    pub fn object_url(&self, object: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, object)
    }

    pub fn public_url(&self, object: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, object
        )
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    async fn remote_error(target: String, response: Response) -> EtlError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        EtlError::RemoteError {
            target,
            status,
            message: body.chars().take(200).collect(),
        }
    }

    /// 上傳 (覆寫) 一個物件，成功時回傳公開網址
    pub async fn upload_object(&self, object: &str, body: Vec<u8>) -> Result<String> {
        let url = self.object_url(object);
        tracing::debug!("Uploading {} ({} bytes)", object, body.len());

        let response = self
            .authorized(self.client.post(&url))
            .header("Content-Type", content_type_for(object))
            .header("x-upsert", "true")
            .body(body)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(self.public_url(object))
        } else {
            Err(Self::remote_error(url, response).await)
        }
    }

    pub async fn update_page_images(&self, db_id: &str, urls: &[String]) -> Result<()> {
        let url = self.table_url();
        let response = self
            .authorized(self.client.patch(&url))
            .query(&[("id", format!("eq.{}", db_id))])
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "page_images": urls }))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::remote_error(url, response).await)
        }
    }

    pub async fn insert_row(&self, row: &serde_json::Value) -> Result<InsertOutcome> {
        let url = self.table_url();
        let response = self
            .authorized(self.client.post(&url))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(InsertOutcome::Inserted);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        if body.to_lowercase().contains("duplicate") || body.contains("23505") {
            return Ok(InsertOutcome::Duplicate);
        }

        Err(EtlError::RemoteError {
            target: url,
            status,
            message: body.chars().take(200).collect(),
        })
    }
}

/// 連線錯誤、429 與 5xx 可重試
pub fn is_retryable(error: &EtlError) -> bool {
    match error {
        EtlError::ApiError(_) => true,
        EtlError::RemoteError { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}
