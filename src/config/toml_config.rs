use crate::core::reconciler::DuplicatePolicy;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub paths: PathsConfig,
    #[serde(default)]
    pub years: Vec<YearFolder>,
    #[serde(default)]
    pub special_folders: Vec<SpecialFolder>,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub root: Option<String>,
    pub catalog: String,
    pub images_dir: String,
    pub output_dir: String,
    pub image_extension: Option<String>,
    pub mapping_file: Option<String>,
    pub new_papers: Option<String>,
    pub preview_image_base: Option<String>,
}

/// 以年份對應的圖片資料夾
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct YearFolder {
    pub year: i32,
    pub folder: String,
}

/// 以 paper_id 前綴對應的圖片資料夾 (練習卷、樣本卷等)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpecialFolder {
    pub prefix: String,
    pub folder: String,
    pub year: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileConfig {
    pub on_duplicate: Option<DuplicatePolicy>,
    pub strict: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    pub service_key: String,
    pub bucket: Option<String>,
    pub table: Option<String>,
    pub public_base: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadConfig {
    pub concurrency: Option<usize>,
    pub max_retries: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
    pub timeout_seconds: Option<u64>,
    pub checkpoint_file: Option<String>,
    pub checkpoint_every: Option<usize>,
}

impl RemoteConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn bucket(&self) -> &str {
        self.bucket.as_deref().unwrap_or("paper-images")
    }

    pub fn table(&self) -> &str {
        self.table.as_deref().unwrap_or("pastpaper_papers")
    }

    /// page_images SQL 使用的網址前綴 (網站 public 目錄)
    pub fn public_base(&self) -> &str {
        self.public_base
            .as_deref()
            .unwrap_or("/paper-images")
            .trim_end_matches('/')
    }
}

impl UploadConfig {
    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(4)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(3)
    }

    pub fn retry_backoff_ms(&self) -> u64 {
        self.retry_backoff_ms.unwrap_or(1000)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(30)
    }

    pub fn checkpoint_every(&self) -> usize {
        self.checkpoint_every.unwrap_or(10)
    }
}

pub(crate) fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() || base == "." {
        name.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), name)
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${SUPABASE_SERVICE_ROLE_KEY})，未設定者原樣保留
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn root(&self) -> &str {
        self.paths.root.as_deref().unwrap_or(".")
    }

    pub fn image_extension(&self) -> &str {
        self.paths.image_extension.as_deref().unwrap_or("webp")
    }

    pub fn image_folder(&self, folder: &str) -> String {
        join_path(&self.paths.images_dir, folder)
    }

    /// HTML 預覽中 <img> 的網址前綴；未設定時使用圖片目錄的 file:// 絕對路徑
    pub fn preview_image_base(&self) -> String {
        if let Some(base) = &self.paths.preview_image_base {
            return base.clone();
        }
        let images = Path::new(self.root()).join(&self.paths.images_dir);
        match images.canonicalize() {
            Ok(absolute) => format!("file://{}", absolute.display()),
            Err(_) => images.display().to_string(),
        }
    }

    pub fn output_file(&self, name: &str) -> String {
        join_path(&self.paths.output_dir, name)
    }

    pub fn mapping_file(&self) -> String {
        self.paths
            .mapping_file
            .clone()
            .unwrap_or_else(|| self.output_file("paper_page_mapping.json"))
    }

    pub fn new_papers_file(&self) -> Result<&str> {
        validation::validate_required_field("paths.new_papers", &self.paths.new_papers)
            .map(String::as_str)
    }

    pub fn checkpoint_file(&self) -> String {
        self.upload
            .checkpoint_file
            .clone()
            .unwrap_or_else(|| self.output_file(".upload_done.json"))
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.reconcile.on_duplicate.unwrap_or_default()
    }

    pub fn is_strict(&self) -> bool {
        self.reconcile.strict.unwrap_or(false)
    }

    /// 需要遠端服務的指令使用；金鑰仍是未替換的 `${VAR}` 時視為未設定
    pub fn require_remote(&self) -> Result<&RemoteConfig> {
        let remote = validation::validate_required_field("remote", &self.remote)?;
        validation::validate_url("remote.base_url", &remote.base_url)?;
        validation::validate_non_empty_string("remote.service_key", &remote.service_key)?;
        if remote.service_key.starts_with("${") {
            return Err(EtlError::ConfigValidationError {
                field: "remote.service_key".to_string(),
                message: format!("environment variable {} is not set", remote.service_key),
            });
        }
        Ok(remote)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("paths.catalog", &self.paths.catalog)?;
        validation::validate_path("paths.images_dir", &self.paths.images_dir)?;
        validation::validate_path("paths.output_dir", &self.paths.output_dir)?;
        validation::validate_extension("paths.image_extension", self.image_extension())?;

        for year in &self.years {
            validation::validate_non_empty_string("years.folder", &year.folder)?;
        }
        for special in &self.special_folders {
            validation::validate_non_empty_string("special_folders.prefix", &special.prefix)?;
            validation::validate_non_empty_string("special_folders.folder", &special.folder)?;
        }

        validation::validate_positive_number("upload.concurrency", self.upload.concurrency(), 1)?;
        validation::validate_positive_number(
            "upload.checkpoint_every",
            self.upload.checkpoint_every(),
            1,
        )?;
        validation::validate_range("upload.max_retries", self.upload.max_retries(), 0, 10)?;

        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
