use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration field '{field}' is missing")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Duplicate position {position} in {year}: '{first}' and '{second}'")]
    DuplicatePosition {
        year: i32,
        position: String,
        first: String,
        second: String,
    },

    #[error("Remote request to {target} failed with status {status}: {message}")]
    RemoteError {
        target: String,
        status: u16,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Io,
    Network,
    Data,
    Integrity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. } => ErrorCategory::Config,
            EtlError::IoError(_) => ErrorCategory::Io,
            EtlError::ApiError(_) | EtlError::RemoteError { .. } => ErrorCategory::Network,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. }
            | EtlError::ValidationError { .. } => ErrorCategory::Data,
            EtlError::DuplicatePosition { .. } => ErrorCategory::Integrity,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Integrity => ErrorSeverity::High,
            ErrorCategory::Config | ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::DuplicatePosition { .. } => {
                "Fix the paper_number of one of the two records in the catalog, or set reconcile.on_duplicate = \"last_wins\""
            }
            EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::ConfigError { .. } => "Check the TOML configuration file and the environment variables it references",
            EtlError::IoError(_) => "Check that the configured paths exist and are readable",
            EtlError::ApiError(_) | EtlError::RemoteError { .. } => {
                "Check the remote base_url and service_key, then re-run; finished uploads are kept in the checkpoint"
            }
            EtlError::SerializationError(_) | EtlError::CsvError(_) => {
                "Check that the input JSON files are well-formed"
            }
            EtlError::ProcessingError { .. } | EtlError::ValidationError { .. } => {
                "Inspect the input data reported above"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Config => format!("配置錯誤: {}", self),
            ErrorCategory::Io => format!("檔案存取失敗: {}", self),
            ErrorCategory::Network => format!("遠端服務請求失敗: {}", self),
            ErrorCategory::Data => format!("資料處理失敗: {}", self),
            ErrorCategory::Integrity => format!("資料完整性錯誤: {}", self),
        }
    }
}

impl From<toml::de::Error> for EtlError {
    fn from(e: toml::de::Error) -> Self {
        EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
