use crate::utils::error::{EtlError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(EtlError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// 副檔名只允許英數字，不含開頭的 `.`
pub fn validate_extension(field_name: &str, extension: &str) -> Result<()> {
    if extension.is_empty()
        || extension.starts_with('.')
        || !extension.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: extension.to_string(),
            reason: "Extension must be alphanumeric without a leading dot, e.g. \"webp\"".to_string(),
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| EtlError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("remote.base_url", "https://example.supabase.co").is_ok());
        assert!(validate_url("remote.base_url", "http://localhost:54321").is_ok());
        assert!(validate_url("remote.base_url", "").is_err());
        assert!(validate_url("remote.base_url", "invalid-url").is_err());
        assert!(validate_url("remote.base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("upload.concurrency", 4, 1).is_ok());
        assert!(validate_positive_number("upload.concurrency", 0, 1).is_err());
    }

    #[test]
    fn test_validate_extension() {
        assert!(validate_extension("paths.image_extension", "webp").is_ok());
        assert!(validate_extension("paths.image_extension", ".webp").is_err());
        assert!(validate_extension("paths.image_extension", "").is_err());
        assert!(validate_extension("paths.image_extension", "we/bp").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("upload.max_retries", 3u32, 0, 10).is_ok());
        assert!(validate_range("upload.max_retries", 11u32, 0, 10).is_err());
    }

    #[test]
    fn test_validate_required_field() {
        let key: Option<String> = None;
        assert!(matches!(
            validate_required_field("remote.service_key", &key),
            Err(EtlError::MissingConfigError { .. })
        ));
    }
}
