use thiserror::Error;

#[derive(Error, Debug)]
pub enum PointsError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("MessagePack encoding error: {0}")]
    MessagePackError(#[from] rmp_serde::encode::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Cache file '{path}' is unreadable: {reason}")]
    CacheCorrupt { path: String, reason: String },

    #[error("Unknown division name: '{name}'")]
    UnknownDivision { name: String },

    #[error("Unknown role name: '{name}'")]
    UnknownRole { name: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

pub type Result<T> = std::result::Result<T, PointsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Storage,
    Schema,
    Configuration,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PointsError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PointsError::ApiError(_) => ErrorCategory::Network,
            PointsError::ZipError(_)
            | PointsError::IoError(_)
            | PointsError::CacheCorrupt { .. } => ErrorCategory::Storage,
            PointsError::SerializationError(_)
            | PointsError::MessagePackError(_)
            | PointsError::UnknownDivision { .. }
            | PointsError::UnknownRole { .. } => ErrorCategory::Schema,
            PointsError::TomlError(_)
            | PointsError::ConfigError { .. }
            | PointsError::InvalidConfigValueError { .. }
            | PointsError::MissingConfigError { .. } => ErrorCategory::Configuration,
            PointsError::ProcessingError { .. } => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 上游暫時失敗，重跑即可
            PointsError::ApiError(_) => ErrorSeverity::Medium,
            // 上游格式變動或快取損毀，必須人工介入
            PointsError::CacheCorrupt { .. }
            | PointsError::UnknownDivision { .. }
            | PointsError::UnknownRole { .. } => ErrorSeverity::Critical,
            PointsError::ZipError(_) | PointsError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            PointsError::ApiError(_) => "Check network connectivity and re-run the batch",
            PointsError::CacheCorrupt { .. } => {
                "Restore the cache file from a backup; it is never discarded automatically"
            }
            PointsError::UnknownDivision { .. } | PointsError::UnknownRole { .. } => {
                "The upstream schema changed; extend the division/role tables before re-running"
            }
            PointsError::ZipError(_) | PointsError::IoError(_) => {
                "Check file permissions and free disk space"
            }
            PointsError::SerializationError(_) | PointsError::MessagePackError(_) => {
                "Inspect the offending payload or output file"
            }
            PointsError::TomlError(_)
            | PointsError::ConfigError { .. }
            | PointsError::InvalidConfigValueError { .. }
            | PointsError::MissingConfigError { .. } => {
                "Fix the configuration file or command-line flags"
            }
            PointsError::ProcessingError { .. } => "Re-run with --verbose to see more detail",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach the points service: {}", self),
            ErrorCategory::Storage => format!("Could not read or write local data: {}", self),
            ErrorCategory::Schema => format!("Upstream data could not be understood: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Processing => format!("Processing failed: {}", self),
        }
    }

    /// 依嚴重程度決定結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_errors_are_critical() {
        let err = PointsError::UnknownDivision {
            name: "Galactic".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Schema);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("Galactic"));
    }

    #[test]
    fn test_config_errors_exit_with_one() {
        let err = PointsError::MissingConfigError {
            field: "api_endpoint".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.exit_code(), 1);
        assert!(err.user_friendly_message().starts_with("Invalid configuration"));
    }
}
