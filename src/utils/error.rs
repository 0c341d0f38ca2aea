use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClearportError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid configuration for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Package mapping '{path}' could not be loaded: {message}")]
    MappingError { path: String, message: String },

    #[error("Override writer already finalized, cannot record '{atom}'")]
    AlreadyFinalized { atom: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Serialization,
    Configuration,
    Mapping,
    Sequencing,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ClearportError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::IoError(_) => ErrorCategory::Io,
            Self::ZipError(_) | Self::CsvError(_) | Self::SerializationError(_) => {
                ErrorCategory::Serialization
            }
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::MappingError { .. } => ErrorCategory::Mapping,
            Self::AlreadyFinalized { .. } => ErrorCategory::Sequencing,
            Self::ProcessingError { .. } => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Processing => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Mapping => ErrorSeverity::High,
            ErrorCategory::Io | ErrorCategory::Serialization => ErrorSeverity::High,
            ErrorCategory::Sequencing => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::IoError(_) => "Check that the input directories exist and the output path is writable",
            Self::ZipError(_) => "Disable the archive output or free disk space and retry",
            Self::CsvError(_) | Self::SerializationError(_) => {
                "Check the report and mapping files for invalid content"
            }
            Self::ConfigValidationError { .. } => {
                "Fix the configuration file syntax and run again"
            }
            Self::InvalidConfigValueError { .. } => "Correct the reported configuration value",
            Self::MissingConfigError { .. } => "Add the missing setting to the configuration",
            Self::MappingError { .. } => "Regenerate the mapping table with build-mapping",
            Self::AlreadyFinalized { .. } => {
                "This is a pipeline ordering bug: all packages must be recorded before finalize"
            }
            Self::ProcessingError { .. } => "Re-run with --verbose to see which package failed",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::IoError(e) => format!("File access failed: {}", e),
            Self::MappingError { path, .. } => {
                format!("The package mapping table '{}' is missing or broken", path)
            }
            Self::AlreadyFinalized { .. } => {
                "Internal error: overrides were recorded after output was finalized".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClearportError>;
