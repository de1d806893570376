use crate::domain::model::Phase;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileSystemError {
    #[error("Configuration `{name}` has not been defined.")]
    UnknownConfiguration { name: String },

    #[error("Blocked from executing by strategy `{strategy}` targeting `{phase}`: {reason}")]
    StrategyRejected {
        strategy: String,
        phase: Phase,
        reason: String,
    },

    #[error("Configuration `{config}` uses unknown adapter `{adapter}`")]
    UnknownAdapter { config: String, adapter: String },

    #[error("Configuration `{config}` uses unknown strategy `{strategy}`")]
    UnknownStrategy { config: String, strategy: String },

    #[error("Configuration `{config}` uses unknown filter `{filter}`")]
    UnknownFilter { config: String, filter: String },

    #[error("Invalid options for `{component}` in configuration `{config}`: {message}")]
    InvalidOptions {
        config: String,
        component: String,
        message: String,
    },

    #[error("Configuration validation error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid configuration value for {field} (`{value}`): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Strategy,
    Io,
}

impl FileSystemError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FileSystemError::StrategyRejected { .. } => ErrorCategory::Strategy,
            FileSystemError::IoError(_) => ErrorCategory::Io,
            _ => ErrorCategory::Configuration,
        }
    }

    /// Process exit code used by the command line front-end.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Configuration => 2,
            ErrorCategory::Strategy => 3,
            ErrorCategory::Io => 1,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            FileSystemError::UnknownConfiguration { name } => {
                format!("No filesystem named '{}' is configured", name)
            }
            FileSystemError::StrategyRejected {
                strategy, reason, ..
            } => format!("The operation was refused by '{}': {}", strategy, reason),
            FileSystemError::IoError(e) => format!("A file could not be accessed: {}", e),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            FileSystemError::UnknownConfiguration { .. } => {
                "Add a [filesystems.<name>] section to the configuration file"
            }
            FileSystemError::StrategyRejected { .. } => {
                "Check the file extension, or pass --no-strategies to bypass strategies"
            }
            FileSystemError::UnknownAdapter { .. } => {
                "Use one of the registered adapters: File, UploadFile, Memory"
            }
            FileSystemError::UnknownStrategy { .. } => {
                "Use one of the registered strategies: UploadFilter"
            }
            FileSystemError::UnknownFilter { .. } => "Use one of the registered filters: Log",
            FileSystemError::IoError(_) => "Check that the path exists and is writable",
            _ => "Review the configuration file",
        }
    }
}

pub type Result<T> = std::result::Result<T, FileSystemError>;
