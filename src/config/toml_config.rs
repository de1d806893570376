use crate::core::filesystem::FileSystem;
use crate::core::registry::Registry;
use crate::domain::model::ConfigSpec;
use crate::utils::error::{FileSystemError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Application configuration file.
///
/// ```toml
/// [logging]
/// level = "info"
///
/// [filesystems.default]
/// adapter = "File"
/// path = "${UPLOAD_DIR}"
/// filters = ["Log"]
///
/// [[filesystems.default.strategies]]
/// name = "UploadFilter"
/// allowed = ["png", "jpg"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub filesystems: BTreeMap<String, ConfigSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed_content)?)
    }

    /// Replaces `${VAR}` with the value of environment variable `VAR`;
    /// unset variables are left as written.
    fn substitute_env_vars(content: &str) -> String {
        use regex::{Captures, Regex};
        use std::sync::OnceLock;

        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var pattern")
        });

        re.replace_all(content, |caps: &Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or("info")
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }

    /// Registers every `[filesystems.*]` section with `fs`.
    pub fn apply(&self, fs: &FileSystem) {
        fs.configure(self.filesystems.clone());
    }

    pub fn validate_config(&self) -> Result<()> {
        if self.filesystems.is_empty() {
            return Err(FileSystemError::ConfigValidationError {
                field: "filesystems".to_string(),
                message: "At least one filesystem must be configured".to_string(),
            });
        }

        for (name, spec) in &self.filesystems {
            validation::validate_non_empty_string("filesystems", name)?;
            validation::validate_non_empty_string(&format!("filesystems.{}.adapter", name), &spec.adapter)?;

            for key in ["path", "path_root"] {
                if let Some(path) = spec.options.get(key) {
                    let field = format!("filesystems.{}.{}", name, key);
                    let path = path.as_str().ok_or_else(|| FileSystemError::ConfigValidationError {
                        field: field.clone(),
                        message: "Path must be a string".to_string(),
                    })?;
                    validation::validate_path(&field, path)?;
                }
            }

            let mut seen = BTreeSet::new();
            for (index, strategy) in spec.strategies.iter().flatten().enumerate() {
                if !seen.insert(strategy.name.as_str()) {
                    return Err(FileSystemError::InvalidConfigValueError {
                        field: format!("filesystems.{}.strategies[{}].name", name, index),
                        value: strategy.name.clone(),
                        reason: "Each strategy may appear only once per filesystem".to_string(),
                    });
                }
                if strategy.name != "UploadFilter" {
                    continue;
                }
                let field = format!("filesystems.{}.strategies[{}].allowed", name, index);
                let allowed = match strategy.options.get("allowed") {
                    Some(Value::Array(items)) => items
                        .iter()
                        .map(|item| item.as_str().map(str::to_string))
                        .collect::<Option<Vec<_>>>(),
                    _ => None,
                };
                let allowed = allowed.ok_or_else(|| FileSystemError::ConfigValidationError {
                    field: field.clone(),
                    message: "UploadFilter needs a list of allowed extensions".to_string(),
                })?;
                validation::validate_extensions(&field, &allowed)?;
            }
        }

        Ok(())
    }

    /// Checks that every adapter, strategy and filter named in the file is
    /// known to `registry`.
    pub fn validate_components(&self, registry: &Registry) -> Result<()> {
        for (name, spec) in &self.filesystems {
            if !registry.has_adapter(&spec.adapter) {
                return Err(FileSystemError::UnknownAdapter {
                    config: name.clone(),
                    adapter: spec.adapter.clone(),
                });
            }
            if let Some(strategy) = spec
                .strategies
                .iter()
                .flatten()
                .find(|s| !registry.has_strategy(&s.name))
            {
                return Err(FileSystemError::UnknownStrategy {
                    config: name.clone(),
                    strategy: strategy.name.clone(),
                });
            }
            if let Some(filter) = spec.filters.iter().flatten().find(|f| !registry.has_filter(f)) {
                return Err(FileSystemError::UnknownFilter {
                    config: name.clone(),
                    filter: filter.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
