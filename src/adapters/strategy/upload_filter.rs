use crate::core::registry::parse_options;
use crate::domain::model::{Payload, Phase};
use crate::domain::ports::{Rejection, Strategy, StrategyContext};
use crate::utils::error::Result;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
struct UploadFilterOptions {
    allowed: Vec<String>,
}

/// Only lets uploads through whose target filename keeps the extension the
/// client declared, and only for allowed extensions. Accepted uploads are
/// replaced by the bytes of their temporary file.
///
/// This is an extension check, not content inspection.
#[derive(Debug, Clone)]
pub struct UploadFilter {
    allowed: Vec<String>,
}

fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

impl UploadFilter {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed: allowed
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn from_options(config: &str, options: &Map<String, Value>) -> Result<Arc<dyn Strategy>> {
        let options: UploadFilterOptions = parse_options(config, "UploadFilter", options)?;
        Ok(Arc::new(Self::new(options.allowed)))
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    fn check(&self, target: &str, declared: &str) -> std::result::Result<(), Rejection> {
        let not_allowed = || Rejection::new(format!("File `{}` is not allowed to be uploaded.", target));

        let target_ext = extension(target).ok_or_else(not_allowed)?;
        let declared_ext = extension(declared).ok_or_else(not_allowed)?;
        if target_ext != declared_ext || !self.allowed.contains(&declared_ext) {
            return Err(not_allowed());
        }
        Ok(())
    }
}

impl Strategy for UploadFilter {
    fn name(&self) -> &str {
        "UploadFilter"
    }

    fn applies_to(&self, phase: Phase) -> bool {
        phase == Phase::Write
    }

    fn apply_to_payload(
        &self,
        payload: Payload,
        context: &StrategyContext<'_>,
    ) -> std::result::Result<Payload, Rejection> {
        let Payload::Upload(upload) = payload else {
            return Err(Rejection::new(format!(
                "File `{}` is not an upload and cannot be checked.",
                context.filename
            )));
        };

        self.check(context.filename, &upload.name)?;

        std::fs::read(&upload.tmp_path)
            .map(Payload::Bytes)
            .map_err(|e| {
                Rejection::new(format!(
                    "Upload `{}` could not be read from {}: {}",
                    upload.name,
                    upload.tmp_path.display(),
                    e
                ))
            })
    }
}
