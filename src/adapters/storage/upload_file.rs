use super::file::{delete_path, failed, path_exists, read_file, FileOptions};
use crate::core::registry::parse_options;
use crate::domain::model::{Payload, Written};
use crate::domain::ports::{Adapter, Request, WriteRequest};
use crate::utils::error::Result;
use serde_json::{Map, Value};
use std::fs;
use std::sync::Arc;
use tracing::debug;

/// Permissive local file adapter.
///
/// Accepts uploads as well as bytes, copying an upload straight from its
/// temporary location, and always creates the directories leading to a
/// target. Nothing is touched on disk until the first write.
#[derive(Debug, Clone)]
pub struct UploadFile {
    options: FileOptions,
}

impl UploadFile {
    pub fn new(options: FileOptions) -> Self {
        Self { options }
    }

    pub fn from_options(config: &str, options: &Map<String, Value>) -> Result<Arc<dyn Adapter>> {
        let options: FileOptions = parse_options(config, "UploadFile", options)?;
        Ok(Arc::new(Self::new(options)))
    }
}

impl Adapter for UploadFile {
    fn write(&self, request: &WriteRequest<'_>) -> Option<Written> {
        let path = self.options.resolve(request.filename)?;
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                return failed("write", &path, e);
            }
        }

        let size = match request.payload {
            Payload::Bytes(data) => fs::write(&path, data).map(|()| data.len() as u64),
            Payload::Upload(upload) => fs::copy(&upload.tmp_path, &path),
        };
        let size = match size {
            Ok(size) => size,
            Err(e) => return failed("write", &path, e),
        };
        debug!(path = %path.display(), bytes = size, "Wrote file");

        let mode = request.options.write_returns.unwrap_or(self.options.write_returns);
        Some(mode.written(request.filename, size))
    }

    fn read(&self, request: &Request<'_>) -> Option<Vec<u8>> {
        read_file(&self.options.resolve(request.filename)?)
    }

    fn delete(&self, request: &Request<'_>) -> bool {
        self.options
            .resolve(request.filename)
            .is_some_and(|path| delete_path(&path))
    }

    fn exists(&self, request: &Request<'_>) -> bool {
        self.options
            .resolve(request.filename)
            .is_some_and(|path| path_exists(&path))
    }
}
