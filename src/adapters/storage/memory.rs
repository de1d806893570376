use crate::core::registry::parse_options;
use crate::domain::model::{WriteReturns, Written};
use crate::domain::ports::{Adapter, Request, WriteRequest};
use crate::utils::error::Result;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct MemoryOptions {
    write_returns: WriteReturns,
}

/// Keeps files in process memory, keyed by filename.
#[derive(Debug, Default)]
pub struct Memory {
    files: Mutex<HashMap<String, Vec<u8>>>,
    write_returns: WriteReturns,
}

impl Memory {
    pub fn new(write_returns: WriteReturns) -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            write_returns,
        }
    }

    pub fn from_options(config: &str, options: &Map<String, Value>) -> Result<Arc<dyn Adapter>> {
        let options: MemoryOptions = parse_options(config, "Memory", options)?;
        Ok(Arc::new(Self::new(options.write_returns)))
    }

    fn files(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Adapter for Memory {
    fn write(&self, request: &WriteRequest<'_>) -> Option<Written> {
        let Some(data) = request.payload.as_bytes() else {
            warn!(
                config = request.config,
                filename = request.filename,
                "Refusing to store an unresolved upload"
            );
            return None;
        };
        self.files()
            .insert(request.filename.to_string(), data.to_vec());

        let mode = request.options.write_returns.unwrap_or(self.write_returns);
        Some(mode.written(request.filename, data.len() as u64))
    }

    fn read(&self, request: &Request<'_>) -> Option<Vec<u8>> {
        self.files().get(request.filename).cloned()
    }

    fn delete(&self, request: &Request<'_>) -> bool {
        self.files().remove(request.filename).is_some()
    }

    fn exists(&self, request: &Request<'_>) -> bool {
        self.files().contains_key(request.filename)
    }
}
