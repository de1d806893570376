use crate::core::pipeline;
use crate::core::registry::Registry;
use crate::domain::model::{ConfigSpec, Operation, Options, Payload, Phase, Written};
use crate::domain::ports::{Call, Next, Response, Strategy, StrategyContext};
use crate::utils::error::{FileSystemError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error};

/// Single entry point for file operations against named configurations.
///
/// Every call looks up the configuration, runs the filename strategies (and
/// for `write` the payload strategies), then hands the request to the
/// configuration's adapter through its filter chain.
///
/// Unknown configurations and strategy rejections are errors. A failed I/O
/// operation is not: it comes back as `Ok(None)` or `Ok(false)`.
///
/// ```no_run
/// use file_dispatch::{ConfigSpec, FileSystem};
///
/// let fs = FileSystem::new();
/// fs.configure([(
///     "default".to_string(),
///     ConfigSpec::new("File").option("path", "/tmp/uploads"),
/// )]);
/// fs.write("default", "a.txt", "hello")?;
/// assert_eq!(fs.read("default", "a.txt")?, Some(b"hello".to_vec()));
/// # Ok::<(), file_dispatch::FileSystemError>(())
/// ```
pub struct FileSystem {
    registry: Registry,
}

impl Default for FileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem {
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    pub fn with_registry(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn configure(&self, configs: impl IntoIterator<Item = (String, ConfigSpec)>) {
        self.registry.configure_all(configs);
    }

    pub fn configurations(&self) -> Option<BTreeMap<String, ConfigSpec>> {
        self.registry.configurations()
    }

    pub fn reset(&self, name: Option<&str>) {
        self.registry.reset(name);
    }

    pub fn write(
        &self,
        name: &str,
        filename: &str,
        payload: impl Into<Payload>,
    ) -> Result<Option<Written>> {
        self.write_with(name, filename, payload, &Options::default())
    }

    pub fn write_with(
        &self,
        name: &str,
        filename: &str,
        payload: impl Into<Payload>,
        options: &Options,
    ) -> Result<Option<Written>> {
        let filename = self.prepare_filename(name, Operation::Write, filename, options)?;

        let strategies = self.strategies(name, Phase::Write, options)?;
        let context = StrategyContext {
            config: name,
            filename: &filename,
            options,
        };
        let payload = pipeline::apply_to_payload(&strategies, payload.into(), &context)?;

        let call = Call {
            operation: Operation::Write,
            config: name,
            filename: &filename,
            payload: Some(&payload),
            options,
        };
        match self.dispatch(&call)? {
            Response::Written(written) => Ok(written),
            other => {
                mismatched(&call, &other);
                Ok(None)
            }
        }
    }

    pub fn read(&self, name: &str, filename: &str) -> Result<Option<Vec<u8>>> {
        self.read_with(name, filename, &Options::default())
    }

    pub fn read_with(
        &self,
        name: &str,
        filename: &str,
        options: &Options,
    ) -> Result<Option<Vec<u8>>> {
        let filename = self.prepare_filename(name, Operation::Read, filename, options)?;
        let call = Call {
            operation: Operation::Read,
            config: name,
            filename: &filename,
            payload: None,
            options,
        };
        match self.dispatch(&call)? {
            Response::Read(data) => Ok(data),
            other => {
                mismatched(&call, &other);
                Ok(None)
            }
        }
    }

    pub fn delete(&self, name: &str, filename: &str) -> Result<bool> {
        self.delete_with(name, filename, &Options::default())
    }

    pub fn delete_with(&self, name: &str, filename: &str, options: &Options) -> Result<bool> {
        let filename = self.prepare_filename(name, Operation::Delete, filename, options)?;
        let call = Call {
            operation: Operation::Delete,
            config: name,
            filename: &filename,
            payload: None,
            options,
        };
        match self.dispatch(&call)? {
            Response::Deleted(deleted) => Ok(deleted),
            other => {
                mismatched(&call, &other);
                Ok(false)
            }
        }
    }

    pub fn exists(&self, name: &str, filename: &str) -> Result<bool> {
        self.exists_with(name, filename, &Options::default())
    }

    pub fn exists_with(&self, name: &str, filename: &str, options: &Options) -> Result<bool> {
        let filename = self.prepare_filename(name, Operation::Exists, filename, options)?;
        let call = Call {
            operation: Operation::Exists,
            config: name,
            filename: &filename,
            payload: None,
            options,
        };
        match self.dispatch(&call)? {
            Response::Exists(exists) => Ok(exists),
            other => {
                mismatched(&call, &other);
                Ok(false)
            }
        }
    }

    fn prepare_filename(
        &self,
        name: &str,
        operation: Operation,
        filename: &str,
        options: &Options,
    ) -> Result<String> {
        if !self.registry.is_configured(name) {
            return Err(FileSystemError::UnknownConfiguration {
                name: name.to_string(),
            });
        }
        debug!(config = name, %operation, filename, "Dispatching");

        let phase = operation.filename_phase();
        let strategies = self.strategies(name, phase, options)?;
        let context = StrategyContext {
            config: name,
            filename,
            options,
        };
        pipeline::apply_to_filename(phase, &strategies, filename.to_string(), &context)
    }

    /// Strategies are not even constructed for a call that opted out of them.
    fn strategies(
        &self,
        name: &str,
        phase: Phase,
        options: &Options,
    ) -> Result<Vec<Arc<dyn Strategy>>> {
        if !options.strategies {
            return Ok(Vec::new());
        }
        self.registry.resolve_strategies(name, phase)
    }

    fn dispatch(&self, call: &Call<'_>) -> Result<Response> {
        let adapter = self.registry.resolve_adapter(call.config)?;
        let filters = self.registry.resolve_filters(call.config)?;
        let response = Next::new(&filters, adapter.as_ref()).run(call);
        debug!(
            config = call.config,
            operation = %call.operation,
            filename = call.filename,
            succeeded = response.succeeded(),
            "Dispatched"
        );
        Ok(response)
    }
}

/// A filter answered with the wrong kind of response; callers fall back to
/// the failure value of their own result type.
fn mismatched(call: &Call<'_>, response: &Response) {
    error!(
        config = call.config,
        expected = %call.operation,
        returned = %response.operation(),
        "Filter returned a response for a different operation"
    );
}
