use crate::domain::model::{Operation, Options, Payload, Phase, Written};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Everything an adapter needs for a read, delete or exists call.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub config: &'a str,
    pub filename: &'a str,
    pub options: &'a Options,
}

#[derive(Debug, Clone, Copy)]
pub struct WriteRequest<'a> {
    pub config: &'a str,
    pub filename: &'a str,
    pub payload: &'a Payload,
    pub options: &'a Options,
}

/// Backend for one storage medium.
///
/// Failures are values, not errors: `None` or `false` tells the caller the
/// I/O did not happen. Filenames are relative to the adapter's root.
pub trait Adapter: Send + Sync {
    fn write(&self, request: &WriteRequest<'_>) -> Option<Written>;

    fn read(&self, request: &Request<'_>) -> Option<Vec<u8>>;

    fn delete(&self, request: &Request<'_>) -> bool;

    fn exists(&self, request: &Request<'_>) -> bool;
}

/// Why a strategy refused to let an operation proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: String,
}

impl Rejection {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

pub struct StrategyContext<'a> {
    pub config: &'a str,
    /// Target filename; for the payload phase this is the already
    /// transformed name.
    pub filename: &'a str,
    pub options: &'a Options,
}

/// A chainable transform over the filename or the payload of an operation.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn applies_to(&self, phase: Phase) -> bool;

    fn apply_to_filename(
        &self,
        _phase: Phase,
        filename: String,
        _context: &StrategyContext<'_>,
    ) -> Result<String, Rejection> {
        Ok(filename)
    }

    fn apply_to_payload(
        &self,
        payload: Payload,
        _context: &StrategyContext<'_>,
    ) -> Result<Payload, Rejection> {
        Ok(payload)
    }
}

/// The adapter call a filter wraps.
#[derive(Debug, Clone, Copy)]
pub struct Call<'a> {
    pub operation: Operation,
    pub config: &'a str,
    pub filename: &'a str,
    pub payload: Option<&'a Payload>,
    pub options: &'a Options,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Written(Option<Written>),
    Read(Option<Vec<u8>>),
    Deleted(bool),
    Exists(bool),
}

impl Response {
    pub fn operation(&self) -> Operation {
        match self {
            Response::Written(_) => Operation::Write,
            Response::Read(_) => Operation::Read,
            Response::Deleted(_) => Operation::Delete,
            Response::Exists(_) => Operation::Exists,
        }
    }

    /// Whether the adapter reported success.
    pub fn succeeded(&self) -> bool {
        match self {
            Response::Written(written) => written.is_some(),
            Response::Read(data) => data.is_some(),
            Response::Deleted(done) | Response::Exists(done) => *done,
        }
    }
}

/// Middleware around the adapter call. Each filter decides whether and how to
/// continue with `next`.
pub trait Filter: Send + Sync {
    fn name(&self) -> &str;

    fn call(&self, call: &Call<'_>, next: Next<'_>) -> Response;
}

/// The remainder of a filter chain. Running it past the last filter calls
/// the adapter.
pub struct Next<'a> {
    filters: &'a [Arc<dyn Filter>],
    adapter: &'a dyn Adapter,
}

impl<'a> Next<'a> {
    pub fn new(filters: &'a [Arc<dyn Filter>], adapter: &'a dyn Adapter) -> Self {
        Self { filters, adapter }
    }

    pub fn run(self, call: &Call<'_>) -> Response {
        match self.filters.split_first() {
            Some((filter, rest)) => filter.call(call, Next::new(rest, self.adapter)),
            None => invoke(self.adapter, call),
        }
    }
}

fn invoke(adapter: &dyn Adapter, call: &Call<'_>) -> Response {
    let request = Request {
        config: call.config,
        filename: call.filename,
        options: call.options,
    };
    match call.operation {
        Operation::Write => match call.payload {
            Some(payload) => Response::Written(adapter.write(&WriteRequest {
                config: call.config,
                filename: call.filename,
                payload,
                options: call.options,
            })),
            None => {
                warn!(config = call.config, filename = call.filename, "Write call without payload");
                Response::Written(None)
            }
        },
        Operation::Read => Response::Read(adapter.read(&request)),
        Operation::Delete => Response::Deleted(adapter.delete(&request)),
        Operation::Exists => Response::Exists(adapter.exists(&request)),
    }
}
