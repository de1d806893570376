use crate::domain::ports::{Call, Filter, Next, Response};
use crate::utils::error::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn};

/// Logs every adapter call made through a configuration, with its outcome
/// and duration.
#[derive(Debug, Clone, Default)]
pub struct Log;

impl Log {
    pub fn from_config(_config: &str) -> Result<Arc<dyn Filter>> {
        Ok(Arc::new(Log))
    }
}

impl Filter for Log {
    fn name(&self) -> &str {
        "Log"
    }

    fn call(&self, call: &Call<'_>, next: Next<'_>) -> Response {
        let span = info_span!(
            "filesystem",
            config = call.config,
            operation = %call.operation,
            filename = call.filename
        );
        let _guard = span.enter();

        let started = Instant::now();
        let response = next.run(call);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        if response.succeeded() {
            info!(elapsed_ms, "Filesystem call succeeded");
        } else {
            warn!(elapsed_ms, "Filesystem call failed");
        }
        response
    }
}
