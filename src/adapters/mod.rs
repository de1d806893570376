// Adapters layer: concrete storage backends, strategies and filters, registered
// with the core under the identifiers configurations refer to.

pub mod filter;
pub mod storage;
pub mod strategy;

use crate::core::registry::Registry;

/// Registers every built-in component with `registry`.
pub fn register_builtins(registry: &Registry) {
    registry.register_adapter("File", storage::file::File::from_options);
    registry.register_adapter("UploadFile", storage::upload_file::UploadFile::from_options);
    registry.register_adapter("Memory", storage::memory::Memory::from_options);
    registry.register_strategy("UploadFilter", strategy::upload_filter::UploadFilter::from_options);
    registry.register_filter("Log", filter::log::Log::from_config);
}
