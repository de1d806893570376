pub mod log;

pub use log::Log;
