pub mod filesystem;
pub mod pipeline;
pub mod registry;

pub use crate::domain::model::{ConfigSpec, Operation, Options, Payload, Phase, Written};
pub use crate::domain::ports::{Adapter, Filter, Strategy};
pub use crate::utils::error::Result;
