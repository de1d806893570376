pub mod file;
pub mod memory;
pub mod upload_file;

pub use file::{File, FileOptions};
pub use memory::Memory;
pub use upload_file::UploadFile;
