pub mod upload_filter;

pub use upload_filter::UploadFilter;
