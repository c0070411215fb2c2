pub mod config;
pub mod logging;
pub mod pipeline_file;
