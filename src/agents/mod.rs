//! Ready-made pipelines.

pub mod blog;
