//! Transformations applied to geometry columns and attribute batches before assembly.

pub mod downcast;
pub mod reproject;

pub use downcast::auto_downcast;
pub use reproject::Reproject;
