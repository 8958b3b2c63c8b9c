//! Data types shared across the pipeline stages.

pub mod candidate;
pub mod checkpoint;
pub mod description;
pub mod listing;
pub mod work;
