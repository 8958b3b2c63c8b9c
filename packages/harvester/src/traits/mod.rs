//! Seams between the pipeline and the outside world.
//!
//! Production implementations live in [`crate::browser`], [`crate::metadata`],
//! [`crate::sources`] and [`crate::pipeline::checkpoint`]; mocks live in
//! [`crate::testing`].

pub mod browser;
pub mod checkpoint;
pub mod listing;
pub mod metadata;
