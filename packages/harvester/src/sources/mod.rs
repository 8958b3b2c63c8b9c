//! Production listing sources.

pub mod kaggle_cli;

pub use kaggle_cli::KaggleCli;
