//! HTML field extraction.
//!
//! Pure functions over raw markup. A layout change shows up as an empty
//! result or `None`, never as an error; callers log and move on.

pub mod description;
pub mod listing;

pub use description::{
    dataset_description, describe_competition, description_by_id, meta_description,
};
pub use listing::{extract_listing, ListingExtractor, DEFAULT_LIST_MARKER};
