//! Competition description record.

use serde::{Deserialize, Serialize};

/// Text extracted from a competition's overview and data pages.
///
/// Fields are omitted from JSON when extraction found nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitionDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_description: Option<String>,
}

impl CompetitionDescription {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.meta_description.is_none()
            && self.dataset_description.is_none()
    }
}
