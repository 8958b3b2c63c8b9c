//! Competition description stage.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::extract::describe_competition;
use crate::types::description::CompetitionDescription;

/// Read a saved page, logging instead of failing when it is missing.
fn read_page(dir: &Path, handle: &str, kind: &str) -> Option<String> {
    let path = dir.join(format!("{}.html", handle));
    match fs::read_to_string(&path) {
        Ok(html) => Some(html),
        Err(e) => {
            warn!(competition = handle, page = kind, path = %path.display(), error = %e, "Page unavailable");
            None
        }
    }
}

/// Describe each competition from `<overview_dir>/<handle>.html` and
/// `<data_dir>/<handle>.html`.
///
/// Every handle gets an entry, possibly empty.
pub fn describe_competitions(
    handles: &[String],
    overview_dir: &Path,
    data_dir: &Path,
) -> BTreeMap<String, CompetitionDescription> {
    let mut result = BTreeMap::new();

    for handle in handles {
        let overview = read_page(overview_dir, handle, "overview");
        let data = read_page(data_dir, handle, "data");
        let record = describe_competition(overview.as_deref(), data.as_deref());

        if record.description.is_none() && overview.is_some() {
            debug!(competition = %handle, "Description section not found");
        }
        if record.dataset_description.is_none() && data.is_some() {
            debug!(competition = %handle, "Dataset description not found");
        }
        result.insert(handle.clone(), record);
    }

    let described = result.values().filter(|r| !r.is_empty()).count();
    info!(competitions = result.len(), described, "Descriptions extracted");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_pages_yield_empty_records() {
        let overview = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        fs::write(
            overview.path().join("titanic.html"),
            r#"<html><head><meta name="description" content="Survival"></head>
               <body><div id="description">Predict survival</div></body></html>"#,
        )
        .unwrap();
        fs::write(
            data.path().join("titanic.html"),
            "<html><body><h2>Dataset Description</h2><div>train.csv</div></body></html>",
        )
        .unwrap();

        let result = describe_competitions(
            &["titanic".to_string(), "unknown".to_string()],
            overview.path(),
            data.path(),
        );

        let titanic = &result["titanic"];
        assert_eq!(titanic.description.as_deref(), Some("Predict survival"));
        assert_eq!(titanic.meta_description.as_deref(), Some("Survival"));
        assert_eq!(titanic.dataset_description.as_deref(), Some("train.csv"));
        assert!(result["unknown"].is_empty());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["unknown"], serde_json::json!({}));
    }
}
