//! Competition description extraction from overview and data pages.

use scraper::{ElementRef, Html, Selector};

use crate::types::description::CompetitionDescription;

/// Element id of the description section on overview pages.
pub const DESCRIPTION_ID: &str = "description";

/// Heading phrase that precedes the dataset description on data pages.
pub const DATASET_HEADING: &str = "Dataset Description";

/// Text nodes trimmed and concatenated; `None` when nothing is left.
fn stripped_text(element: ElementRef<'_>) -> Option<String> {
    let text: String = element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    (!text.is_empty()).then_some(text)
}

/// Text of the element with the given id.
pub fn description_by_id(html: &str, id: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let any = Selector::parse("[id]").ok()?;
    let element = document
        .select(&any)
        .find(|el| el.value().id() == Some(id))?;
    stripped_text(element)
}

/// `content` of `<meta name="description">`.
pub fn meta_description(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let meta = Selector::parse(r#"meta[name="description"]"#).ok()?;
    document
        .select(&meta)
        .find_map(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Text of the first `<div>` following the dataset heading in document order.
///
/// `None` when there is no heading or nothing follows it.
pub fn dataset_description(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let h2 = Selector::parse("h2").ok()?;
    let heading = document.select(&h2).find(|el| {
        el.text()
            .collect::<String>()
            .contains(DATASET_HEADING)
    })?;

    let block = document
        .root_element()
        .descendants()
        .skip_while(|node| node.id() != heading.id())
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div")?;

    stripped_text(block)
}

/// Build the description record for one competition from whichever pages exist.
pub fn describe_competition(
    overview_html: Option<&str>,
    data_html: Option<&str>,
) -> CompetitionDescription {
    CompetitionDescription {
        description: overview_html.and_then(|html| description_by_id(html, DESCRIPTION_ID)),
        meta_description: overview_html.and_then(meta_description),
        dataset_description: data_html.and_then(dataset_description),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OVERVIEW: &str = r#"
        <html><head><meta name="description" content=" Predict who survived. "></head>
        <body>
          <div id="header">Header</div>
          <div id="description"><h2>Overview</h2><p>  Use ML </p><p>to predict.</p></div>
        </body></html>
    "#;

    const DATA: &str = r#"
        <html><body>
          <h2>Files</h2>
          <section>
            <h2> Dataset Description </h2>
            <p>ignored paragraph</p>
          </section>
          <div><span>train.csv</span> <span>test.csv</span></div>
          <div>later block</div>
        </body></html>
    "#;

    #[test]
    fn test_description_by_id() {
        assert_eq!(
            description_by_id(OVERVIEW, DESCRIPTION_ID),
            Some("OverviewUse MLto predict.".to_string())
        );
        assert_eq!(description_by_id(OVERVIEW, "missing"), None);
    }

    #[test]
    fn test_meta_description() {
        assert_eq!(
            meta_description(OVERVIEW),
            Some("Predict who survived.".to_string())
        );
        assert_eq!(meta_description("<html></html>"), None);
    }

    #[test]
    fn test_dataset_description_takes_next_block() {
        assert_eq!(
            dataset_description(DATA),
            Some("train.csvtest.csv".to_string())
        );
    }

    #[test]
    fn test_dataset_description_without_following_block() {
        let html = "<html><body><div>before</div><h2>Dataset Description</h2><p>text</p></body></html>";
        assert_eq!(dataset_description(html), None);
    }

    #[test]
    fn test_dataset_description_without_heading() {
        assert_eq!(dataset_description("<html><body><div>x</div></body></html>"), None);
    }

    #[test]
    fn test_describe_competition() {
        let record = describe_competition(Some(OVERVIEW), None);
        assert!(record.description.is_some());
        assert!(record.meta_description.is_some());
        assert!(record.dataset_description.is_none());

        assert!(describe_competition(None, None).is_empty());
    }
}
