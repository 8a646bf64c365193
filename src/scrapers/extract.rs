use scraper::{Html, Selector};

/// Id of the script element carrying the page's initial application state
pub const EMBEDDED_DATA_ID: &str = "__NEXT_DATA__";

/// Return the text of the embedded-data script element, or an empty string
/// when the page has none.
pub fn extract_blob(html: &str) -> String {
    let selector_text = format!("script#{}", EMBEDDED_DATA_ID);
    let Ok(selector) = Selector::parse(&selector_text) else {
        return String::new();
    };

    let document = Html::parse_document(html);
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>())
        .unwrap_or_default()
}
