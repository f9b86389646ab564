use scraper::{Html, Selector};

/// Every anchor href in `html`, in document order, exactly as written.
///
/// Resolution against the page URL is left to the crawler.
pub fn extract_links(html: &str) -> Vec<String> {
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return vec![],
    };

    Html::parse_document(html)
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .map(str::to_owned)
        .collect()
}
