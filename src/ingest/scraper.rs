//! Review page fetching and field extraction

use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use tracing::debug;
use tracing::info;

use crate::errors::ProfragError;
use crate::errors::Result;

lazy_static! {
    static ref OPEN_TAG: Regex = Regex::new(r"(?i)<(h1|div)\b([^>]*)>").expect("valid open-tag pattern");
    static ref CLASS_ATTR: Regex = Regex::new(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("valid class-attribute pattern");
    static ref ANY_TAG: Regex = Regex::new(r"(?s)<[^>]*>").expect("valid tag pattern");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid whitespace pattern");
}

/// Fields pulled from one professor review page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewPage {
    pub professor_name: String,
    /// Rating text exactly as the page shows it
    pub overall_rating: String,
    pub reviews: Vec<String>,
}

/// Turns a link into a [`ReviewPage`]
#[async_trait]
pub trait PageScraper: Send + Sync {
    async fn scrape(&self, link: &str) -> Result<ReviewPage>;
}

/// Fetches pages over HTTP and extracts fields by element class
pub struct HtmlPageScraper {
    client: Client,
}

impl HtmlPageScraper {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("profrag/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProfragError::HttpError(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageScraper for HtmlPageScraper {
    async fn scrape(&self, link: &str) -> Result<ReviewPage> {
        debug!("Fetching review page: {}", link);
        let response = self.client.get(link).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProfragError::ScrapeError(format!(
                "fetching {link} returned {status}"
            )));
        }

        let html = response.text().await?;
        let page = parse_review_page(&html)?;
        info!(
            professor = %page.professor_name,
            reviews = page.reviews.len(),
            "Scraped review page"
        );
        Ok(page)
    }
}

/// Extract `h1.professor-name`, `div.overall-rating` and every `div.review`.
///
/// # Errors
/// [`ProfragError::ScrapeError`] when the page has no professor name.
pub fn parse_review_page(html: &str) -> Result<ReviewPage> {
    let professor_name = extract_by_class(html, "h1", "professor-name")
        .into_iter()
        .find(|text| !text.is_empty())
        .ok_or_else(|| ProfragError::ScrapeError("professor name not found".to_string()))?;

    let overall_rating = extract_by_class(html, "div", "overall-rating")
        .into_iter()
        .next()
        .unwrap_or_default();

    let reviews = extract_by_class(html, "div", "review")
        .into_iter()
        .filter(|text| !text.is_empty())
        .collect();

    Ok(ReviewPage {
        professor_name,
        overall_rating,
        reviews,
    })
}

/// Text of every `<tag class="... class ...">` up to its first closing tag.
///
/// Opening tags are matched independently, so a wrapper element does not
/// hide the elements nested inside it.
fn extract_by_class(html: &str, tag: &str, class: &str) -> Vec<String> {
    // ASCII lowercasing keeps byte offsets aligned with `html`
    let lowered = html.to_ascii_lowercase();
    let closing = format!("</{tag}");

    OPEN_TAG
        .captures_iter(html)
        .filter(|caps| caps[1].eq_ignore_ascii_case(tag) && has_class(&caps[2], class))
        .filter_map(|caps| {
            let start = caps.get(0)?.end();
            let end = start + lowered[start..].find(&closing)?;
            Some(element_text(&html[start..end]))
        })
        .collect()
}

fn has_class(attributes: &str, class: &str) -> bool {
    CLASS_ATTR.captures(attributes).is_some_and(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .is_some_and(|value| value.as_str().split_whitespace().any(|c| c == class))
    })
}

fn element_text(inner: &str) -> String {
    let stripped = ANY_TAG.replace_all(inner, " ");
    let decoded = decode_entities(&stripped);
    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
