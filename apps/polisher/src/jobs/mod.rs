//! Job posting retrieval: fetch a posting page and reduce it to plain text
//! for requirements extraction.

pub mod handlers;

use std::time::Duration;

use reqwest::{header, Client, Url};
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, info};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";
const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Page chrome stripped before any text is read.
const NOISE_SELECTOR: &str = "script, style, nav, header, footer, .header, .footer, .nav, .menu, .sidebar";

/// Content containers tried in order; the first with enough text wins.
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "[role=\"main\"]",
    "[data-automation=\"jobDescription\"]",
    "[data-automation=\"jobAdDetails\"]",
    ".job-details",
    ".job-description",
    "article",
];

/// A container must hold more than this many characters to be chosen.
const MIN_CONTENT_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid job URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Fetching job page failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Job page request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Job page returned HTTP {status}")]
    Status { status: u16 },

    #[error("Invalid selector '{0}'")]
    Selector(String),
}

/// Fetches job pages with browser-like headers.
#[derive(Clone)]
pub struct JobScraper {
    client: Client,
    timeout: Duration,
}

impl JobScraper {
    pub fn new(timeout: Duration) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(ScrapeError::Http)?;
        Ok(Self { client, timeout })
    }

    /// Downloads `url` and returns its readable job text.
    pub async fn scrape(&self, url: &str) -> Result<String, ScrapeError> {
        let html = self.fetch(url).await?;
        let content = extract_job_text(&html)?;
        info!("Scraped {url}: {} characters", content.chars().count());
        Ok(content)
    }

    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let parsed = Url::parse(url.trim()).map_err(|e| ScrapeError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScrapeError::InvalidUrl {
                url: url.to_string(),
                reason: "only http and https are supported".to_string(),
            });
        }

        let response = self
            .client
            .get(parsed)
            .header(header::ACCEPT, BROWSER_ACCEPT)
            .header(header::ACCEPT_LANGUAGE, BROWSER_ACCEPT_LANGUAGE)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| self.transport_error(e))
    }

    fn transport_error(&self, err: reqwest::Error) -> ScrapeError {
        if err.is_timeout() {
            ScrapeError::Timeout(self.timeout)
        } else {
            ScrapeError::Http(err)
        }
    }
}

fn selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|_| ScrapeError::Selector(css.to_string()))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reduces a posting page to whitespace-collapsed text: strips page chrome,
/// prefers the first content container with substantial text, falls back
/// to the whole body.
pub fn extract_job_text(html: &str) -> Result<String, ScrapeError> {
    let mut document = Html::parse_document(html);

    let noise = selector(NOISE_SELECTOR)?;
    let noisy: Vec<_> = document.select(&noise).map(|el| el.id()).collect();
    for id in noisy {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }

    for css in CONTENT_SELECTORS {
        let text: String = document
            .select(&selector(css)?)
            .flat_map(|el| el.text())
            .collect();
        if text.chars().count() > MIN_CONTENT_CHARS {
            debug!("Job content taken from '{css}'");
            return Ok(collapse_whitespace(&text));
        }
    }

    let body: String = document
        .select(&selector("body")?)
        .flat_map(|el| el.text())
        .collect();
    Ok(collapse_whitespace(&body))
}


#[cfg(test)]
mod tests {
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::Router;

    use super::fixtures::posting_page;
    use super::*;
    use crate::llm_client::testing::spawn_server;

    #[test]
    fn test_description_block_is_preferred_and_noise_removed() {
        let text = extract_job_text(&posting_page()).unwrap();
        assert!(text.starts_with("Senior Data Analyst Build dashboards"));
        assert!(!text.contains("Site header"));
        assert!(!text.contains("Similar jobs"));
        assert!(!text.contains("track()"));
        assert!(!text.contains("Copyright"));
        assert!(!text.contains("  "));
    }

    #[test]
    fn test_selectors_are_tried_in_order() {
        let long = "x".repeat(150);
        let html = format!(
            "<html><body><article>article {long}</article><main>main {long}</main></body></html>"
        );
        assert!(extract_job_text(&html).unwrap().starts_with("main "));
    }

    #[test]
    fn test_short_containers_fall_back_to_body() {
        let html = "<html><body><main>Too short</main>\n<p>Body   text</p><footer>f</footer></body></html>";
        assert_eq!(extract_job_text(html).unwrap(), "Too short Body text");
    }

    #[tokio::test]
    async fn test_scrape_sends_browser_headers() {
        let router = Router::new().route(
            "/job/1",
            get(|headers: HeaderMap| async move {
                assert!(headers[header::USER_AGENT]
                    .to_str()
                    .unwrap()
                    .starts_with("Mozilla/5.0"));
                assert!(headers[header::ACCEPT].to_str().unwrap().starts_with("text/html"));
                axum::response::Html(posting_page())
            }),
        );
        let addr = spawn_server(router).await;

        let scraper = JobScraper::new(Duration::from_secs(5)).unwrap();
        let text = scraper.scrape(&format!("http://{addr}/job/1")).await.unwrap();
        assert!(text.contains("Build dashboards and pipelines"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let router = Router::new().route("/gone", get(|| async { (StatusCode::NOT_FOUND, "gone") }));
        let addr = spawn_server(router).await;

        let scraper = JobScraper::new(Duration::from_secs(5)).unwrap();
        let err = scraper.scrape(&format!("http://{addr}/gone")).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Status { status: 404 }));
    }

    #[tokio::test]
    async fn test_rejects_non_http_urls() {
        let scraper = JobScraper::new(Duration::from_secs(5)).unwrap();
        for url in ["not a url", "file:///etc/passwd"] {
            let err = scraper.scrape(url).await.unwrap_err();
            assert!(matches!(err, ScrapeError::InvalidUrl { .. }), "{url}");
        }
    }
}
