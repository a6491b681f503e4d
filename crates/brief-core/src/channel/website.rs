use std::time::Duration;

use scraper::{Html, Node};

use super::{take_chars, AcquisitionError};

/// Extracted page text is cut to this many characters.
pub const WEBSITE_MAX_CHARS: usize = 50_000;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; brief/0.1; +https://github.com/MikeSquared-Agency/brief)";

/// Elements whose whole subtree is discarded.
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "meta", "noscript", "iframe", "nav", "footer", "header",
];

/// Fetches a page and reduces it to plain text.
#[derive(Clone)]
pub struct WebsiteFetcher {
    http: reqwest::Client,
    timeout: Duration,
}

impl WebsiteFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, AcquisitionError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| AcquisitionError::Fetch(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` and return its visible text, capped at [`WEBSITE_MAX_CHARS`].
    pub async fn fetch(&self, url: &str) -> Result<String, AcquisitionError> {
        let parsed = reqwest::Url::parse(url.trim())
            .map_err(|e| AcquisitionError::InvalidUrl(format!("{}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AcquisitionError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        log::debug!("fetching page: {}", parsed);
        let response = self
            .http
            .get(parsed)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquisitionError::HttpStatus(status.as_u16()));
        }

        let html = response.text().await.map_err(|e| self.classify(e))?;
        let text = html_to_text(&html);
        if text.trim().is_empty() {
            return Err(AcquisitionError::EmptyPage);
        }
        Ok(take_chars(&text, WEBSITE_MAX_CHARS).to_string())
    }

    fn classify(&self, err: reqwest::Error) -> AcquisitionError {
        if err.is_timeout() {
            AcquisitionError::FetchTimeout(self.timeout)
        } else {
            AcquisitionError::Fetch(err.to_string())
        }
    }
}

/// Visible text of an HTML document, one trimmed text node per line.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut lines: Vec<&str> = Vec::new();
    let mut stack = vec![*document.root_element()];

    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    lines.push(trimmed);
                }
            }
            Node::Element(element) => {
                if !SKIPPED_ELEMENTS.contains(&element.name()) {
                    stack.extend(node.children().rev());
                }
            }
            _ => {}
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<!doctype html>
<html>
<head><title>Bloom Studio</title><meta name="x" content="y"><style>body { color: red }</style></head>
<body>
  <header>Top menu</header>
  <nav><a href="/">Home</a></nav>
  <h1>Bloom Studio</h1>
  <p>Same-day flower delivery   across the city.</p>
  <script>var tracking = 1;</script>
  <noscript>Enable JS</noscript>
  <iframe src="ad.html"></iframe>
  <p>Order <b>before noon</b>.</p>
  <footer>Copyright</footer>
</body>
</html>"#;

    #[test]
    fn test_html_to_text_strips_chrome_and_code() {
        let text = html_to_text(PAGE);
        assert_eq!(
            text,
            "Bloom Studio\nBloom Studio\nSame-day flower delivery   across the city.\nOrder\nbefore noon\n."
        );
        for hidden in ["Top menu", "Home", "tracking", "Enable JS", "Copyright", "color"] {
            assert!(!text.contains(hidden), "leaked: {}", hidden);
        }
    }

    #[test]
    fn test_html_to_text_plain_fragment() {
        assert_eq!(html_to_text("just words"), "just words");
        assert_eq!(html_to_text("<div>   </div>"), "");
    }

    fn fetcher(timeout: Duration) -> WebsiteFetcher {
        WebsiteFetcher::new(timeout, DEFAULT_USER_AGENT).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_returns_page_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/about"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let text = fetcher(Duration::from_secs(5))
            .fetch(&format!("{}/about", server.uri()))
            .await
            .unwrap();
        assert!(text.contains("Same-day flower delivery"));
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(PAGE)
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let err = fetcher(Duration::from_millis(50))
            .fetch(&server.uri())
            .await
            .unwrap_err();
        assert_eq!(err, AcquisitionError::FetchTimeout(Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_fetch_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = fetcher(Duration::from_secs(5)).fetch(&server.uri()).await.unwrap_err();
        assert_eq!(err, AcquisitionError::HttpStatus(403));
    }

    #[tokio::test]
    async fn test_fetch_empty_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><script>x()</script></html>"))
            .mount(&server)
            .await;

        let err = fetcher(Duration::from_secs(5)).fetch(&server.uri()).await.unwrap_err();
        assert_eq!(err, AcquisitionError::EmptyPage);
    }

    #[tokio::test]
    async fn test_fetch_rejects_bad_urls() {
        let f = fetcher(Duration::from_secs(1));
        assert!(matches!(f.fetch("not a url").await, Err(AcquisitionError::InvalidUrl(_))));
        assert!(matches!(
            f.fetch("ftp://example.com/file").await,
            Err(AcquisitionError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_truncates_long_pages() {
        let server = MockServer::start().await;
        let body = format!("<p>{}</p>", "w".repeat(WEBSITE_MAX_CHARS + 100));
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let text = fetcher(Duration::from_secs(5)).fetch(&server.uri()).await.unwrap();
        assert_eq!(text.chars().count(), WEBSITE_MAX_CHARS);
    }
}
