//! Page retrieval seam.

use async_trait::async_trait;
use pagesplit_common::FetchOptions;
use pagesplit_http::{ClientOptions, HttpClient, HttpError, RequestOpts};

const HTML_MEDIA: &str = "text/html";

/// Retrieves the raw HTML of a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, HttpError>;
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch(&self, url: &str) -> Result<String, HttpError> {
        self.get_text(url, RequestOpts::accepting(HTML_MEDIA)).await
    }
}

/// HTTP client configured from the pipeline's fetch options.
pub fn http_fetcher(options: &FetchOptions) -> Result<HttpClient, HttpError> {
    HttpClient::with_options(ClientOptions {
        connect_timeout: options.connect_timeout,
        timeout: options.timeout,
        user_agent: options.user_agent.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn page_requests_ask_for_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("accept", HTML_MEDIA))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>hi</p>"))
            .expect(1)
            .mount(&server)
            .await;

        let client = http_fetcher(&FetchOptions::default()).unwrap();
        let body = client.fetch(&format!("{}/page", server.uri())).await.unwrap();
        assert_eq!(body, "<p>hi</p>");
    }

    #[test]
    fn invalid_user_agent_is_rejected() {
        let options = FetchOptions {
            user_agent: Some("bad\nagent".into()),
            ..FetchOptions::default()
        };
        assert!(matches!(http_fetcher(&options), Err(HttpError::Build(_))));
    }
}
