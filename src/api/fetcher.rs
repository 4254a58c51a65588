use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, REFERER};
use tracing::{info, warn};

use crate::models::ScrapeError;

/// The league site rejects bare clients, so every request carries a
/// realistic browser profile
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36";

pub struct HtmlFetcher {
    client: reqwest::Client,
}

impl HtmlFetcher {
    pub fn new(timeout: Duration, referer: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        if let Ok(value) = HeaderValue::from_str(referer) {
            headers.insert(REFERER, value);
        }

        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .default_headers(headers)
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Fetches raw HTML from the first mirror that answers. Any failure
    /// (non-2xx status, network error, timeout) is logged and the next
    /// mirror tried; only exhausting the whole list fails the run.
    pub async fn fetch(&self, urls: &[String]) -> Result<String, ScrapeError> {
        let mut last = String::from("no mirror urls configured");

        for url in urls {
            info!(%url, "fetching league page");
            match self.try_fetch(url).await {
                Ok(html) => {
                    info!(%url, bytes = html.len(), "page fetched");
                    return Ok(html);
                }
                Err(error) => {
                    warn!(%url, error = %error, "mirror failed, trying next");
                    last = error.to_string();
                }
            }
        }

        Err(ScrapeError::FetchExhausted {
            attempts: urls.len(),
            last,
        })
    }

    async fn try_fetch(&self, url: &str) -> anyhow::Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP {status}");
        }

        Ok(response.text().await.context("failed to read body")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/")
    }

    fn fetcher() -> HtmlFetcher {
        HtmlFetcher::new(Duration::from_secs(5), "https://ibasketball.co.il/")
    }

    #[tokio::test]
    async fn test_fetch_first_healthy_mirror() {
        let url = serve(Router::new().route("/", get(|| async { "<html>ok</html>" }))).await;

        let html = fetcher().fetch(&[url]).await.unwrap();
        assert_eq!(html, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_fetch_falls_back_past_broken_mirror() {
        let broken = serve(Router::new().route(
            "/",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        ))
        .await;
        let healthy = serve(Router::new().route("/", get(|| async { "<html>ok</html>" }))).await;

        let html = fetcher().fetch(&[broken, healthy]).await.unwrap();
        assert_eq!(html, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_fetch_exhausts_all_mirrors() {
        let broken = serve(Router::new().route(
            "/",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        ))
        .await;

        let result = fetcher().fetch(&[broken.clone(), broken]).await;
        match result {
            Err(ScrapeError::FetchExhausted { attempts, last }) => {
                assert_eq!(attempts, 2);
                assert!(last.contains("500"));
            }
            other => panic!("expected FetchExhausted, got {other:?}"),
        }
    }
}
