use analysis_core::{AnalysisError, NewsItem, NewsProvider};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Configuration for the news aggregation service
#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("NEWS_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8005".to_string()),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ArticleDto {
    title: String,
    #[serde(default)]
    summary: String,
    published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
struct ArticlesResponse {
    articles: Vec<ArticleDto>,
}

/// HTTP client for the news aggregation service. Carries its own request
/// timeout; a failed or slow fetch never blocks the analysis, and callers
/// degrade to an empty context.
#[derive(Clone)]
pub struct NewsClient {
    client: reqwest::Client,
    config: NewsConfig,
}

impl NewsClient {
    pub fn new(config: NewsConfig) -> Result<Self, NewsError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self, NewsError> {
        dotenvy::dotenv().ok();
        Self::new(NewsConfig::default())
    }

    /// Fetch recent article summaries for a company, bounded by a day window
    /// and a maximum article count. Articles older than the window are
    /// dropped client-side as well, in case the service ignores the bound.
    pub async fn fetch_articles(
        &self,
        company: &str,
        day_window: u32,
        max_articles: usize,
    ) -> Result<Vec<NewsItem>, NewsError> {
        let url = format!("{}/v1/articles", self.config.base_url);
        let days = day_window.to_string();
        let limit = max_articles.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("query", company),
                ("days", days.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NewsError::ServiceUnavailable(format!(
                "Status: {}",
                response.status()
            )));
        }

        let parsed = response.json::<ArticlesResponse>().await?;
        let cutoff = Utc::now() - ChronoDuration::days(day_window as i64);
        let items = parsed
            .articles
            .into_iter()
            .filter(|a| a.published_at >= cutoff)
            .take(max_articles)
            .map(|a| NewsItem {
                title: a.title,
                summary: a.summary,
                published_at: a.published_at,
            })
            .collect();
        Ok(items)
    }
}

#[async_trait]
impl NewsProvider for NewsClient {
    async fn fetch(
        &self,
        company: &str,
        day_window: u32,
        max_articles: usize,
    ) -> Result<Vec<NewsItem>, AnalysisError> {
        self.fetch_articles(company, day_window, max_articles)
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, company, "news fetch failed");
                AnalysisError::NewsError(e.to_string())
            })
    }
}
