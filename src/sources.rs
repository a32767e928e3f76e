use crate::traits::{CollectArticles, FetchArticle};
use crate::types::{CandidateArticle, DigestError, Result};
use crate::util::{strip_tags, truncate_chars};
use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use feed_rs::parser;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ENTRIES_PER_FEED: usize = 30;
const DESCRIPTION_CAP: usize = 300;

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .gzip(true)
        .deflate(true)
        .brotli(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Collects candidates from the RSS feeds of a single news source.
pub struct RssSource {
    name: String,
    feed_urls: Vec<String>,
    client: reqwest::Client,
}

impl RssSource {
    pub fn new(name: &str, feed_urls: &[&str], timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            feed_urls: feed_urls.iter().map(|s| s.to_string()).collect(),
            client: http_client(timeout),
        }
    }

    async fn fetch_feed(&self, url: &str) -> Result<String> {
        let mut backoff = ExponentialBackoff {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(8),
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        loop {
            match self.try_fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => match backoff.next_backoff() {
                    Some(delay) => {
                        warn!("Feed fetch failed for {}, retrying in {:?}: {}", url, delay, e);
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                },
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::FeedParse(format!("HTTP {} from {}", status, url)));
        }
        Ok(response.text().await?)
    }

    fn parse_feed(&self, content: &str, seen: &mut HashSet<String>) -> Result<Vec<CandidateArticle>> {
        let feed = parser::parse(content.as_bytes())
            .map_err(|e| DigestError::FeedParse(format!("failed to parse feed: {}", e)))?;

        let mut articles = Vec::new();
        for entry in feed.entries.into_iter().take(ENTRIES_PER_FEED) {
            let title = match entry.title {
                Some(t) => t.content.trim().to_string(),
                None => continue,
            };
            let url = match entry.links.first() {
                Some(link) => link.href.trim().to_string(),
                None => continue,
            };
            if title.is_empty() || url.is_empty() || !seen.insert(url.clone()) {
                continue;
            }
            // Feeds occasionally emit relative or mangled links; those can
            // never be fetched or matched against history, so drop them here.
            if Url::parse(&url).is_err() {
                debug!("{}: skipping entry with invalid link {:?}", self.name, url);
                continue;
            }

            let description = entry
                .summary
                .map(|s| strip_tags(&s.content))
                .filter(|s| !s.is_empty())
                .map(|s| truncate_chars(&s, DESCRIPTION_CAP).to_string());

            articles.push(CandidateArticle {
                source: self.name.clone(),
                title,
                url,
                description,
                full_content: None,
            });
        }
        Ok(articles)
    }
}

#[async_trait]
impl CollectArticles for RssSource {
    fn source_name(&self) -> String {
        self.name.clone()
    }

    async fn collect(&self) -> Result<Vec<CandidateArticle>> {
        let mut articles = Vec::new();
        let mut seen = HashSet::new();

        for feed_url in &self.feed_urls {
            match self.fetch_feed(feed_url).await {
                Ok(content) => match self.parse_feed(&content, &mut seen) {
                    Ok(mut entries) => {
                        debug!("{}: {} entries from {}", self.name, entries.len(), feed_url);
                        articles.append(&mut entries);
                    }
                    Err(e) => warn!("{}: skipping unparseable feed {}: {}", self.name, feed_url, e),
                },
                Err(e) => warn!("{}: skipping unreachable feed {}: {}", self.name, feed_url, e),
            }
        }

        Ok(articles)
    }
}

/// The production source list: the four Vietnamese finance/news sites the
/// bulletin has always covered.
pub fn default_sources(timeout: Duration) -> Vec<Box<dyn CollectArticles>> {
    vec![
        Box::new(RssSource::new(
            "cafef.vn",
            &[
                "https://cafef.vn/rss/home.rss",
                "https://cafef.vn/rss/thi-truong-chung-khoan.rss",
                "https://cafef.vn/rss/kinh-te-vi-mo.rss",
                "https://cafef.vn/rss/doanh-nghiep.rss",
            ],
            timeout,
        )),
        Box::new(RssSource::new(
            "vietstock.vn",
            &[
                "https://vietstock.vn/rss/chung-khoan.rss",
                "https://vietstock.vn/rss/tai-chinh.rss",
                "https://vietstock.vn/rss/doanh-nghiep.rss",
                "https://vietstock.vn/rss/kinh-te.rss",
            ],
            timeout,
        )),
        Box::new(RssSource::new(
            "24hmoney.vn",
            &["https://24hmoney.vn/rss/home.rss", "https://24hmoney.vn/feed"],
            timeout,
        )),
        Box::new(RssSource::new(
            "baochinhphu.vn",
            &[
                "https://baochinhphu.vn/rss/kinh-te.rss",
                "https://baochinhphu.vn/rss/home.rss",
            ],
            timeout,
        )),
    ]
}

/// Concatenates several sources; a failing source is logged and skipped so
/// one dead site never empties the whole run.
pub struct MultiCollector {
    sources: Vec<Box<dyn CollectArticles>>,
}

impl MultiCollector {
    pub fn new(sources: Vec<Box<dyn CollectArticles>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl CollectArticles for MultiCollector {
    fn source_name(&self) -> String {
        "all sources".to_string()
    }

    async fn collect(&self) -> Result<Vec<CandidateArticle>> {
        let mut all = Vec::new();
        for source in &self.sources {
            match source.collect().await {
                Ok(articles) => {
                    info!("[{}] collected {} articles", source.source_name(), articles.len());
                    all.extend(articles);
                }
                Err(e) => warn!("[{}] collection failed: {}", source.source_name(), e),
            }
        }
        Ok(all)
    }
}

/// Reads a pre-fetched `articles_cache.json` when present (the fetch step
/// runs two hours earlier on the production schedule) and falls back to live
/// collection otherwise.
pub struct CachedCollector {
    cache_path: PathBuf,
    fallback: Box<dyn CollectArticles>,
}

impl CachedCollector {
    pub fn new(cache_path: PathBuf, fallback: Box<dyn CollectArticles>) -> Self {
        Self {
            cache_path,
            fallback,
        }
    }
}

#[async_trait]
impl CollectArticles for CachedCollector {
    fn source_name(&self) -> String {
        format!("cache ({})", self.cache_path.display())
    }

    async fn collect(&self) -> Result<Vec<CandidateArticle>> {
        if self.cache_path.exists() {
            let raw = std::fs::read_to_string(&self.cache_path)?;
            match serde_json::from_str::<Vec<CandidateArticle>>(&raw) {
                Ok(articles) => {
                    info!(
                        "Loaded {} articles from cache {}",
                        articles.len(),
                        self.cache_path.display()
                    );
                    return Ok(articles);
                }
                Err(e) => warn!("Cache file unreadable, falling back to live fetch: {}", e),
            }
        }
        self.fallback.collect().await
    }
}

/// Fetches an article page and flattens it to text. Timeout lives on the
/// client; callers treat every failure as "no content".
pub struct HttpArticleFetcher {
    client: reqwest::Client,
}

impl HttpArticleFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
        }
    }
}

#[async_trait]
impl FetchArticle for HttpArticleFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let parsed = Url::parse(url)?;
        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::FeedParse(format!("HTTP {} from {}", status, url)));
        }
        let html = response.text().await?;
        Ok(strip_tags(&html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>CafeF</title>
<item>
  <title>VN-Index vượt mốc 1.300 điểm</title>
  <link>https://cafef.vn/vn-index-1300.html</link>
  <description><![CDATA[<p>Thị trường <b>bứt phá</b> trong phiên chiều.</p>]]></description>
</item>
<item>
  <title>Xuất khẩu gạo lập kỷ lục</title>
  <link>https://cafef.vn/xuat-khau-gao.html</link>
</item>
<item>
  <title>Tin trùng link</title>
  <link>https://cafef.vn/vn-index-1300.html</link>
</item>
<item>
  <title>Tin có link tương đối</title>
  <link>tin-tuc/link-tuong-doi.html</link>
</item>
</channel></rss>"#;

    #[test]
    fn parse_feed_builds_candidates_and_dedupes_urls() {
        let source = RssSource::new("cafef.vn", &[], Duration::from_secs(5));
        let mut seen = HashSet::new();
        let articles = source.parse_feed(SAMPLE_RSS, &mut seen).unwrap();

        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].source, "cafef.vn");
        assert_eq!(articles[0].title, "VN-Index vượt mốc 1.300 điểm");
        assert_eq!(
            articles[0].description.as_deref(),
            Some("Thị trường bứt phá trong phiên chiều.")
        );
        assert!(articles[1].description.is_none());
        // The relative link can never be fetched; it must not survive.
        assert!(articles.iter().all(|a| a.url.starts_with("https://")));
    }

    #[tokio::test]
    async fn article_fetcher_rejects_malformed_urls() {
        let fetcher = HttpArticleFetcher::new(Duration::from_secs(1));
        let err = fetcher.fetch("tin-tuc/link-tuong-doi.html").await.unwrap_err();
        assert!(matches!(err, DigestError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn cached_collector_prefers_cache_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("articles_cache.json");
        let cached = vec![CandidateArticle {
            source: "cafef.vn".to_string(),
            title: "Tin từ cache".to_string(),
            url: "https://cafef.vn/cache.html".to_string(),
            description: None,
            full_content: None,
        }];
        std::fs::write(&cache, serde_json::to_string(&cached).unwrap()).unwrap();

        let collector = CachedCollector::new(cache, Box::new(MultiCollector::new(Vec::new())));
        let articles = collector.collect().await.unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Tin từ cache");
    }

    #[tokio::test]
    async fn cached_collector_falls_back_when_cache_missing() {
        let collector = CachedCollector::new(
            PathBuf::from("/nonexistent/articles_cache.json"),
            Box::new(MultiCollector::new(Vec::new())),
        );
        let articles = collector.collect().await.unwrap();
        assert!(articles.is_empty());
    }
}
