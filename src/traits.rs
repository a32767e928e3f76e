use crate::types::{CandidateArticle, Result, Session, SummaryCollection};
use async_trait::async_trait;

/// A source of candidate articles (RSS feeds, a pre-fetched cache, ...).
#[async_trait]
pub trait CollectArticles: Send + Sync {
    /// Human-readable name for logs.
    fn source_name(&self) -> String;

    /// Collect the current batch of candidates. Order is arrival order and
    /// is preserved all the way to the classifier window.
    async fn collect(&self) -> Result<Vec<CandidateArticle>>;
}

/// Fetches the full text of a single article. Implementations carry their
/// own timeout; the enrichment stage converts any failure into a fallback,
/// so errors here never abort the run.
#[async_trait]
pub trait FetchArticle: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Consumes a finished digest. Called once per run, never retried.
#[async_trait]
pub trait DeliverDigest: Send + Sync {
    async fn deliver(&self, summary: &SummaryCollection, session: Session) -> Result<()>;
}
