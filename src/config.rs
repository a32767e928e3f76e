use std::path::PathBuf;
use std::time::Duration;

/// Every tunable budget of the pipeline, constructed once and passed
/// explicitly. Defaults mirror the production schedule: a classifier window
/// that fits the model's context budget, summarization batches spaced to
/// stay under the service's requests-per-minute limit, and a 30-day
/// deduplication history.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// How many candidates (arrival order) are offered to the classifier.
    pub window_size: usize,
    /// Maximum indices accepted across all categories combined.
    pub selection_cap: usize,
    /// Items per summarizer call.
    pub batch_size: usize,
    /// Wait before every summarizer batch except the first.
    pub batch_delay: Duration,
    /// Jaccard similarity at or above which two titles count as duplicates.
    pub similarity_threshold: f64,
    /// History retention in days.
    pub keep_days: i64,
    /// Maximum summaries kept per category.
    pub per_category_cap: usize,
    /// Width of the enrichment worker pool.
    pub max_workers: usize,
    /// Enriched content shorter than this falls back to the description.
    pub min_content_len: usize,
    /// Full-content characters sent to the summarizer per item.
    pub content_cap: usize,
    /// Per-request timeout for article and feed fetches.
    pub fetch_timeout: Duration,
    /// Where the history document lives.
    pub history_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_size: 120,
            selection_cap: 20,
            batch_size: 8,
            batch_delay: Duration::from_secs(20),
            similarity_threshold: 0.70,
            keep_days: 30,
            per_category_cap: 8,
            max_workers: 10,
            min_content_len: 100,
            content_cap: 900,
            fetch_timeout: Duration::from_secs(15),
            history_path: PathBuf::from("sent_history.json"),
        }
    }
}
