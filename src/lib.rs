pub mod config;
pub mod dedup;
pub mod delivery;
pub mod enricher;
pub mod history;
pub mod llm;
pub mod pipeline;
pub mod selector;
pub mod sources;
pub mod summarizer;
pub mod traits;
pub mod types;
pub mod util;

pub use config::PipelineConfig;
pub use delivery::FileDeliverer;
pub use llm::{ChatModel, GroqClient};
pub use pipeline::{DigestPipeline, RunOutcome};
pub use sources::{CachedCollector, HttpArticleFetcher, MultiCollector, RssSource};
pub use traits::{CollectArticles, DeliverDigest, FetchArticle};
pub use types::*;
