use crate::config::PipelineConfig;
use crate::dedup::filter_new;
use crate::enricher::enrich;
use crate::history::ict_now;
use crate::llm::ChatModel;
use crate::selector::select;
use crate::summarizer::summarize;
use crate::traits::{CollectArticles, DeliverDigest, FetchArticle};
use crate::types::{DigestError, HistoryStore, Result, Session};
use tracing::{info, warn};

/// How a run ended, short of a fatal error.
#[derive(Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Digest delivered; `delivered` items across all categories,
    /// `duplicates_removed` candidates filtered against history.
    Succeeded {
        delivered: usize,
        duplicates_removed: usize,
    },
    /// Every candidate was already delivered; no AI call was made.
    SucceededEmpty,
}

/// Drives the whole run: Collect → Filter → Select → Enrich → Summarize →
/// Deliver → Record → Prune → Persist. Owns every tunable budget through
/// [`PipelineConfig`] and all external collaborators through their traits.
pub struct DigestPipeline {
    config: PipelineConfig,
    collector: Box<dyn CollectArticles>,
    fetcher: Box<dyn FetchArticle>,
    model: Box<dyn ChatModel>,
    deliverer: Box<dyn DeliverDigest>,
}

impl DigestPipeline {
    pub fn new(
        config: PipelineConfig,
        collector: Box<dyn CollectArticles>,
        fetcher: Box<dyn FetchArticle>,
        model: Box<dyn ChatModel>,
        deliverer: Box<dyn DeliverDigest>,
    ) -> Self {
        Self {
            config,
            collector,
            fetcher,
            model,
            deliverer,
        }
    }

    pub async fn run(&self, session: Session) -> Result<RunOutcome> {
        // Collect. Zero candidates is fatal before any AI call is made.
        let candidates = self.collector.collect().await?;
        info!(
            "Collected {} candidates from {}",
            candidates.len(),
            self.collector.source_name()
        );
        if candidates.is_empty() {
            return Err(DigestError::NoCandidates);
        }

        // Filter against the rolling history.
        let mut history = HistoryStore::load(&self.config.history_path)?;
        let (fresh, duplicates_removed) =
            filter_new(candidates, &history, self.config.similarity_threshold);
        info!(
            "{} candidates after deduplication ({} removed)",
            fresh.len(),
            duplicates_removed
        );
        if fresh.is_empty() {
            info!("Everything was already delivered; nothing to do");
            return Ok(RunOutcome::SucceededEmpty);
        }

        // Select, enrich, summarize.
        let selected = select(self.model.as_ref(), &fresh, &self.config).await?;
        let enriched = enrich(selected, self.fetcher.as_ref(), &self.config).await;
        let summary = summarize(self.model.as_ref(), &enriched, &self.config).await;
        let delivered = summary.total();

        // Deliver, then update history. Delivery failure is the caller's
        // problem; history failure after a successful delivery is not worth
        // failing the run over.
        self.deliverer.deliver(&summary, session).await?;

        let now = ict_now();
        let added = history.record(&summary, session, now);
        let pruned = history.prune(self.config.keep_days, now);
        info!(
            "History: {} added, {} pruned past the {}-day window",
            added, pruned, self.config.keep_days
        );
        if let Err(e) = history.save(&self.config.history_path, now) {
            warn!("Digest was delivered but history could not be saved: {}", e);
        }

        Ok(RunOutcome::Succeeded {
            delivered,
            duplicates_removed,
        })
    }
}
