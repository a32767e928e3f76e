use crate::config::PipelineConfig;
use crate::traits::FetchArticle;
use crate::types::{CandidateArticle, Category};
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

/// Fetch full article text for every selected item through a bounded worker
/// pool. Failures degrade content quality, never pipeline continuation: a
/// failed or too-short fetch falls back to the item's feed description.
/// Completion order is irrelevant; the output preserves acceptance order and
/// contains every input item exactly once.
pub async fn enrich(
    selected: Vec<(CandidateArticle, Category)>,
    fetcher: &dyn FetchArticle,
    config: &PipelineConfig,
) -> Vec<(CandidateArticle, Category)> {
    let total = selected.len();
    info!(
        "Enriching {} items with up to {} concurrent fetches",
        total, config.max_workers
    );

    let mut fetched: Vec<(usize, CandidateArticle, Category, String)> =
        stream::iter(selected.into_iter().enumerate())
            .map(|(position, (article, category))| async move {
                let url = article.url.clone();
                let content = match fetcher.fetch(&url).await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Full-text fetch failed for {}: {}", url, e);
                        String::new()
                    }
                };
                (position, article, category, content)
            })
            .buffer_unordered(config.max_workers.max(1))
            .collect()
            .await;

    // Workers finish in arbitrary order; restore acceptance order.
    fetched.sort_by_key(|(position, ..)| *position);

    fetched
        .into_iter()
        .map(|(_, mut article, category, content)| {
            let content = content.trim();
            // Character count, not bytes: Vietnamese text runs close to two
            // bytes per character, which would loosen the threshold.
            let content_chars = content.chars().count();
            if content_chars >= config.min_content_len {
                article.full_content = Some(content.to_string());
            } else {
                debug!(
                    "Content too short for {} ({} chars), falling back to description",
                    article.url, content_chars
                );
                article.full_content = article.description.clone();
            }
            (article, category)
        })
        .collect()
}
