use crate::config::PipelineConfig;
use crate::llm::{extract_json, ChatModel};
use crate::types::{CandidateArticle, Category, SummaryCollection, SummaryItem};
use crate::util::truncate_chars;
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = "Bạn là chuyên gia phân tích tài chính và kinh tế Việt Nam. \
Nhiệm vụ của bạn là tóm tắt tin tức tài chính/kinh tế một cách ngắn gọn, súc tích và \
chính xác. Luôn trả lời bằng tiếng Việt và đúng định dạng JSON được yêu cầu.";

fn build_batch_prompt(batch: &[(CandidateArticle, Category)], content_cap: usize) -> String {
    let mut listing = String::new();
    for (i, (article, hint)) in batch.iter().enumerate() {
        listing.push_str(&format!(
            "--- Bài {} ---\nTiêu đề: {}\nNguồn: {}\nLink: {}\nNhóm gợi ý: {}\n",
            i + 1,
            article.title,
            article.source,
            article.url,
            hint.key(),
        ));
        let body = article
            .full_content
            .as_deref()
            .or(article.description.as_deref())
            .unwrap_or("");
        listing.push_str(&format!(
            "Nội dung: {}\n\n",
            truncate_chars(body, content_cap)
        ));
    }

    format!(
        "Dưới đây là {} bài báo tài chính/kinh tế đã chọn lọc:\n\n{listing}---\n\n\
Hãy tóm tắt từng bài. Với mỗi bài trả về một object gồm:\n\
- \"title\": tiêu đề gốc\n\
- \"summary\": tóm tắt 2-3 câu nội dung chính\n\
- \"key_points\": 3-5 ý chính (mảng chuỗi)\n\
- \"impact\": tác động đến thị trường hoặc nhà đầu tư (1 câu)\n\
- \"source\": nguồn\n\
- \"url\": link gốc\n\
- \"category\": một trong \"vi_mo_viet_nam\", \"thi_truong\", \"the_gioi\", \"doanh_nghiep\"\n\n\
Trả về JSON array theo đúng thứ tự các bài (không thêm text bên ngoài JSON).",
        batch.len()
    )
}

fn parse_batch(raw: &str) -> Result<Vec<SummaryItem>, serde_json::Error> {
    serde_json::from_str(extract_json(raw))
}

/// Bucket flattened summaries by their own `category` field — the
/// summarizer, not the selector hint, is authoritative. Items with an
/// unknown category are dropped; each bucket keeps its first `cap` items in
/// arrival order.
pub fn aggregate(items: Vec<SummaryItem>, cap: usize) -> SummaryCollection {
    let mut collection = SummaryCollection::default();
    for item in items {
        match Category::from_key(&item.category) {
            Some(category) => collection.push(category, item),
            None => warn!("Dropping summary with unknown category: {:?}", item.category),
        }
    }
    collection.truncate_each(cap);
    collection
}

/// Summarize the enriched items in fixed-size batches, sequentially, with a
/// delay before every batch except the first. The upstream service enforces
/// a requests-per-minute budget, so batches must not run in parallel and the
/// wait is a deliberate blocking sleep. A failed batch (call or parse)
/// contributes zero items and never aborts the run.
pub async fn summarize(
    model: &dyn ChatModel,
    items: &[(CandidateArticle, Category)],
    config: &PipelineConfig,
) -> SummaryCollection {
    let batch_count = items.len().div_ceil(config.batch_size.max(1));
    info!(
        "Summarizing {} items in {} batches of up to {}",
        items.len(),
        batch_count,
        config.batch_size
    );

    let mut flattened = Vec::new();

    for (k, batch) in items.chunks(config.batch_size.max(1)).enumerate() {
        if k > 0 && !config.batch_delay.is_zero() {
            info!(
                "Waiting {:?} before batch {}/{} to respect the rate budget",
                config.batch_delay,
                k + 1,
                batch_count
            );
            tokio::time::sleep(config.batch_delay).await;
        }

        let prompt = build_batch_prompt(batch, config.content_cap);
        match model.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(raw) => match parse_batch(&raw) {
                Ok(summaries) => {
                    info!(
                        "Batch {}/{} produced {} summaries",
                        k + 1,
                        batch_count,
                        summaries.len()
                    );
                    flattened.extend(summaries);
                }
                Err(e) => {
                    warn!(
                        "Batch {}/{} returned unparseable summaries, skipping: {}",
                        k + 1,
                        batch_count,
                        e
                    );
                }
            },
            Err(e) => {
                warn!("Batch {}/{} call failed, skipping: {}", k + 1, batch_count, e);
            }
        }
    }

    aggregate(flattened, config.per_category_cap)
}
