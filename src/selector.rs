use crate::config::PipelineConfig;
use crate::llm::{extract_json, ChatModel};
use crate::types::{CandidateArticle, Category, DigestError, Result};
use crate::util::truncate_chars;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info};

const SYSTEM_PROMPT: &str = "Bạn là chuyên gia phân tích tài chính và kinh tế Việt Nam. \
Nhiệm vụ của bạn là chọn lọc các tin tức tài chính/kinh tế quan trọng nhất trong ngày \
và phân loại theo 4 nhóm. Luôn trả lời chính xác theo định dạng JSON được yêu cầu.";

/// Indices per category as the classifier returned them, before validation.
/// Unknown keys in the response are ignored; missing keys mean an empty
/// category.
#[derive(Debug, Deserialize)]
struct SelectionResponse {
    #[serde(default)]
    vi_mo_viet_nam: Vec<i64>,
    #[serde(default)]
    thi_truong: Vec<i64>,
    #[serde(default)]
    the_gioi: Vec<i64>,
    #[serde(default)]
    doanh_nghiep: Vec<i64>,
}

impl SelectionResponse {
    fn indices(&self, category: Category) -> &[i64] {
        match category {
            Category::ViMoVietNam => &self.vi_mo_viet_nam,
            Category::ThiTruong => &self.thi_truong,
            Category::TheGioi => &self.the_gioi,
            Category::DoanhNghiep => &self.doanh_nghiep,
        }
    }
}

fn build_prompt(window: &[CandidateArticle]) -> String {
    let mut listing = String::new();
    for (i, article) in window.iter().enumerate() {
        listing.push_str(&format!("{}. [{}] {}\n", i, article.source, article.title));
        if let Some(desc) = &article.description {
            if !desc.is_empty() {
                listing.push_str(&format!("   Mô tả: {}\n", truncate_chars(desc, 200)));
            }
        }
    }

    format!(
        "Dưới đây là danh sách các tin tức tài chính/kinh tế thu thập trong ngày, \
đánh số từ 0:\n\n{listing}\n---\n\n\
Hãy chọn các tin quan trọng nhất và xếp vào 4 nhóm sau:\n\n\
1. \"vi_mo_viet_nam\" – Chính sách kinh tế, GDP, lạm phát, tiền tệ, ngân hàng nhà nước, xuất nhập khẩu.\n\
2. \"thi_truong\" – Chứng khoán (VN-Index, HNX), trái phiếu, bất động sản, hàng hóa, ngoại hối.\n\
3. \"the_gioi\" – Kinh tế/tài chính quốc tế ảnh hưởng đến Việt Nam, Fed, USD, giá dầu.\n\
4. \"doanh_nghiep\" – Kết quả kinh doanh, IPO, M&A, tin tức doanh nghiệp cụ thể.\n\n\
Yêu cầu:\n\
- Chỉ trả về chỉ số (số thứ tự) của các tin đã chọn.\n\
- Ưu tiên tin có tác động lớn đến thị trường hoặc nhà đầu tư.\n\n\
Trả về JSON theo đúng format sau (không thêm text bên ngoài JSON):\n\
{{\"vi_mo_viet_nam\": [0, 5], \"thi_truong\": [2], \"the_gioi\": [7], \"doanh_nghiep\": [3]}}"
    )
}

/// Validate the classifier's index sets against the window: per category in
/// the fixed order, per index in given order, accept only in-range indices
/// not yet taken by any category, and stop globally once `cap` is reached.
fn validate(response: &SelectionResponse, window_len: usize, cap: usize) -> Vec<(usize, Category)> {
    let mut seen = HashSet::new();
    let mut accepted = Vec::new();

    'outer: for category in Category::ALL {
        for &raw in response.indices(category) {
            if accepted.len() >= cap {
                break 'outer;
            }
            if raw < 0 || raw as usize >= window_len {
                debug!("Dropping out-of-range index {} for {}", raw, category.key());
                continue;
            }
            let index = raw as usize;
            if !seen.insert(index) {
                debug!("Dropping duplicate index {} for {}", index, category.key());
                continue;
            }
            accepted.push((index, category));
        }
    }

    accepted
}

fn parse_selection(raw: &str, window_len: usize, cap: usize) -> Result<Vec<(usize, Category)>> {
    let json = extract_json(raw);
    let response: SelectionResponse =
        serde_json::from_str(json).map_err(|_| DigestError::SelectionParse {
            raw: raw.to_string(),
        })?;
    Ok(validate(&response, window_len, cap))
}

/// Ask the classifier to pick the most important items from the bounded
/// candidate window. Returns the accepted (candidate, category hint) pairs
/// in acceptance order. The hint is advisory; the summarizer assigns the
/// final category. An unparseable response is fatal — there is no fallback
/// selection strategy.
pub async fn select(
    model: &dyn ChatModel,
    candidates: &[CandidateArticle],
    config: &PipelineConfig,
) -> Result<Vec<(CandidateArticle, Category)>> {
    let window = &candidates[..candidates.len().min(config.window_size)];
    info!(
        "Sending {} of {} candidates to the classifier",
        window.len(),
        candidates.len()
    );

    let raw = model.complete(SYSTEM_PROMPT, &build_prompt(window)).await?;
    let picks = parse_selection(&raw, window.len(), config.selection_cap)?;

    info!("Classifier selected {} items", picks.len());

    Ok(picks
        .into_iter()
        .map(|(index, category)| (window[index].clone(), category))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct CannedModel(String);

    #[async_trait]
    impl ChatModel for CannedModel {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    fn candidate(i: usize) -> CandidateArticle {
        CandidateArticle {
            source: "cafef.vn".to_string(),
            title: format!("Tin {}", i),
            url: format!("https://cafef.vn/tin-{}.html", i),
            description: None,
            full_content: None,
        }
    }

    #[tokio::test]
    async fn select_validates_against_the_window_not_the_full_list() {
        // 200 candidates, window of 120: index 150 exists in the list but
        // not in the window, so it must be dropped like any other
        // out-of-range index.
        let candidates: Vec<CandidateArticle> = (0..200).map(candidate).collect();
        let config = PipelineConfig {
            window_size: 120,
            ..PipelineConfig::default()
        };
        let model = CannedModel(r#"{"thi_truong": [0, 119, 150]}"#.to_string());

        let picks = select(&model, &candidates, &config).await.unwrap();
        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].0.url, "https://cafef.vn/tin-0.html");
        assert_eq!(picks[1].0.url, "https://cafef.vn/tin-119.html");
    }

    #[tokio::test]
    async fn short_candidate_lists_use_their_own_length_as_the_window() {
        let candidates: Vec<CandidateArticle> = (0..5).map(candidate).collect();
        let model = CannedModel(r#"{"the_gioi": [4, 5]}"#.to_string());

        let picks = select(&model, &candidates, &PipelineConfig::default())
            .await
            .unwrap();
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].0.url, "https://cafef.vn/tin-4.html");
    }

    #[test]
    fn out_of_range_indices_are_dropped() {
        let picks = parse_selection(r#"{"thi_truong": [0, 2, 99]}"#, 10, 20).unwrap();
        assert_eq!(picks, vec![(0, Category::ThiTruong), (2, Category::ThiTruong)]);
    }

    #[test]
    fn negative_indices_are_dropped() {
        let picks = parse_selection(r#"{"the_gioi": [-1, 1]}"#, 5, 20).unwrap();
        assert_eq!(picks, vec![(1, Category::TheGioi)]);
    }

    #[test]
    fn first_category_wins_duplicate_indices() {
        let picks =
            parse_selection(r#"{"vi_mo_viet_nam": [3], "thi_truong": [3, 4]}"#, 10, 20).unwrap();
        assert_eq!(
            picks,
            vec![(3, Category::ViMoVietNam), (4, Category::ThiTruong)]
        );
    }

    #[test]
    fn total_cap_short_circuits_remaining_categories() {
        let picks = parse_selection(
            r#"{"vi_mo_viet_nam": [0, 1, 2], "thi_truong": [3, 4], "doanh_nghiep": [5]}"#,
            10,
            4,
        )
        .unwrap();
        assert_eq!(picks.len(), 4);
        assert_eq!(picks[3], (3, Category::ThiTruong));
    }

    #[test]
    fn fenced_response_is_accepted() {
        let raw = "```json\n{\"doanh_nghiep\": [1]}\n```";
        let picks = parse_selection(raw, 5, 20).unwrap();
        assert_eq!(picks, vec![(1, Category::DoanhNghiep)]);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let picks =
            parse_selection(r#"{"thi_truong": [0], "bat_dong_san": [1]}"#, 5, 20).unwrap();
        assert_eq!(picks, vec![(0, Category::ThiTruong)]);
    }

    #[test]
    fn malformed_response_is_a_parse_error() {
        let err = parse_selection("xin lỗi, không có tin nào đáng chú ý", 5, 20).unwrap_err();
        assert!(matches!(err, DigestError::SelectionParse { .. }));
    }

    #[test]
    fn accepted_indices_never_exceed_window_or_repeat() {
        let picks = parse_selection(
            r#"{"vi_mo_viet_nam": [9, 9, 10], "thi_truong": [9, 0]}"#,
            10,
            20,
        )
        .unwrap();
        let mut seen = std::collections::HashSet::new();
        for (index, _) in &picks {
            assert!(*index < 10);
            assert!(seen.insert(*index));
        }
    }
}
