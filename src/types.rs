use serde::{Deserialize, Serialize};

/// An article collected from one of the news feeds, before any AI processing.
/// Identity is the URL; titles are not assumed unique across sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateArticle {
    pub source: String,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_content: Option<String>,
}

/// The four fixed digest categories. The serde names are the wire keys the
/// classifier and summarizer are asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "vi_mo_viet_nam")]
    ViMoVietNam,
    #[serde(rename = "thi_truong")]
    ThiTruong,
    #[serde(rename = "the_gioi")]
    TheGioi,
    #[serde(rename = "doanh_nghiep")]
    DoanhNghiep,
}

impl Category {
    /// Fixed iteration order used everywhere categories are walked.
    pub const ALL: [Category; 4] = [
        Category::ViMoVietNam,
        Category::ThiTruong,
        Category::TheGioi,
        Category::DoanhNghiep,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Category::ViMoVietNam => "vi_mo_viet_nam",
            Category::ThiTruong => "thi_truong",
            Category::TheGioi => "the_gioi",
            Category::DoanhNghiep => "doanh_nghiep",
        }
    }

    pub fn from_key(key: &str) -> Option<Category> {
        match key {
            "vi_mo_viet_nam" => Some(Category::ViMoVietNam),
            "thi_truong" => Some(Category::ThiTruong),
            "the_gioi" => Some(Category::TheGioi),
            "doanh_nghiep" => Some(Category::DoanhNghiep),
            _ => None,
        }
    }

    /// Human-readable Vietnamese label for rendering and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Category::ViMoVietNam => "Vĩ mô Việt Nam",
            Category::ThiTruong => "Thị trường",
            Category::TheGioi => "Thế giới",
            Category::DoanhNghiep => "Tin nổi bật từ doanh nghiệp",
        }
    }

    fn index(&self) -> usize {
        match self {
            Category::ViMoVietNam => 0,
            Category::ThiTruong => 1,
            Category::TheGioi => 2,
            Category::DoanhNghiep => 3,
        }
    }
}

/// Time-of-day label attached to history records and delivery.
/// Serialized with the Vietnamese labels the history file has always used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Session {
    #[serde(rename = "Sáng")]
    Morning,
    #[serde(rename = "Chiều")]
    Evening,
}

impl Session {
    pub fn label(&self) -> &'static str {
        match self {
            Session::Morning => "Sáng",
            Session::Evening => "Chiều",
        }
    }
}

/// A delivered item as remembered across runs. Append-only; never mutated,
/// only pruned once older than the retention window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub url: String,
    pub title: String,
    pub category: Category,
    /// Calendar date in `%Y-%m-%d`, the format `prune` relies on.
    pub date_sent: String,
    /// Timestamp in `%Y-%m-%dT%H:%M` (ICT).
    pub sent_at: String,
    pub session: Session,
}

/// The whole persisted history document. `total_sent == entries.len()` after
/// every save; `last_updated` only moves forward.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryStore {
    #[serde(default)]
    pub entries: Vec<HistoryEntry>,
    #[serde(default)]
    pub total_sent: usize,
    #[serde(default)]
    pub last_updated: String,
}

/// One summarized article as returned by the summarizer. `category` stays a
/// raw string here because the model is free to emit anything; aggregation
/// maps it onto [`Category`] and drops unknowns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryItem {
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub category: String,
}

/// Final digest: per-category ordered summaries, each bucket capped.
#[derive(Debug, Clone, Default)]
pub struct SummaryCollection {
    buckets: [Vec<SummaryItem>; 4],
}

impl SummaryCollection {
    pub fn push(&mut self, category: Category, item: SummaryItem) {
        self.buckets[category.index()].push(item);
    }

    pub fn items(&self, category: Category) -> &[SummaryItem] {
        &self.buckets[category.index()]
    }

    pub fn truncate_each(&mut self, cap: usize) {
        for bucket in &mut self.buckets {
            bucket.truncate(cap);
        }
    }

    /// Iterate categories in the fixed order with their items.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[SummaryItem])> {
        Category::ALL
            .iter()
            .map(move |c| (*c, self.items(*c)))
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|b| b.is_empty())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("feed parse error: {0}")]
    FeedParse(String),

    #[error("{0} environment variable is not set")]
    MissingCredential(&'static str),

    #[error("chat completion failed: {0}")]
    Chat(String),

    #[error("no candidates collected")]
    NoCandidates,

    #[error("classifier response was not parseable: {raw}")]
    SelectionParse { raw: String },

    #[error("delivery failed: {0}")]
    Delivery(String),
}

pub type Result<T> = std::result::Result<T, DigestError>;
