use crate::types::{HistoryEntry, HistoryStore, Result, Session, SummaryCollection};
use chrono::{DateTime, Duration, FixedOffset, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Current time in ICT (UTC+7), the timezone the bulletin runs in.
pub fn ict_now() -> DateTime<FixedOffset> {
    let ict = FixedOffset::east_opt(7 * 3600).expect("valid fixed offset");
    Utc::now().with_timezone(&ict)
}

impl HistoryStore {
    /// Read the whole history document. A missing file is an empty store,
    /// not an error — the first run starts from nothing.
    pub fn load(path: &Path) -> Result<HistoryStore> {
        if !path.exists() {
            debug!("No history file at {}, starting empty", path.display());
            return Ok(HistoryStore::default());
        }
        let raw = fs::read_to_string(path)?;
        let store = serde_json::from_str(&raw)?;
        Ok(store)
    }

    /// Append one entry per delivered item that has both a URL and a title.
    /// Called only after delivery succeeded. Returns how many were added.
    pub fn record(
        &mut self,
        summary: &SummaryCollection,
        session: Session,
        now: DateTime<FixedOffset>,
    ) -> usize {
        let date_sent = now.format(DATE_FORMAT).to_string();
        let sent_at = now.format(TIMESTAMP_FORMAT).to_string();

        let mut added = 0;
        for (category, items) in summary.iter() {
            for item in items {
                if item.url.is_empty() || item.title.is_empty() {
                    continue;
                }
                self.entries.push(HistoryEntry {
                    url: item.url.clone(),
                    title: item.title.clone(),
                    category,
                    date_sent: date_sent.clone(),
                    sent_at: sent_at.clone(),
                    session,
                });
                added += 1;
            }
        }
        added
    }

    /// Drop entries older than `keep_days`. The comparison is lexicographic
    /// on the date string, which is only correct because `date_sent` is
    /// always written in the sortable `%Y-%m-%d` format — a representational
    /// assumption, not a general date comparator. Returns how many entries
    /// were pruned.
    pub fn prune(&mut self, keep_days: i64, now: DateTime<FixedOffset>) -> usize {
        let cutoff = (now - Duration::days(keep_days))
            .format(DATE_FORMAT)
            .to_string();
        let before = self.entries.len();
        self.entries.retain(|e| e.date_sent.as_str() >= cutoff.as_str());
        before - self.entries.len()
    }

    /// Rewrite the whole document in one shot: restore the
    /// `total_sent == entries.len()` invariant, bump `last_updated`, write.
    /// There is no partial-write recovery; a crash mid-write can corrupt
    /// the file.
    pub fn save(&mut self, path: &Path, now: DateTime<FixedOffset>) -> Result<()> {
        self.total_sent = self.entries.len();
        self.last_updated = now.format(TIMESTAMP_FORMAT).to_string();
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;
        info!(
            "Saved history: {} entries to {}",
            self.total_sent,
            path.display()
        );
        Ok(())
    }

    /// Per-day entry counts, newest first. For the `--stats` command.
    pub fn counts_by_date(&self) -> Vec<(String, usize)> {
        let mut by_date: BTreeMap<String, usize> = BTreeMap::new();
        for entry in &self.entries {
            *by_date.entry(entry.date_sent.clone()).or_default() += 1;
        }
        by_date.into_iter().rev().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, SummaryItem};
    use chrono::NaiveDateTime;

    fn at(date: &str) -> DateTime<FixedOffset> {
        let ict = FixedOffset::east_opt(7 * 3600).unwrap();
        NaiveDateTime::parse_from_str(&format!("{} 11:00:00", date), "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_local_timezone(ict)
            .unwrap()
    }

    fn entry(date_sent: &str) -> HistoryEntry {
        HistoryEntry {
            url: format!("https://cafef.vn/{}", date_sent),
            title: format!("Tin ngày {}", date_sent),
            category: Category::ThiTruong,
            date_sent: date_sent.to_string(),
            sent_at: format!("{}T11:00", date_sent),
            session: Session::Morning,
        }
    }

    fn summary_of(n: usize) -> SummaryCollection {
        let mut collection = SummaryCollection::default();
        for i in 0..n {
            collection.push(
                Category::DoanhNghiep,
                SummaryItem {
                    title: format!("Tin {}", i),
                    summary: "Tóm tắt.".to_string(),
                    key_points: vec![],
                    impact: String::new(),
                    source: "cafef.vn".to_string(),
                    url: format!("https://cafef.vn/tin-{}", i),
                    category: "doanh_nghiep".to_string(),
                },
            );
        }
        collection
    }

    #[test]
    fn prune_keeps_only_recent_entries() {
        let mut store = HistoryStore::default();
        store.entries.push(entry("2026-07-01"));
        store.entries.push(entry("2026-08-10"));
        store.entries.push(entry("2026-08-28"));

        let pruned = store.prune(30, at("2026-08-29"));
        assert_eq!(pruned, 1);
        let cutoff = "2026-07-30".to_string();
        assert!(store.entries.iter().all(|e| e.date_sent >= cutoff));
    }

    #[test]
    fn record_skips_items_without_url_or_title() {
        let mut store = HistoryStore::default();
        let mut summary = summary_of(2);
        summary.push(
            Category::TheGioi,
            SummaryItem {
                title: String::new(),
                summary: "Không có tiêu đề.".to_string(),
                key_points: vec![],
                impact: String::new(),
                source: String::new(),
                url: "https://a/b".to_string(),
                category: "the_gioi".to_string(),
            },
        );
        let added = store.record(&summary, Session::Evening, at("2026-08-29"));
        assert_eq!(added, 2);
        assert_eq!(store.entries[0].date_sent, "2026-08-29");
        assert_eq!(store.entries[0].session, Session::Evening);
    }

    #[test]
    fn record_then_prune_then_save_restores_invariant() {
        // 50 entries, 10 of them expired; record 5 new, prune, save -> 45.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent_history.json");

        let mut store = HistoryStore::default();
        for i in 0..10 {
            store.entries.push(entry(&format!("2026-06-{:02}", i + 1)));
        }
        for i in 0..40 {
            store.entries.push(entry(&format!("2026-08-{:02}", (i % 28) + 1)));
        }
        store.total_sent = 50;

        let now = at("2026-08-29");
        assert_eq!(store.record(&summary_of(5), Session::Morning, now), 5);
        assert_eq!(store.prune(30, now), 10);
        store.save(&path, now).unwrap();

        assert_eq!(store.total_sent, 45);
        assert_eq!(store.total_sent, store.entries.len());

        let reloaded = HistoryStore::load(&path).unwrap();
        assert_eq!(reloaded.total_sent, 45);
        assert_eq!(reloaded.entries.len(), 45);
        assert_eq!(reloaded.last_updated, "2026-08-29T11:00");
    }

    #[test]
    fn load_missing_file_is_empty_store() {
        let store = HistoryStore::load(Path::new("/nonexistent/sent_history.json")).unwrap();
        assert!(store.entries.is_empty());
        assert_eq!(store.total_sent, 0);
    }
}
