use crate::history::ict_now;
use crate::traits::DeliverDigest;
use crate::types::{DigestError, Result, Session, SummaryCollection};
use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Renders the digest as plain text and writes it to a file. The HTML
/// e-mail and .docx renderers live outside this crate; this sink is what
/// local runs and tests consume.
pub struct FileDeliverer {
    path: PathBuf,
}

impl FileDeliverer {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

pub fn render_text(summary: &SummaryCollection, session: Session) -> String {
    let now = ict_now();
    let mut out = String::new();
    out.push_str(&format!(
        "BẢN TIN TÀI CHÍNH {} – {}\n",
        session.label().to_uppercase(),
        now.format("%d/%m/%Y %H:%M")
    ));
    out.push_str(&"=".repeat(55));
    out.push('\n');

    for (category, items) in summary.iter() {
        if items.is_empty() {
            continue;
        }
        out.push_str(&format!("\n## {}\n\n", category.label()));
        for (i, item) in items.iter().enumerate() {
            out.push_str(&format!("{}. {} ({})\n", i + 1, item.title, item.source));
            out.push_str(&format!("   {}\n", item.summary));
            for point in &item.key_points {
                out.push_str(&format!("   - {}\n", point));
            }
            if !item.impact.is_empty() {
                out.push_str(&format!("   Tác động: {}\n", item.impact));
            }
            out.push_str(&format!("   Link: {}\n\n", item.url));
        }
    }

    out
}

#[async_trait]
impl DeliverDigest for FileDeliverer {
    async fn deliver(&self, summary: &SummaryCollection, session: Session) -> Result<()> {
        let rendered = render_text(summary, session);
        fs::write(&self.path, rendered)
            .map_err(|e| DigestError::Delivery(format!("{}: {}", self.path.display(), e)))?;
        info!(
            "Wrote digest with {} items to {}",
            summary.total(),
            self.path.display()
        );
        Ok(())
    }
}
