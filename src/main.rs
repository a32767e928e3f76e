use bantin::{
    sources::default_sources, CachedCollector, DigestPipeline, FileDeliverer, GroqClient,
    HistoryStore, HttpArticleFetcher, MultiCollector, PipelineConfig, RunOutcome, Session,
};
use chrono::{Timelike, Utc};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SessionArg {
    Morning,
    Evening,
}

impl From<SessionArg> for Session {
    fn from(arg: SessionArg) -> Self {
        match arg {
            SessionArg::Morning => Session::Morning,
            SessionArg::Evening => Session::Evening,
        }
    }
}

/// Bản tin tài chính – collect, deduplicate, select, summarize and deliver
/// the day's financial news.
#[derive(Parser, Debug)]
#[command(name = "bantin", version, about)]
struct Args {
    /// History file used for deduplication across runs.
    #[arg(long, default_value = "sent_history.json")]
    history: PathBuf,

    /// Pre-fetched article cache; live feeds are used when it is absent.
    #[arg(long, default_value = "articles_cache.json")]
    cache: PathBuf,

    /// Where the rendered digest is written.
    #[arg(long, default_value = "ban_tin.txt")]
    output: PathBuf,

    /// Override the session label (otherwise derived from the UTC hour).
    #[arg(long, value_enum)]
    session: Option<SessionArg>,

    /// Print history statistics and exit.
    #[arg(long)]
    stats: bool,
}

/// Morning bulletin before 08:00 UTC (15:00 ICT), evening after — matching
/// the production schedule.
fn session_from_clock() -> Session {
    if Utc::now().hour() < 8 {
        Session::Morning
    } else {
        Session::Evening
    }
}

fn print_stats(history_path: &PathBuf) -> anyhow::Result<()> {
    let store = HistoryStore::load(history_path)?;
    if store.entries.is_empty() {
        println!("(no history yet)");
        return Ok(());
    }
    println!(
        "{} entries, last updated {}",
        store.total_sent, store.last_updated
    );
    for (date, count) in store.counts_by_date().into_iter().take(7) {
        println!("  {}: {} articles", date, count);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    if args.stats {
        return print_stats(&args.history);
    }

    let session = args.session.map(Session::from).unwrap_or_else(session_from_clock);
    info!("Starting {} digest run", session.label());

    let config = PipelineConfig {
        history_path: args.history.clone(),
        ..PipelineConfig::default()
    };

    // Credentials are checked here, before any network call.
    let model = match GroqClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let collector = CachedCollector::new(
        args.cache.clone(),
        Box::new(MultiCollector::new(default_sources(config.fetch_timeout))),
    );
    let fetcher = HttpArticleFetcher::new(config.fetch_timeout);
    let deliverer = FileDeliverer::new(args.output.clone());

    let pipeline = DigestPipeline::new(
        config,
        Box::new(collector),
        Box::new(fetcher),
        Box::new(model),
        Box::new(deliverer),
    );

    match pipeline.run(session).await {
        Ok(RunOutcome::Succeeded {
            delivered,
            duplicates_removed,
        }) => {
            info!(
                "Done: {} items delivered, {} duplicates filtered",
                delivered, duplicates_removed
            );
            Ok(())
        }
        Ok(RunOutcome::SucceededEmpty) => {
            info!("Done: nothing new to deliver");
            Ok(())
        }
        Err(e) => {
            error!("Run failed: {}", e);
            std::process::exit(1);
        }
    }
}
