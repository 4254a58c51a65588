pub mod api;
pub mod models;
pub mod scrapers;
pub mod utils;

pub use api::fetcher::HtmlFetcher;
pub use api::store::{MemorySink, RecordSink, RetentionPolicy, StoreClient};
pub use models::*;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use scraper::Html;
use tracing::{debug, info, warn};

use crate::scrapers::locator;
use crate::scrapers::mapper::{self, ScheduleColumns, StandingsColumns, MIN_COLUMNS};
use crate::scrapers::rows::extract_rows;
use crate::utils::normalize;

/// Everything a scrape run needs, threaded explicitly instead of read from
/// module globals
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// League-table mirrors, tried in order
    pub standings_urls: Vec<String>,
    /// Fixture-list mirrors, tried in order
    pub schedule_urls: Vec<String>,
    pub timeout: Duration,
    pub referer: String,
    /// Team expected to appear in the real table; a strong disambiguator
    /// when a page carries several plausible tables
    pub marker_team: Option<String>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            standings_urls: vec![
                "https://ibasketball.co.il/league/2025-270/".to_string(),
                "https://ibba.one.co.il/league/2025-270/".to_string(),
                "http://ibasketball.co.il/league/2025-270/".to_string(),
            ],
            schedule_urls: vec![
                "https://ibasketball.co.il/team/5458-%D7%91%D7%A0%D7%99-%D7%99%D7%94%D7%95%D7%93%D7%94-%D7%AA%D7%9C-%D7%90%D7%91%D7%99%D7%91/".to_string(),
                "https://ibba.one.co.il/team/5458-%D7%91%D7%A0%D7%99-%D7%99%D7%94%D7%95%D7%93%D7%94-%D7%AA%D7%9C-%D7%90%D7%91%D7%99%D7%91/".to_string(),
            ],
            timeout: Duration::from_secs(15),
            referer: "https://ibasketball.co.il/".to_string(),
            marker_team: Some("בני יהודה".to_string()),
        }
    }
}

impl ScrapeConfig {
    /// Built-in mirrors, overridable from the environment:
    /// IBBA_STANDINGS_URLS / IBBA_SCHEDULE_URLS (comma-separated),
    /// IBBA_TIMEOUT_SECS, IBBA_MARKER_TEAM.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(urls) = std::env::var("IBBA_STANDINGS_URLS") {
            config.standings_urls = split_urls(&urls);
        }
        if let Ok(urls) = std::env::var("IBBA_SCHEDULE_URLS") {
            config.schedule_urls = split_urls(&urls);
        }
        if let Ok(secs) = std::env::var("IBBA_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.timeout = Duration::from_secs(secs);
            }
        }
        if let Ok(marker) = std::env::var("IBBA_MARKER_TEAM") {
            let marker = marker.trim().to_string();
            config.marker_team = (!marker.is_empty()).then_some(marker);
        }
        config
    }
}

fn split_urls(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

enum Batch {
    Standings(Vec<TeamStanding>),
    Games(Vec<GameFixture>),
}

struct NormalizedBatch {
    batch: Batch,
    rejected: usize,
}

/// Sequences fetch → locate → extract → map → normalize → save for one kind
/// of league data. Owns every collaborator; nothing in the pipeline reaches
/// for globals.
pub struct ScrapeRunner<S> {
    config: ScrapeConfig,
    fetcher: HtmlFetcher,
    sink: S,
    running: AtomicBool,
}

impl<S: RecordSink> ScrapeRunner<S> {
    pub fn new(config: ScrapeConfig, sink: S) -> Self {
        let fetcher = HtmlFetcher::new(config.timeout, &config.referer);
        Self {
            config,
            fetcher,
            sink,
            running: AtomicBool::new(false),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Runs the full pipeline once and reports an observable outcome either
    /// way. Overlapping runs against the same runner are refused, not
    /// queued, since two upserts racing on the same keys is never safe.
    pub async fn run(&self, kind: ScrapeKind) -> RunOutcome {
        if self.running.swap(true, Ordering::SeqCst) {
            return RunOutcome::failure(kind, &ScrapeError::RunInProgress);
        }

        let outcome = match self.run_stages(kind).await {
            Ok((stats, rejected)) => RunOutcome::success(kind, stats, rejected),
            Err(error) => {
                warn!(%kind, %error, "scrape run failed");
                RunOutcome::failure(kind, &error)
            }
        };

        self.running.store(false, Ordering::SeqCst);
        outcome
    }

    async fn run_stages(&self, kind: ScrapeKind) -> Result<(SaveStats, usize), ScrapeError> {
        let urls = match kind {
            ScrapeKind::Standings => &self.config.standings_urls,
            ScrapeKind::Schedule => &self.config.schedule_urls,
        };
        info!(%kind, mirrors = urls.len(), "run started, fetching");
        let html = self.fetcher.fetch(urls).await?;

        // Parse and normalize in one scope: scraper's Html is not Send and
        // must not be held across the save await
        let NormalizedBatch { batch, rejected } = {
            let doc = Html::parse_document(&html);
            let table = locator::locate(&doc, kind, self.config.marker_team.as_deref())?;
            let raw_rows = extract_rows(table);
            info!(%kind, rows = raw_rows.len(), "table located, normalizing");
            build_batch(kind, &raw_rows)?
        };

        let stats = match &batch {
            Batch::Standings(records) => {
                info!(%kind, records = records.len(), "saving");
                self.sink.save_standings(records).await?
            }
            Batch::Games(records) => {
                info!(%kind, records = records.len(), "saving");
                self.sink.save_games(records).await?
            }
        };

        info!(
            %kind,
            saved = stats.saved,
            skipped = stats.skipped,
            rejected,
            "run complete"
        );
        Ok((stats, rejected))
    }
}

/// Maps and normalizes every wide-enough row; rejections are counted, never
/// fatal. A batch with no valid record at all fails the run, with the
/// candidate count separating "empty table" from "all rows malformed".
fn build_batch(kind: ScrapeKind, raw_rows: &[Vec<String>]) -> Result<NormalizedBatch, ScrapeError> {
    let now = Utc::now();
    let mut rejected = 0usize;
    let mut candidates = 0usize;

    let batch = match kind {
        ScrapeKind::Standings => {
            let columns = raw_rows
                .iter()
                .find_map(|cells| StandingsColumns::from_header(cells));
            let mut records = Vec::new();
            for cells in raw_rows {
                if cells.len() < MIN_COLUMNS {
                    continue;
                }
                candidates += 1;
                let result = mapper::map_standings_row(cells, columns.as_ref())
                    .and_then(|raw| normalize::normalize_standing(&raw, now));
                match result {
                    Ok(record) => records.push(record),
                    Err(error) => {
                        debug!(%error, "standings row rejected");
                        rejected += 1;
                    }
                }
            }
            Batch::Standings(records)
        }
        ScrapeKind::Schedule => {
            let columns = raw_rows
                .iter()
                .find_map(|cells| ScheduleColumns::from_header(cells));
            let mut records = Vec::new();
            for cells in raw_rows {
                if cells.len() < MIN_COLUMNS {
                    continue;
                }
                candidates += 1;
                let result = mapper::map_schedule_row(cells, columns.as_ref())
                    .and_then(|raw| normalize::normalize_game(&raw));
                match result {
                    Ok(record) => records.push(record),
                    Err(error) => {
                        debug!(%error, "schedule row rejected");
                        rejected += 1;
                    }
                }
            }
            Batch::Games(records)
        }
    };

    let is_empty = match &batch {
        Batch::Standings(records) => records.is_empty(),
        Batch::Games(records) => records.is_empty(),
    };
    if is_empty {
        return Err(ScrapeError::NoValidRows { rows: candidates });
    }

    Ok(NormalizedBatch { batch, rejected })
}
