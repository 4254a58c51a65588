use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which league table a scrape run targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeKind {
    Standings,
    Schedule,
}

impl ScrapeKind {
    /// The opposite table kind; used to rule out cross-matched tables
    pub fn other(self) -> Self {
        match self {
            ScrapeKind::Standings => ScrapeKind::Schedule,
            ScrapeKind::Schedule => ScrapeKind::Standings,
        }
    }
}

impl std::fmt::Display for ScrapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrapeKind::Standings => write!(f, "standings"),
            ScrapeKind::Schedule => write!(f, "schedule"),
        }
    }
}

/// One team's row in the league table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStanding {
    pub name: String,
    pub position: u32,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub points: u32,
    pub updated_at: DateTime<Utc>,
}

/// One scheduled or completed fixture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameFixture {
    pub game_date: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    pub location: String,
    /// A fixture shows 0-0 before tip-off, so the scores alone cannot
    /// signal that the game happened
    pub has_result: bool,
}

/// Persistence counters for one batch handed to the sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveStats {
    pub requested: usize,
    pub saved: usize,
    pub skipped: usize,
}

/// Result of one scrape run, in the shape schedulers and callers consume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub success: bool,
    pub kind: ScrapeKind,
    /// Records persisted by the sink
    pub count: usize,
    /// Records the sink refused individually
    pub skipped: usize,
    /// Rows dropped before normalization (headers, decoration, malformed)
    pub rejected_rows: usize,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunOutcome {
    pub fn success(kind: ScrapeKind, stats: SaveStats, rejected_rows: usize) -> Self {
        Self {
            success: true,
            kind,
            count: stats.saved,
            skipped: stats.skipped,
            rejected_rows,
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub fn failure(kind: ScrapeKind, error: &ScrapeError) -> Self {
        Self {
            success: false,
            kind,
            count: 0,
            skipped: 0,
            rejected_rows: 0,
            timestamp: Utc::now(),
            error: Some(error.to_string()),
        }
    }
}

/// Fatal, run-level failures
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("all {attempts} mirror(s) failed, last error: {last}")]
    FetchExhausted { attempts: usize, last: String },

    #[error("no {kind} table found in fetched page")]
    NoMatchingTable { kind: ScrapeKind },

    #[error("table yielded {rows} candidate row(s) but none mapped to a valid record")]
    NoValidRows { rows: usize },

    #[error("a scrape of this league is already running")]
    RunInProgress,

    #[error("store unreachable: {0}")]
    SinkUnavailable(String),
}

/// Row-level problems; the row is skipped and counted, never the batch
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("malformed date '{0}'")]
    MalformedDate(String),

    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("'{0}' is a header keyword, not a team")]
    HeaderKeyword(String),

    #[error("position {0} outside plausible range")]
    ImplausibleRank(u32),
}
