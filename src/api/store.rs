//! Persistence against the hosted store (Supabase PostgREST) plus an
//! in-memory sink for dry runs and tests.

use std::sync::Mutex;

use serde::Serialize;
use tracing::{info, warn};

use crate::models::{GameFixture, SaveStats, ScrapeError, ScrapeKind, TeamStanding};

const STANDINGS_TABLE: &str = "league_standings";
const GAMES_TABLE: &str = "games";

const STANDINGS_CONFLICT_KEY: &str = "name";
const GAMES_CONFLICT_KEY: &str = "game_date,home_team,away_team";

/// How a run reconciles fresh rows with rows already stored. One policy per
/// run; clear-then-insert and upsert-by-key are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    /// Insert-or-update by natural key; teams absent from the latest scrape
    /// stay, stale but present
    #[default]
    UpsertByKey,
    /// Delete everything, then insert the new batch
    ReplaceAll,
}

/// Where normalized batches go. Row-level failures are the implementation's
/// problem to count; only total unreachability may fail the call.
#[allow(async_fn_in_trait)]
pub trait RecordSink {
    async fn save_standings(&self, rows: &[TeamStanding]) -> Result<SaveStats, ScrapeError>;
    async fn save_games(&self, rows: &[GameFixture]) -> Result<SaveStats, ScrapeError>;
    async fn clear(&self, kind: ScrapeKind) -> Result<(), ScrapeError>;
}

enum StoreError {
    /// Transport-level failure; the store itself is unreachable
    Unreachable(String),
    /// The store answered but refused this record
    Rejected(String),
}

/// PostgREST client for the app's hosted database
pub struct StoreClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    policy: RetentionPolicy,
}

impl StoreClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, policy: RetentionPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            policy,
        }
    }

    /// One record per request: a row the store rejects is logged and
    /// counted, and the rest of the batch still goes through.
    async fn save_batch<T: Serialize>(
        &self,
        table: &str,
        conflict_key: &str,
        rows: &[T],
        label: impl Fn(&T) -> String,
    ) -> Result<SaveStats, ScrapeError> {
        let mut stats = SaveStats {
            requested: rows.len(),
            ..Default::default()
        };

        for row in rows {
            match self.upsert_one(table, conflict_key, row).await {
                Ok(()) => stats.saved += 1,
                Err(StoreError::Rejected(reason)) => {
                    warn!(table, row = %label(row), %reason, "store rejected row");
                    stats.skipped += 1;
                }
                Err(StoreError::Unreachable(reason)) => {
                    return Err(ScrapeError::SinkUnavailable(reason));
                }
            }
        }

        info!(table, saved = stats.saved, skipped = stats.skipped, "batch persisted");
        Ok(stats)
    }

    async fn upsert_one<T: Serialize>(
        &self,
        table: &str,
        conflict_key: &str,
        row: &T,
    ) -> Result<(), StoreError> {
        let url = format!(
            "{}/rest/v1/{}?on_conflict={}",
            self.base_url, table, conflict_key
        );
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "resolution=merge-duplicates")
            .json(&[row])
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(StoreError::Rejected(format!("HTTP {status}")))
        }
    }

    async fn delete_all(&self, table: &str) -> Result<(), ScrapeError> {
        // PostgREST refuses an unfiltered delete; id=neq.0 matches every row
        let url = format!("{}/rest/v1/{}?id=neq.0", self.base_url, table);
        let response = self
            .client
            .delete(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ScrapeError::SinkUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            info!(table, "cleared");
            Ok(())
        } else {
            Err(ScrapeError::SinkUnavailable(format!(
                "delete from {table} returned HTTP {status}"
            )))
        }
    }

    fn table_for(kind: ScrapeKind) -> &'static str {
        match kind {
            ScrapeKind::Standings => STANDINGS_TABLE,
            ScrapeKind::Schedule => GAMES_TABLE,
        }
    }
}

impl RecordSink for StoreClient {
    async fn save_standings(&self, rows: &[TeamStanding]) -> Result<SaveStats, ScrapeError> {
        if self.policy == RetentionPolicy::ReplaceAll {
            self.delete_all(STANDINGS_TABLE).await?;
        }
        self.save_batch(STANDINGS_TABLE, STANDINGS_CONFLICT_KEY, rows, |r| {
            r.name.clone()
        })
        .await
    }

    async fn save_games(&self, rows: &[GameFixture]) -> Result<SaveStats, ScrapeError> {
        if self.policy == RetentionPolicy::ReplaceAll {
            self.delete_all(GAMES_TABLE).await?;
        }
        self.save_batch(GAMES_TABLE, GAMES_CONFLICT_KEY, rows, |r| {
            format!("{} vs {}", r.home_team, r.away_team)
        })
        .await
    }

    async fn clear(&self, kind: ScrapeKind) -> Result<(), ScrapeError> {
        self.delete_all(Self::table_for(kind)).await
    }
}

/// Keeps batches in memory, upserting by the same natural keys the store
/// uses. Backs `--dry-run` and the test suite.
#[derive(Debug, Default)]
pub struct MemorySink {
    standings: Mutex<Vec<TeamStanding>>,
    games: Mutex<Vec<GameFixture>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standings(&self) -> Vec<TeamStanding> {
        self.standings.lock().unwrap().clone()
    }

    pub fn games(&self) -> Vec<GameFixture> {
        self.games.lock().unwrap().clone()
    }
}

impl RecordSink for MemorySink {
    async fn save_standings(&self, rows: &[TeamStanding]) -> Result<SaveStats, ScrapeError> {
        let mut stored = self.standings.lock().unwrap();
        for row in rows {
            match stored.iter_mut().find(|s| s.name == row.name) {
                Some(existing) => *existing = row.clone(),
                None => stored.push(row.clone()),
            }
        }
        Ok(SaveStats {
            requested: rows.len(),
            saved: rows.len(),
            skipped: 0,
        })
    }

    async fn save_games(&self, rows: &[GameFixture]) -> Result<SaveStats, ScrapeError> {
        let mut stored = self.games.lock().unwrap();
        for row in rows {
            let existing = stored.iter().position(|g| {
                g.game_date == row.game_date
                    && g.home_team == row.home_team
                    && g.away_team == row.away_team
            });
            match existing {
                Some(i) => stored[i] = row.clone(),
                None => stored.push(row.clone()),
            }
        }
        Ok(SaveStats {
            requested: rows.len(),
            saved: rows.len(),
            skipped: 0,
        })
    }

    async fn clear(&self, kind: ScrapeKind) -> Result<(), ScrapeError> {
        match kind {
            ScrapeKind::Standings => self.standings.lock().unwrap().clear(),
            ScrapeKind::Schedule => self.games.lock().unwrap().clear(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Json;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use chrono::Utc;

    fn standing(name: &str, position: u32) -> TeamStanding {
        TeamStanding {
            name: name.to_string(),
            position,
            games_played: 7,
            wins: 5,
            losses: 2,
            points: 33,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_memory_sink_upserts_by_name() {
        let sink = MemorySink::new();
        sink.save_standings(&[standing("בני יהודה", 3)]).await.unwrap();
        sink.save_standings(&[standing("בני יהודה", 1)]).await.unwrap();

        let stored = sink.standings();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].position, 1);
    }

    #[tokio::test]
    async fn test_store_client_counts_rejected_rows_without_aborting() {
        let app = Router::new().route(
            "/rest/v1/league_standings",
            post(|Json(body): Json<serde_json::Value>| async move {
                if body[0]["name"] == "bad" {
                    StatusCode::UNPROCESSABLE_ENTITY
                } else {
                    StatusCode::CREATED
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let client = StoreClient::new(
            format!("http://{addr}"),
            "test-key",
            RetentionPolicy::UpsertByKey,
        );
        let rows = [standing("good", 1), standing("bad", 2), standing("fine", 3)];
        let stats = client.save_standings(&rows).await.unwrap();

        assert_eq!(stats.requested, 3);
        assert_eq!(stats.saved, 2);
        assert_eq!(stats.skipped, 1);
    }

    #[tokio::test]
    async fn test_store_client_unreachable_is_fatal() {
        // Nothing listens on this port
        let client = StoreClient::new(
            "http://127.0.0.1:9",
            "test-key",
            RetentionPolicy::UpsertByKey,
        );
        let result = client.save_standings(&[standing("team", 1)]).await;
        assert!(matches!(result, Err(ScrapeError::SinkUnavailable(_))));
    }
}
