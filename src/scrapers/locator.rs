//! Finds the one table that actually holds standings or schedule data on a
//! page full of navigation widgets and decorative tables.
//!
//! The source site has changed its markup several times; no single fixed
//! selector survives that. Location therefore runs an ordered list of
//! strategies and stops at the first that produces candidates.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::models::{ScrapeError, ScrapeKind};
use crate::scrapers::mapper::MIN_COLUMNS;
use crate::scrapers::rows::extract_rows;
use crate::scrapers::vocab;
use crate::utils::normalize::looks_like_date;

const MAX_PLAUSIBLE_RANK: u32 = 50;

/// How many signature-label hits a header row needs before the table counts
/// as belonging to a kind
const SIGNATURE_THRESHOLD: usize = 2;

type Strategy = for<'a> fn(&[ElementRef<'a>], ScrapeKind) -> Vec<ElementRef<'a>>;

/// Locates the table holding data of the requested kind, or fails with
/// `NoMatchingTable`. When `marker` is given (a team name expected to appear
/// in the real table) it is preferred over the row-count tie-break.
pub fn locate<'a>(
    doc: &'a Html,
    kind: ScrapeKind,
    marker: Option<&str>,
) -> Result<ElementRef<'a>, ScrapeError> {
    let table_selector = Selector::parse("table").unwrap();
    let tables: Vec<ElementRef<'a>> = doc.select(&table_selector).collect();
    debug!(%kind, tables = tables.len(), "scanning page for tables");

    // Strategies in fixed priority order; the first one that yields
    // candidates decides.
    let strategies: [Strategy; 2] = [by_header_vocabulary, by_content_shape];

    for strategy in strategies {
        let candidates = strategy(&tables, kind);
        if let Some(table) = pick_candidate(candidates, marker) {
            return Ok(table);
        }
    }

    Err(ScrapeError::NoMatchingTable { kind })
}

/// A table whose header row hits the requested kind's vocabulary, unless it
/// also hits the other kind's
fn by_header_vocabulary<'a>(tables: &[ElementRef<'a>], kind: ScrapeKind) -> Vec<ElementRef<'a>> {
    tables
        .iter()
        .copied()
        .filter(|table| {
            let rows = extract_rows(*table);
            best_signature_row(&rows, kind) >= SIGNATURE_THRESHOLD && !cross_matched(&rows, kind)
        })
        .collect()
}

/// Header-less fallback: sniff the rows themselves. A standings table has
/// some row whose first cell is a plausible rank; a schedule table has some
/// row carrying a date token. Either way the row must be wide enough to be
/// data.
fn by_content_shape<'a>(tables: &[ElementRef<'a>], kind: ScrapeKind) -> Vec<ElementRef<'a>> {
    tables
        .iter()
        .copied()
        .filter(|table| {
            let rows = extract_rows(*table);
            if cross_matched(&rows, kind) {
                return false;
            }
            rows.iter().any(|cells| {
                cells.len() >= MIN_COLUMNS
                    && match kind {
                        ScrapeKind::Standings => cells
                            .first()
                            .and_then(|cell| cell.parse::<u32>().ok())
                            .is_some_and(|rank| (1..=MAX_PLAUSIBLE_RANK).contains(&rank)),
                        ScrapeKind::Schedule => cells.iter().any(|cell| looks_like_date(cell)),
                    }
            })
        })
        .collect()
}

/// True when some row reads like the *other* kind's header: a schedule
/// table must never be taken for standings and vice versa
fn cross_matched(rows: &[Vec<String>], kind: ScrapeKind) -> bool {
    best_signature_row(rows, kind.other()) >= SIGNATURE_THRESHOLD
}

fn best_signature_row(rows: &[Vec<String>], kind: ScrapeKind) -> usize {
    let signature = vocab::signature_for(kind);
    rows.iter()
        .map(|cells| {
            cells
                .iter()
                .filter(|cell| vocab::label_matches(cell, signature))
                .count()
        })
        .max()
        .unwrap_or(0)
}

fn pick_candidate<'a>(
    candidates: Vec<ElementRef<'a>>,
    marker: Option<&str>,
) -> Option<ElementRef<'a>> {
    if let Some(marker) = marker {
        if let Some(hit) = candidates
            .iter()
            .copied()
            .find(|table| table.text().collect::<String>().contains(marker))
        {
            debug!(marker, "table selected by marker team");
            return Some(hit);
        }
    }
    // More data rows means the real content, not a decorative snippet
    candidates.into_iter().max_by_key(|table| {
        extract_rows(*table)
            .iter()
            .filter(|cells| cells.len() >= MIN_COLUMNS)
            .count()
    })
}
