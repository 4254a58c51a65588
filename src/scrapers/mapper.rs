//! Maps raw cell text to semantic fields. Header-driven when the table gave
//! us a recognizable header row; positional with a numeric cross-check when
//! it did not. The site has shipped both markups, so neither strategy alone
//! survives a redesign.

use tracing::warn;

use crate::models::RowError;
use crate::scrapers::vocab;

/// Rows narrower than this cannot carry a full record
pub const MIN_COLUMNS: usize = 5;

const MAX_PLAUSIBLE_RANK: u32 = 50;

/// Still-textual standings fields pulled from one row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStanding {
    pub position: String,
    pub team: String,
    pub games: String,
    pub wins: String,
    pub losses: String,
    pub points: String,
}

/// Still-textual fixture fields pulled from one row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawGame {
    pub date: String,
    pub time: String,
    pub home: String,
    pub away: String,
    pub score: String,
    pub venue: String,
}

/// Column-name → index mapping for a standings table, built once per table
/// from its header row
#[derive(Debug, Clone, Copy)]
pub struct StandingsColumns {
    position: usize,
    team: usize,
    games: Option<usize>,
    wins: Option<usize>,
    losses: Option<usize>,
    points: Option<usize>,
}

impl StandingsColumns {
    pub fn from_header(cells: &[String]) -> Option<Self> {
        let position = find_column(cells, vocab::POSITION_LABELS)?;
        let team = find_column(cells, vocab::TEAM_LABELS)?;
        Some(Self {
            position,
            team,
            games: find_column(cells, vocab::GAMES_LABELS),
            wins: find_column(cells, vocab::WINS_LABELS),
            losses: find_column(cells, vocab::LOSSES_LABELS),
            points: find_column(cells, vocab::POINTS_LABELS),
        })
    }
}

/// Column-name → index mapping for a schedule table
#[derive(Debug, Clone, Copy)]
pub struct ScheduleColumns {
    date: usize,
    time: Option<usize>,
    home: usize,
    away: usize,
    score: Option<usize>,
    venue: Option<usize>,
}

impl ScheduleColumns {
    pub fn from_header(cells: &[String]) -> Option<Self> {
        let date = find_column(cells, vocab::DATE_LABELS)?;
        let home = find_column(cells, vocab::HOME_LABELS)?;
        let away = find_column(cells, vocab::AWAY_LABELS)?;
        Some(Self {
            date,
            time: find_column(cells, vocab::TIME_LABELS),
            home,
            away,
            score: find_column(cells, vocab::SCORE_LABELS),
            venue: find_column(cells, vocab::VENUE_LABELS),
        })
    }
}

pub fn map_standings_row(
    cells: &[String],
    columns: Option<&StandingsColumns>,
) -> Result<RawStanding, RowError> {
    if let Some(cols) = columns {
        let raw = RawStanding {
            position: cell(cells, Some(cols.position)),
            team: cell(cells, Some(cols.team)),
            games: cell(cells, cols.games),
            wins: cell(cells, cols.wins),
            losses: cell(cells, cols.losses),
            points: cell(cells, cols.points),
        };
        validate_standing(&raw)?;
        return Ok(raw);
    }
    map_standings_positional(cells)
}

pub fn map_schedule_row(
    cells: &[String],
    columns: Option<&ScheduleColumns>,
) -> Result<RawGame, RowError> {
    let raw = if let Some(cols) = columns {
        RawGame {
            date: cell(cells, Some(cols.date)),
            time: cell(cells, cols.time),
            home: cell(cells, Some(cols.home)),
            away: cell(cells, Some(cols.away)),
            score: cell(cells, cols.score),
            venue: cell(cells, cols.venue),
        }
    } else {
        // Column order of the site's plain fixture lists
        RawGame {
            date: cell(cells, Some(0)),
            time: cell(cells, Some(1)),
            home: cell(cells, Some(2)),
            away: cell(cells, Some(3)),
            score: cell(cells, Some(4)),
            venue: cell(cells, Some(5)),
        }
    };
    validate_game(&raw)?;
    Ok(raw)
}

/// Candidate column orders seen across the source site's redesigns
struct Layout {
    position: usize,
    team: usize,
    games: usize,
    wins: usize,
    losses: usize,
    points: usize,
}

const FALLBACK_LAYOUTS: &[Layout] = &[
    // the classic six-column league table
    Layout { position: 0, team: 1, games: 2, wins: 3, losses: 4, points: 5 },
    // the widened table: points right after position, team name far right
    Layout { position: 0, points: 1, wins: 6, losses: 7, games: 8, team: 10 },
];

/// No usable header: try each known layout and accept the first whose
/// numbers hold together: `wins + losses == games` when all three are
/// present, otherwise a plausible rank in the position column.
fn map_standings_positional(cells: &[String]) -> Result<RawStanding, RowError> {
    let mut rank_only: Option<(RawStanding, bool)> = None;
    let mut first_error: Option<RowError> = None;

    for layout in FALLBACK_LAYOUTS {
        let raw = RawStanding {
            position: cell(cells, Some(layout.position)),
            team: cell(cells, Some(layout.team)),
            games: cell(cells, Some(layout.games)),
            wins: cell(cells, Some(layout.wins)),
            losses: cell(cells, Some(layout.losses)),
            points: cell(cells, Some(layout.points)),
        };
        match validate_standing(&raw) {
            Ok(()) => match totals_consistent(&raw) {
                Some(true) => return Ok(raw),
                Some(false) => {
                    if rank_only.is_none() {
                        rank_only = Some((raw, true));
                    }
                }
                None => {
                    if rank_only.is_none() {
                        rank_only = Some((raw, false));
                    }
                }
            },
            // Keep the error from the earliest layout; later, wider layouts
            // mostly fail on columns the row never had
            Err(error) => {
                first_error.get_or_insert(error);
            }
        }
    }

    match rank_only {
        Some((raw, inconsistent)) => {
            if inconsistent {
                warn!(
                    team = %raw.team,
                    "fallback layout accepted on rank alone; win/loss totals disagree with games played"
                );
            }
            Ok(raw)
        }
        None => Err(first_error.unwrap_or(RowError::MissingField("team name"))),
    }
}

fn validate_standing(raw: &RawStanding) -> Result<(), RowError> {
    validate_team_name(&raw.team)?;
    let rank: u32 = raw
        .position
        .trim()
        .parse()
        .map_err(|_| RowError::MissingField("position"))?;
    if !(1..=MAX_PLAUSIBLE_RANK).contains(&rank) {
        return Err(RowError::ImplausibleRank(rank));
    }
    Ok(())
}

fn validate_game(raw: &RawGame) -> Result<(), RowError> {
    validate_team_name(&raw.home)?;
    validate_team_name(&raw.away)?;
    Ok(())
}

/// The primary defense against header and navigation rows leaking into data
fn validate_team_name(name: &str) -> Result<(), RowError> {
    let name = name.trim();
    if name.is_empty() || name.chars().all(|c| c.is_ascii_digit()) {
        return Err(RowError::MissingField("team name"));
    }
    if vocab::is_header_keyword(name) {
        return Err(RowError::HeaderKeyword(name.to_string()));
    }
    Ok(())
}

/// `Some(true)` when wins + losses == games with all three present and
/// numeric; `None` when any of them is missing
fn totals_consistent(raw: &RawStanding) -> Option<bool> {
    let games: u32 = raw.games.trim().parse().ok()?;
    let wins: u32 = raw.wins.trim().parse().ok()?;
    let losses: u32 = raw.losses.trim().parse().ok()?;
    Some(wins + losses == games)
}

fn cell(cells: &[String], index: Option<usize>) -> String {
    index
        .and_then(|i| cells.get(i))
        .cloned()
        .unwrap_or_default()
}

fn find_column(cells: &[String], labels: &[&str]) -> Option<usize> {
    cells.iter().position(|c| vocab::label_matches(c, labels))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_header_mapping_hebrew() {
        let header = cells(&["מיקום", "קבוצה", "משחקים", "נצחונות", "הפסדים", "נקודות"]);
        let columns = StandingsColumns::from_header(&header).unwrap();

        let row = cells(&["3", "בני יהודה", "7", "5", "2", "33"]);
        let raw = map_standings_row(&row, Some(&columns)).unwrap();
        assert_eq!(raw.team, "בני יהודה");
        assert_eq!(raw.position, "3");
        assert_eq!(raw.wins, "5");
        assert_eq!(raw.losses, "2");
    }

    #[test]
    fn test_header_mapping_handles_shuffled_columns() {
        let header = cells(&["קבוצה", "נקודות", "מיקום", "נצחונות", "הפסדים", "משחקים"]);
        let columns = StandingsColumns::from_header(&header).unwrap();

        let row = cells(&["הפועל חולון", "30", "2", "4", "3", "7"]);
        let raw = map_standings_row(&row, Some(&columns)).unwrap();
        assert_eq!(raw.team, "הפועל חולון");
        assert_eq!(raw.position, "2");
        assert_eq!(raw.points, "30");
        assert_eq!(raw.games, "7");
    }

    #[test]
    fn test_data_row_is_not_a_header() {
        let row = cells(&["1", "מכבי ראשון", "7", "5", "2", "33"]);
        assert!(StandingsColumns::from_header(&row).is_none());
    }

    #[test]
    fn test_header_row_rejected_as_data() {
        let header = cells(&["מיקום", "קבוצה", "משחקים", "נצחונות", "הפסדים", "נקודות"]);
        let columns = StandingsColumns::from_header(&header).unwrap();

        let result = map_standings_row(&header, Some(&columns));
        assert!(matches!(result, Err(RowError::HeaderKeyword(_))));
    }

    #[test]
    fn test_positional_fallback_classic_layout() {
        let row = cells(&["3", "בני יהודה", "7", "5", "2", "33"]);
        let raw = map_standings_row(&row, None).unwrap();
        assert_eq!(raw.team, "בני יהודה");
        assert_eq!(raw.points, "33");
    }

    #[test]
    fn test_positional_fallback_wide_layout() {
        // position, points, then filler, wins/losses/games, then the name
        let row = cells(&[
            "3", "33", "x", "x", "x", "x", "5", "2", "7", "x", "בני יהודה",
        ]);
        let raw = map_standings_row(&row, None).unwrap();
        assert_eq!(raw.team, "בני יהודה");
        assert_eq!(raw.position, "3");
        assert_eq!(raw.points, "33");
        assert_eq!(raw.games, "7");
    }

    #[test]
    fn test_positional_fallback_rejects_implausible_rank() {
        let row = cells(&["999", "בני יהודה", "7", "5", "2", "33"]);
        assert!(matches!(
            map_standings_row(&row, None),
            Err(RowError::ImplausibleRank(999))
        ));
    }

    #[test]
    fn test_empty_team_name_rejected() {
        let row = cells(&["1", "", "7", "5", "2", "33"]);
        assert!(matches!(
            map_standings_row(&row, None),
            Err(RowError::MissingField("team name"))
        ));
    }

    #[test]
    fn test_keyword_team_name_rejected() {
        let row = cells(&["1", "קבוצה", "7", "5", "2", "33"]);
        assert!(matches!(
            map_standings_row(&row, None),
            Err(RowError::HeaderKeyword(_))
        ));
    }

    #[test]
    fn test_schedule_header_mapping() {
        let header = cells(&["תאריך", "שעה", "מארחת", "אורחת", "תוצאה", "אולם"]);
        let columns = ScheduleColumns::from_header(&header).unwrap();

        let row = cells(&["12/01/25", "19:30", "בני יהודה", "מכבי חיפה", "61 - 46", "היכל"]);
        let raw = map_schedule_row(&row, Some(&columns)).unwrap();
        assert_eq!(raw.date, "12/01/25");
        assert_eq!(raw.home, "בני יהודה");
        assert_eq!(raw.away, "מכבי חיפה");
        assert_eq!(raw.score, "61 - 46");
    }

    #[test]
    fn test_schedule_positional_fallback() {
        let row = cells(&["12/01/25", "19:30", "בני יהודה", "מכבי חיפה", "", ""]);
        let raw = map_schedule_row(&row, None).unwrap();
        assert_eq!(raw.time, "19:30");
        assert_eq!(raw.score, "");
    }

    #[test]
    fn test_schedule_header_row_rejected_as_data() {
        let header = cells(&["תאריך", "שעה", "מארחת", "אורחת", "תוצאה", "אולם"]);
        let columns = ScheduleColumns::from_header(&header).unwrap();
        assert!(matches!(
            map_schedule_row(&header, Some(&columns)),
            Err(RowError::HeaderKeyword(_))
        ));
    }
}
