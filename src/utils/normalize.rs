//! Converts raw field text into typed, canonical records.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::warn;

use crate::models::{GameFixture, RowError, TeamStanding};
use crate::scrapers::mapper::{RawGame, RawStanding};

/// Which side of an "A - B" score string belongs to which team. The source
/// site has flipped this across redesigns; left-of-dash = away matches the
/// majority of observed layouts.
/// TODO: confirm against a round of live pages with known final scores.
pub const SCORE_LEFT_IS_AWAY: bool = true;

/// Venue text substituted when the source row has none
pub const DEFAULT_LOCATION: &str = "לא צוין";

pub fn normalize_standing(
    raw: &RawStanding,
    now: DateTime<Utc>,
) -> Result<TeamStanding, RowError> {
    let name = raw.team.trim();
    if name.is_empty() {
        return Err(RowError::MissingField("team name"));
    }
    let position: u32 = raw
        .position
        .trim()
        .parse()
        .map_err(|_| RowError::MissingField("position"))?;

    let games = parse_opt(&raw.games);
    let wins = parse_opt(&raw.wins);
    let losses = parse_opt(&raw.losses);
    if let (Some(g), Some(w), Some(l)) = (games, wins, losses) {
        if w + l != g {
            warn!(
                team = %name,
                wins = w,
                losses = l,
                games_played = g,
                "win/loss totals disagree with games played"
            );
        }
    }

    Ok(TeamStanding {
        name: name.to_string(),
        position,
        games_played: games.unwrap_or(0),
        wins: wins.unwrap_or(0),
        losses: losses.unwrap_or(0),
        points: parse_opt(&raw.points).unwrap_or(0),
        updated_at: now,
    })
}

pub fn normalize_game(raw: &RawGame) -> Result<GameFixture, RowError> {
    let home = raw.home.trim();
    let away = raw.away.trim();
    if home.is_empty() {
        return Err(RowError::MissingField("home team"));
    }
    if away.is_empty() {
        return Err(RowError::MissingField("away team"));
    }

    let game_date = parse_game_date(&raw.date, &raw.time)?;
    let (home_score, away_score, has_result) = match split_score(&raw.score) {
        Some((home_score, away_score)) => (home_score, away_score, true),
        None => (0, 0, false),
    };

    let venue = raw.venue.trim();
    Ok(GameFixture {
        game_date,
        home_team: home.to_string(),
        away_team: away.to_string(),
        home_score,
        away_score,
        location: if venue.is_empty() {
            DEFAULT_LOCATION.to_string()
        } else {
            venue.to_string()
        },
        has_result,
    })
}

/// Combines a `DD/MM/YY` date and an optional `HH:MM` time into one absolute
/// instant. Two-digit years are 2000-based. A malformed date rejects the row;
/// a malformed or missing time falls back to midnight.
pub fn parse_game_date(date: &str, time: &str) -> Result<DateTime<Utc>, RowError> {
    let malformed = || RowError::MalformedDate(date.trim().to_string());

    let parts: Vec<&str> = date.trim().split('/').collect();
    let [day, month, year] = parts[..] else {
        return Err(malformed());
    };
    let day: u32 = day.trim().parse().map_err(|_| malformed())?;
    let month: u32 = month.trim().parse().map_err(|_| malformed())?;
    let mut year: i32 = year.trim().parse().map_err(|_| malformed())?;
    if year < 100 {
        year += 2000;
    }
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(malformed)?;

    let time = parse_time(time).unwrap_or(NaiveTime::MIN);
    Ok(date.and_time(time).and_utc())
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    let (hours, minutes) = text.trim().split_once(':')?;
    NaiveTime::from_hms_opt(hours.parse().ok()?, minutes.parse().ok()?, 0)
}

/// Splits `"A - B"` into `(home, away)` scores under the fixed
/// [`SCORE_LEFT_IS_AWAY`] convention. `None` for anything that is not two
/// integers around a dash, typically a game that has not been played.
pub fn split_score(text: &str) -> Option<(u32, u32)> {
    let (left, right) = text.split_once('-')?;
    let left: u32 = left.trim().parse().ok()?;
    let right: u32 = right.trim().parse().ok()?;
    if SCORE_LEFT_IS_AWAY {
        Some((right, left))
    } else {
        Some((left, right))
    }
}

/// True for `DD/MM/YY`-shaped tokens; used by the table locator to sniff
/// schedule rows
pub fn looks_like_date(text: &str) -> bool {
    let parts: Vec<&str> = text.trim().split('/').collect();
    let [day, month, year] = parts[..] else {
        return false;
    };
    matches!(day.parse::<u32>(), Ok(1..=31))
        && matches!(month.parse::<u32>(), Ok(1..=12))
        && year.parse::<u32>().is_ok()
}

fn parse_opt(text: &str) -> Option<u32> {
    text.trim().parse().ok()
}
