//! Known column-label strings for the league site's tables, in every locale
//! seen so far. Matching is done on normalized text so that abbreviated
//! headers ("נצ'", "מש'") and full words both hit.

use crate::models::ScrapeKind;

pub const POSITION_LABELS: &[&str] = &["מיקום", "מקום", "דירוג", "position", "pos", "rank", "#"];
pub const TEAM_LABELS: &[&str] = &["קבוצה", "team", "club"];
pub const GAMES_LABELS: &[&str] = &["משחקים", "מש", "games", "played", "gp"];
pub const WINS_LABELS: &[&str] = &["נצחונות", "נצ", "wins"];
pub const LOSSES_LABELS: &[&str] = &["הפסדים", "הפ", "losses"];
pub const POINTS_LABELS: &[&str] = &["נקודות", "נק", "points", "pts"];

pub const DATE_LABELS: &[&str] = &["תאריך", "date"];
pub const TIME_LABELS: &[&str] = &["שעה", "time"];
pub const HOME_LABELS: &[&str] = &["מארחת", "בית", "home"];
pub const AWAY_LABELS: &[&str] = &["אורחת", "חוץ", "away", "visitor", "guest"];
pub const SCORE_LABELS: &[&str] = &["תוצאה", "score", "result"];
pub const VENUE_LABELS: &[&str] = &["אולם", "מגרש", "venue", "hall"];

/// Labels that only ever appear in one kind of table; used to tell a
/// standings table from a schedule table and to exclude cross-matches.
const STANDINGS_SIGNATURE: &[&str] = &[
    "מיקום", "משחקים", "נצחונות", "הפסדים", "נקודות", "position", "wins", "losses", "points",
    "played",
];
const SCHEDULE_SIGNATURE: &[&str] = &[
    "תאריך", "שעה", "מארחת", "אורחת", "תוצאה", "date", "time", "home", "away", "visitor",
];

/// Tokens that identify a header or navigation row masquerading as data.
/// A "team" whose name equals one of these is a mis-parsed header. Equality,
/// not containment: legitimate names may embed a keyword ("Team X").
pub const HEADER_KEYWORDS: &[&str] = &[
    "מיקום", "קבוצה", "מארחת", "אורחת", "ball", "team", "time", "date", "header",
];

pub fn signature_for(kind: ScrapeKind) -> &'static [&'static str] {
    match kind {
        ScrapeKind::Standings => STANDINGS_SIGNATURE,
        ScrapeKind::Schedule => SCHEDULE_SIGNATURE,
    }
}

/// True when the cell text matches any of the given labels. Short labels
/// (abbreviations) must match exactly; longer ones may appear inside a
/// compound header like "שם הקבוצה".
pub fn label_matches(cell: &str, labels: &[&str]) -> bool {
    let norm = normalize(cell);
    if norm.is_empty() {
        return false;
    }
    labels
        .iter()
        .any(|label| norm == *label || (label.chars().count() >= 3 && norm.contains(label)))
}

pub fn is_header_keyword(text: &str) -> bool {
    let norm = normalize(text);
    HEADER_KEYWORDS.iter().any(|keyword| norm == *keyword)
}

/// Lowercase, trimmed, with punctuation that decorates abbreviated Hebrew
/// headers stripped
fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .replace(['.', '\'', '׳', ':'], "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_matches_hebrew_abbreviations() {
        assert!(label_matches("נצ'", WINS_LABELS));
        assert!(label_matches("הפ'", LOSSES_LABELS));
        assert!(label_matches("מש'", GAMES_LABELS));
        assert!(label_matches("נקודות", POINTS_LABELS));
    }

    #[test]
    fn test_label_matches_compound_header() {
        assert!(label_matches("שם הקבוצה", TEAM_LABELS));
        assert!(label_matches("Team Name", TEAM_LABELS));
    }

    #[test]
    fn test_label_does_not_match_team_names() {
        assert!(!label_matches("מכבי תל אביב", TEAM_LABELS));
        assert!(!label_matches("", POSITION_LABELS));
        assert!(!label_matches("7", POSITION_LABELS));
    }

    #[test]
    fn test_header_keywords() {
        assert!(is_header_keyword("קבוצה"));
        assert!(is_header_keyword("מארחת"));
        assert!(is_header_keyword("Team"));
        assert!(!is_header_keyword("בני יהודה תל אביב"));
        // keyword inside a real name is not a header
        assert!(!is_header_keyword("Team X"));
    }

    #[test]
    fn test_signatures_are_disjoint() {
        for label in signature_for(ScrapeKind::Standings) {
            assert!(!signature_for(ScrapeKind::Schedule).contains(label));
        }
    }
}
