// Text normalization for scraped fields.
//
// Each function turns one compound cell into typed atoms. Failures are
// row-level: callers drop the offending row and carry on.

use chrono::NaiveDate;
use pennant_core::table::normalize_ws;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("series label `{0}` has no space between year and series name")]
    SeriesLabel(String),

    #[error("`{0}` is not a year")]
    Year(String),

    #[error("matchup `{0}` is not of the form `winner vs. loser`")]
    Matchup(String),

    #[error("win-loss record `{0}` is not of the form W-L")]
    WinLoss(String),

    #[error("game date `{raw}` could not be read for {year}")]
    GameDate { raw: String, year: i32 },

    #[error("runs value `{0}` is not a whole number")]
    Runs(String),

    #[error("missing `{0}` field")]
    Missing(&'static str),
}

/// Split `"2019 World Series"` into `(2019, "World Series")`.
pub fn split_series_label(raw: &str) -> Result<(i32, String), ParseError> {
    let trimmed = raw.trim();
    let (year, series) = trimmed
        .split_once(char::is_whitespace)
        .ok_or_else(|| ParseError::SeriesLabel(raw.to_string()))?;

    let series = series.trim();
    if series.is_empty() {
        return Err(ParseError::SeriesLabel(raw.to_string()));
    }

    let year = year
        .parse::<i32>()
        .map_err(|_| ParseError::Year(year.to_string()))?;
    Ok((year, series.to_string()))
}

/// Split `"Team A* vs. Team B (4-3)"` into `("Team A", "Team B")`.
///
/// Asterisks are removed first; each side loses everything from its first
/// `(` onwards.
pub fn split_matchup(raw: &str) -> Result<(String, String), ParseError> {
    let cleaned = raw.replace('*', "");
    let (winner, loser) = cleaned
        .split_once("vs.")
        .ok_or_else(|| ParseError::Matchup(raw.to_string()))?;

    let winner = strip_parenthetical(winner);
    let loser = strip_parenthetical(loser);
    if winner.is_empty() || loser.is_empty() {
        return Err(ParseError::Matchup(raw.to_string()));
    }
    Ok((winner, loser))
}

fn strip_parenthetical(side: &str) -> String {
    let before = side.split('(').next().unwrap_or_default();
    normalize_ws(before)
}

/// Split `"95-67"` into `(95, 67)`.
pub fn parse_win_loss_record(raw: &str) -> Result<(u32, u32), ParseError> {
    let (wins, losses) = raw
        .trim()
        .split_once('-')
        .ok_or_else(|| ParseError::WinLoss(raw.to_string()))?;

    let wins = wins.trim().parse::<u32>();
    let losses = losses.trim().parse::<u32>();
    match (wins, losses) {
        (Ok(w), Ok(l)) => Ok((w, l)),
        _ => Err(ParseError::WinLoss(raw.to_string())),
    }
}

/// Turn a schedule date such as `"Tuesday, Apr 5 (1)"` into a calendar date
/// in the season's year.
///
/// Games played after December 31st still get `year`; the schedule pages do
/// not carry the calendar year.
pub fn normalize_game_date(raw: &str, year: i32) -> Result<NaiveDate, ParseError> {
    let err = || ParseError::GameDate {
        raw: raw.to_string(),
        year,
    };

    let cleaned = raw.replace("(1)", "").replace("(2)", "");
    let (_, rest) = cleaned.split_once(',').ok_or_else(err)?;
    let month_day = normalize_ws(rest.split(',').next().unwrap_or_default());
    if month_day.is_empty() {
        return Err(err());
    }

    NaiveDate::parse_from_str(&format!("{month_day} {year}"), "%b %d %Y").map_err(|_| err())
}

/// Read an R or RA cell. Whole-valued decimals (`"5.0"`) are accepted.
pub fn parse_runs(raw: &str) -> Result<u32, ParseError> {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<u32>() {
        return Ok(n);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && (0.0..=f64::from(u32::MAX)).contains(&v) && v.fract() == 0.0 => {
            Ok(v as u32)
        }
        _ => Err(ParseError::Runs(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- series labels --

    #[test]
    fn series_label_split_on_first_space() {
        assert_eq!(
            split_series_label("2019 World Series").unwrap(),
            (2019, "World Series".to_string())
        );
        assert_eq!(split_series_label("2021 ALCS").unwrap(), (2021, "ALCS".to_string()));
    }

    #[test]
    fn series_label_without_space_rejected() {
        assert_eq!(
            split_series_label("2019"),
            Err(ParseError::SeriesLabel("2019".into()))
        );
    }

    #[test]
    fn series_label_with_bad_year_rejected() {
        assert_eq!(
            split_series_label("Future Series"),
            Err(ParseError::Year("Future".into()))
        );
    }

    // -- matchups --

    #[test]
    fn matchup_strips_markers_and_scores() {
        assert_eq!(
            split_matchup("Team A* vs. Team B (4-3)").unwrap(),
            ("Team A".to_string(), "Team B".to_string())
        );
    }

    #[test]
    fn matchup_strips_season_records_on_both_sides() {
        assert_eq!(
            split_matchup("Atlanta Braves (88-73) vs. Houston Astros (95-67)").unwrap(),
            ("Atlanta Braves".to_string(), "Houston Astros".to_string())
        );
    }

    #[test]
    fn matchup_without_separator_rejected() {
        assert!(matches!(
            split_matchup("Atlanta Braves beat Houston Astros"),
            Err(ParseError::Matchup(_))
        ));
    }

    #[test]
    fn matchup_with_empty_side_rejected() {
        assert!(split_matchup(" vs. Houston Astros").is_err());
    }

    // -- win/loss --

    #[test]
    fn win_loss_parsed() {
        assert_eq!(parse_win_loss_record("95-67").unwrap(), (95, 67));
        assert_eq!(parse_win_loss_record(" 1-0 ").unwrap(), (1, 0));
    }

    #[test]
    fn win_loss_header_token_rejected() {
        assert_eq!(
            parse_win_loss_record("W-L"),
            Err(ParseError::WinLoss("W-L".into()))
        );
    }

    #[test]
    fn win_loss_without_hyphen_rejected() {
        assert!(parse_win_loss_record("95").is_err());
    }

    // -- dates --

    #[test]
    fn doubleheader_marker_removed() {
        let d = normalize_game_date("Tuesday, Apr 5 (1)", 2019).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2019, 4, 5).unwrap());
        let d = normalize_game_date("Tuesday, Apr 5 (2)", 2019).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2019, 4, 5).unwrap());
    }

    #[test]
    fn two_digit_day_and_nbsp() {
        let d = normalize_game_date("Sunday,\u{a0}Sep 29", 2019).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2019, 9, 29).unwrap());
    }

    #[test]
    fn nominal_year_kept_across_year_boundary() {
        let d = normalize_game_date("Friday, Jan 1", 2021).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
    }

    #[test]
    fn date_without_comma_rejected() {
        assert!(matches!(
            normalize_game_date("Date", 2019),
            Err(ParseError::GameDate { year: 2019, .. })
        ));
    }

    #[test]
    fn impossible_date_rejected() {
        assert!(normalize_game_date("Monday, Feb 30", 2019).is_err());
    }

    // -- runs --

    #[test]
    fn runs_accept_integers_and_whole_decimals() {
        assert_eq!(parse_runs("7").unwrap(), 7);
        assert_eq!(parse_runs("3.0").unwrap(), 3);
    }

    #[test]
    fn runs_reject_out_of_range_decimals() {
        assert!(matches!(parse_runs("1e20"), Err(ParseError::Runs(_))));
        assert!(matches!(parse_runs("-3.0"), Err(ParseError::Runs(_))));
        assert_eq!(parse_runs("4294967295.0"), Ok(u32::MAX));
    }

    #[test]
    fn runs_reject_blank_and_fractions() {
        assert!(parse_runs("").is_err());
        assert!(parse_runs("2.5").is_err());
        assert!(parse_runs("R").is_err());
    }
}
