// Delimited-text import and export.
//
// The labeled game log keeps the column names earlier exports used, so a
// previous run's file can be read back as a baseline.
// Outcome flags are written as 1.0 / 0.0.

use std::io::{Read, Write};
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::aggregate::TeamSeasonAggregate;
use crate::labels::LabelBook;
use crate::records::{GameRecord, PostseasonRecord, SeasonLabels};
use crate::season::SeasonRange;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Row schemas
// ---------------------------------------------------------------------------

/// One labeled game. Numeric columns are read as f64 because earlier
/// exports wrote some of them with a decimal point.
#[derive(Debug, Serialize, Deserialize)]
struct GameRow {
    #[serde(rename = "Team")]
    team: String,
    #[serde(rename = "Team Abv", default)]
    team_abbreviation: String,
    #[serde(rename = "Year")]
    year: f64,
    #[serde(rename = "Month")]
    month: f64,
    #[serde(rename = "Game Date")]
    game_date: String,
    #[serde(rename = "W")]
    wins: f64,
    #[serde(rename = "L")]
    losses: f64,
    #[serde(rename = "R")]
    runs_scored: f64,
    #[serde(rename = "RA")]
    runs_allowed: f64,
    #[serde(rename = "Postseason", default)]
    postseason: f64,
    #[serde(rename = "National League Pennant", default)]
    nl_pennant: f64,
    #[serde(rename = "American League Pennant", default)]
    al_pennant: f64,
    #[serde(rename = "World Series Champions", default)]
    world_series_champion: f64,
}

#[derive(Debug, Serialize)]
struct PostseasonRow<'a> {
    #[serde(rename = "Playoff Year")]
    year: i32,
    #[serde(rename = "Playoff Series")]
    series: &'a str,
    #[serde(rename = "Result")]
    result: &'a str,
    #[serde(rename = "Team")]
    team: &'a str,
}

#[derive(Debug, Serialize)]
struct AggregateRow<'a> {
    #[serde(rename = "Year")]
    year: i32,
    #[serde(rename = "Team")]
    team: &'a str,
    #[serde(rename = "Team Abv")]
    team_abbreviation: &'a str,
    #[serde(rename = "April Wins")]
    april_wins: u32,
    #[serde(rename = "April Games")]
    april_games_played: u32,
    #[serde(rename = "April Win Pct")]
    april_win_pct: Option<f64>,
    #[serde(rename = "Postseason")]
    postseason: f64,
    #[serde(rename = "National League Pennant")]
    nl_pennant: f64,
    #[serde(rename = "American League Pennant")]
    al_pennant: f64,
    #[serde(rename = "World Series Champions")]
    world_series_champion: f64,
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

/// Accepts `2019-04-05` and `2019-04-05 00:00:00`.
fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

impl GameRow {
    fn from_game(game: &GameRecord, labels: SeasonLabels) -> Self {
        Self {
            team: game.team.clone(),
            team_abbreviation: game.team_abbreviation.clone(),
            year: f64::from(game.year),
            month: f64::from(game.month),
            game_date: game.game_date.format("%Y-%m-%d").to_string(),
            wins: f64::from(game.wins),
            losses: f64::from(game.losses),
            runs_scored: f64::from(game.runs_scored),
            runs_allowed: f64::from(game.runs_allowed),
            postseason: flag(labels.postseason),
            nl_pennant: flag(labels.nl_pennant),
            al_pennant: flag(labels.al_pennant),
            world_series_champion: flag(labels.world_series_champion),
        }
    }

    fn into_game(self) -> Result<(GameRecord, SeasonLabels), String> {
        if !all_finite(&[
            self.year,
            self.wins,
            self.losses,
            self.runs_scored,
            self.runs_allowed,
        ]) {
            return Err(format!("non-finite value for '{}'", self.team.trim()));
        }
        let game_date = parse_iso_date(&self.game_date)
            .ok_or_else(|| format!("unreadable game date '{}'", self.game_date))?;

        let team = self.team.trim();
        let abbreviation = match self.team_abbreviation.trim() {
            "" => team,
            abbr => abbr,
        };
        let game = GameRecord::new(
            team,
            abbreviation,
            self.year.round() as i32,
            game_date,
            self.wins.round() as u32,
            self.losses.round() as u32,
            self.runs_scored.round() as u32,
            self.runs_allowed.round() as u32,
        );
        let labels = SeasonLabels {
            postseason: self.postseason > 0.0,
            nl_pennant: self.nl_pennant > 0.0,
            al_pennant: self.al_pennant > 0.0,
            world_series_champion: self.world_series_champion > 0.0,
        };
        Ok((game, labels))
    }
}

// ---------------------------------------------------------------------------
// Baseline loading
// ---------------------------------------------------------------------------

/// A previously exported, already labeled game log.
#[derive(Debug, Clone, Default)]
pub struct BaselineGames {
    pub games: Vec<GameRecord>,
    pub labels: LabelBook,
}

fn load_games_from_reader<R: Read>(rdr: R, range: &SeasonRange) -> Result<BaselineGames, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut baseline = BaselineGames::default();

    for result in reader.deserialize::<GameRow>() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!("skipping malformed game row: {}", e);
                continue;
            }
        };
        let (game, labels) = match row.into_game() {
            Ok(parsed) => parsed,
            Err(message) => {
                warn!("skipping game row: {}", message);
                continue;
            }
        };
        if !range.contains(game.year) {
            continue;
        }

        if let Some(previous) = baseline.labels.insert(game.key(), labels) {
            if previous != labels {
                warn!(
                    "inconsistent labels within team-season {}, keeping the later row",
                    game.key()
                );
            }
        }
        baseline.games.push(game);
    }
    Ok(baseline)
}

/// Load a labeled game log CSV, keeping only seasons inside `range`.
pub fn load_baseline(path: &Path, range: &SeasonRange) -> Result<BaselineGames, DatasetError> {
    let file = std::fs::File::open(path).map_err(|e| DatasetError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let baseline = load_games_from_reader(file, range).map_err(|e| DatasetError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;

    if baseline.games.is_empty() {
        return Err(DatasetError::Validation(format!(
            "{} produced zero games for {}-{}",
            path.display(),
            range.start_year,
            range.end_year
        )));
    }
    Ok(baseline)
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

pub fn write_games<W: Write>(wtr: W, games: &[GameRecord], book: &LabelBook) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(wtr);
    for labeled in book.attach(games) {
        writer.serialize(GameRow::from_game(labeled.game, labeled.labels))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_postseason<W: Write>(wtr: W, records: &[PostseasonRecord]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(wtr);
    for record in records {
        writer.serialize(PostseasonRow {
            year: record.year,
            series: record.series.label(),
            result: record.result.label(),
            team: &record.team,
        })?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_aggregates<W: Write>(wtr: W, aggregates: &[TeamSeasonAggregate]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(wtr);
    for a in aggregates {
        writer.serialize(AggregateRow {
            year: a.year,
            team: &a.team,
            team_abbreviation: &a.team_abbreviation,
            april_wins: a.april_wins,
            april_games_played: a.april_games_played,
            april_win_pct: a.april_win_pct,
            postseason: flag(a.labels.postseason),
            nl_pennant: flag(a.labels.nl_pennant),
            al_pennant: flag(a.labels.al_pennant),
            world_series_champion: flag(a.labels.world_series_champion),
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Create `path` and hand it to `write`, mapping errors to `DatasetError`.
pub fn write_file<F>(path: &Path, write: F) -> Result<(), DatasetError>
where
    F: FnOnce(std::fs::File) -> Result<(), csv::Error>,
{
    let file = std::fs::File::create(path).map_err(|e| DatasetError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    write(file).map_err(|e| DatasetError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Series, SeriesResult, TeamSeasonKey};

    const BASELINE: &str = "\
Gm#,Date,Tm,R,RA,W-L,Team,Team Abv,Game Date,Month,Year,W,L,Postseason,National League Pennant,American League Pennant,World Series Champions
1,\"Thursday, Apr 1\",ATL,2,3,0-1,Atlanta Braves,ATL,2021-04-01,4,2021,0,1,1.0,1.0,0.0,1.0
2,\"Saturday, Apr 3\",ATL,5.0,1.0,1-1,Atlanta Braves,ATL,2021-04-03 00:00:00,4,2021,1,1,1.0,1.0,0.0,1.0
1,\"Friday, Jul 24\",ATL,1,0,1-0,Atlanta Braves,ATL,2020-07-24,7,2020,1,0,1.0,0.0,0.0,0.0
1,\"Thursday, Apr 1\",SEA,x,0,1-0,Seattle Mariners,SEA,2021-04-01,4,2021,1,0,0.0,0.0,0.0,0.0
1,\"Thursday, Apr 1\",HOU,4,1,1-0,Houston Astros,HOU,not-a-date,4,2021,1,0,1.0,0.0,1.0,0.0
";

    fn range() -> SeasonRange {
        SeasonRange::new(2019, 2021)
    }

    #[test]
    fn baseline_rows_and_labels_loaded() {
        let baseline = load_games_from_reader(BASELINE.as_bytes(), &range()).unwrap();
        assert_eq!(baseline.games.len(), 2);

        let second = &baseline.games[1];
        assert_eq!(second.game_date, NaiveDate::from_ymd_opt(2021, 4, 3).unwrap());
        assert_eq!((second.runs_scored, second.runs_allowed), (5, 1));

        let labels = baseline.labels.get(&TeamSeasonKey::new(2021, "ATL"));
        assert!(labels.postseason && labels.nl_pennant && labels.world_series_champion);
        assert!(!labels.al_pennant);
    }

    #[test]
    fn baseline_drops_excluded_year() {
        let baseline = load_games_from_reader(BASELINE.as_bytes(), &range()).unwrap();
        assert!(baseline.games.iter().all(|g| g.year != 2020));
        assert_eq!(baseline.labels.len(), 1);
    }

    #[test]
    fn missing_abbreviation_falls_back_to_name() {
        let csv = "Team,Year,Month,Game Date,W,L,R,RA\nAtlanta Braves,2021,4,2021-04-01,1,0,3,2\n";
        let baseline = load_games_from_reader(csv.as_bytes(), &range()).unwrap();
        assert_eq!(baseline.games[0].team_abbreviation, "Atlanta Braves");
        assert!(!baseline.labels.get(&baseline.games[0].key()).any());
    }

    #[test]
    fn empty_baseline_file_is_a_validation_error() {
        let dir = std::env::temp_dir().join("pennant_dataset_empty_baseline");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("games.csv");
        std::fs::write(&path, "Team,Year,Month,Game Date,W,L,R,RA\n").unwrap();

        let err = load_baseline(&path, &range()).unwrap_err();
        assert!(matches!(err, DatasetError::Validation(_)));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_baseline_file_is_io_error() {
        let err = load_baseline(Path::new("/nonexistent/games.csv"), &range()).unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }

    #[test]
    fn exported_games_read_back_as_baseline() {
        let baseline = load_games_from_reader(BASELINE.as_bytes(), &range()).unwrap();
        let mut out = Vec::new();
        write_games(&mut out, &baseline.games, &baseline.labels).unwrap();

        let reread = load_games_from_reader(out.as_slice(), &range()).unwrap();
        assert_eq!(reread.games, baseline.games);
        assert_eq!(reread.labels, baseline.labels);
    }

    #[test]
    fn postseason_export_columns() {
        let records = vec![PostseasonRecord {
            year: 2021,
            series: Series::WorldSeries,
            result: SeriesResult::Won,
            team: "Atlanta Braves".into(),
        }];
        let mut out = Vec::new();
        write_postseason(&mut out, &records).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Playoff Year,Playoff Series,Result,Team\n2021,World Series,Won,Atlanta Braves\n"
        );
    }

    #[test]
    fn postseason_export_keeps_wild_card_spelling() {
        let records = vec![PostseasonRecord {
            year: 2021,
            series: Series::from_label("ALWC"),
            result: SeriesResult::Won,
            team: "Boston Red Sox".into(),
        }];
        let mut out = Vec::new();
        write_postseason(&mut out, &records).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().nth(1), Some("2021,ALWC,Won,Boston Red Sox"));
    }

    #[test]
    fn aggregate_export_leaves_missing_pct_blank() {
        let aggregates = vec![TeamSeasonAggregate {
            year: 2021,
            team: "Atlanta Braves".into(),
            team_abbreviation: "ATL".into(),
            april_wins: 0,
            april_games_played: 0,
            april_win_pct: None,
            labels: SeasonLabels::default(),
        }];
        let mut out = Vec::new();
        write_aggregates(&mut out, &aggregates).unwrap();
        let text = String::from_utf8(out).unwrap();
        let data_line = text.lines().nth(1).unwrap();
        assert_eq!(data_line, "2021,Atlanta Braves,ATL,0,0,,0.0,0.0,0.0,0.0");
    }
}
