// Postseason results extraction.
//
// The postseason page has one row per series across every year on record:
// a "YYYY Series Name" label and a single "Winner vs. Loser" cell. Rows are
// normalized, filtered to the configured seasons, and split into one record
// per team (all winners first, then all losers, each in source order).

use pennant_core::{PageFetcher, Table};
use tracing::{debug, info, warn};

use crate::collector::CollectionError;
use crate::normalize::{split_matchup, split_series_label, ParseError};
use crate::records::{PostseasonRecord, Series, SeriesResult};
use crate::season::SeasonRange;

/// Series label used for rounds that have not been played yet.
pub const FUTURE_SENTINEL: &str = "Future";

/// The winner/loser cell has no header; it is the third column.
const MATCHUP_COLUMN: usize = 2;

/// One row of the postseason table before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPostseasonRow {
    pub series: Option<String>,
    pub matchup: Option<String>,
}

impl RawPostseasonRow {
    pub fn new(series: &str, matchup: &str) -> Self {
        Self {
            series: Some(series.to_string()),
            matchup: Some(matchup.to_string()),
        }
    }
}

/// A fully normalized series, before the wide-to-long split.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SeriesOutcome {
    year: i32,
    series: Series,
    winner: String,
    loser: String,
}

/// Read raw rows out of the postseason table (header row skipped).
pub fn rows_from_table(table: &Table) -> Vec<RawPostseasonRow> {
    let series_col = table.column_index("Series").unwrap_or(0);
    table
        .body()
        .iter()
        .map(|row| RawPostseasonRow {
            series: row.text_at(series_col).map(str::to_string),
            matchup: row.text_at(MATCHUP_COLUMN).map(str::to_string),
        })
        .collect()
}

/// Fetch the postseason page and read the rows of its first table.
pub async fn fetch_rows<F>(fetcher: &F, url: &str) -> Result<Vec<RawPostseasonRow>, CollectionError>
where
    F: PageFetcher + ?Sized,
{
    let tables = fetcher.fetch_tables(url).await?;
    let table = tables
        .first()
        .ok_or_else(|| CollectionError::MissingTable {
            url: url.to_string(),
        })?;
    let rows = rows_from_table(table);
    info!("Read {} postseason rows from {}", rows.len(), url);
    Ok(rows)
}

fn parse_row(row: &RawPostseasonRow) -> Result<Option<SeriesOutcome>, ParseError> {
    let series = row.series.as_deref().ok_or(ParseError::Missing("series"))?;
    if series.trim() == FUTURE_SENTINEL {
        return Ok(None);
    }
    let matchup = row.matchup.as_deref().ok_or(ParseError::Missing("matchup"))?;

    let (year, series_name) = split_series_label(series)?;
    let (winner, loser) = split_matchup(matchup)?;
    Ok(Some(SeriesOutcome {
        year,
        series: Series::from_label(&series_name),
        winner,
        loser,
    }))
}

/// Normalize, filter and reshape raw rows into postseason records.
///
/// Malformed rows are logged and dropped. The result depends only on the
/// input.
pub fn extract(rows: &[RawPostseasonRow], range: &SeasonRange) -> Vec<PostseasonRecord> {
    let mut outcomes = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        match parse_row(row) {
            Ok(Some(outcome)) if range.contains(outcome.year) => outcomes.push(outcome),
            Ok(Some(outcome)) => {
                debug!(year = outcome.year, "postseason row outside season range");
            }
            Ok(None) => debug!(index, "skipping unplayed series"),
            Err(ParseError::Missing(field)) => {
                debug!(index, field, "skipping postseason row with missing field");
            }
            Err(e) => warn!("dropping postseason row {}: {}", index, e),
        }
    }

    let winners = outcomes.iter().map(|o| PostseasonRecord {
        year: o.year,
        series: o.series.clone(),
        result: SeriesResult::Won,
        team: o.winner.clone(),
    });
    let losers = outcomes.iter().map(|o| PostseasonRecord {
        year: o.year,
        series: o.series.clone(),
        result: SeriesResult::Lost,
        team: o.loser.clone(),
    });
    let records: Vec<PostseasonRecord> = winners.chain(losers).collect();

    info!(
        "Extracted {} postseason records from {} series",
        records.len(),
        outcomes.len()
    );
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use pennant_core::{Cell, Row};

    fn sample_rows() -> Vec<RawPostseasonRow> {
        vec![
            RawPostseasonRow::new("Future", "TBD vs. TBD"),
            RawPostseasonRow::new(
                "2021 World Series",
                "Atlanta Braves (88-73) vs. Houston Astros (95-67)",
            ),
            RawPostseasonRow::new(
                "2021 NLCS",
                "Atlanta Braves (88-73) vs. Los Angeles Dodgers* (106-56)",
            ),
            RawPostseasonRow::new("2020 World Series", "Los Angeles Dodgers vs. Tampa Bay Rays"),
            RawPostseasonRow::new("2004 World Series", "Boston Red Sox vs. St. Louis Cardinals"),
            RawPostseasonRow {
                series: Some("2021 ALCS".into()),
                matchup: None,
            },
            RawPostseasonRow::new("2021", "Nobody vs. Nobody"),
        ]
    }

    #[test]
    fn winners_then_losers_in_source_order() {
        let records = extract(&sample_rows(), &SeasonRange::new(2005, 2021));
        let summary: Vec<_> = records
            .iter()
            .map(|r| (r.series.label().to_string(), r.result, r.team.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("World Series".to_string(), SeriesResult::Won, "Atlanta Braves"),
                ("NLCS".to_string(), SeriesResult::Won, "Atlanta Braves"),
                ("World Series".to_string(), SeriesResult::Lost, "Houston Astros"),
                ("NLCS".to_string(), SeriesResult::Lost, "Los Angeles Dodgers"),
            ]
        );
    }

    #[test]
    fn each_series_has_one_winner_and_one_loser() {
        let records = extract(&sample_rows(), &SeasonRange::new(2005, 2021));
        for series in [Series::WorldSeries, Series::Nlcs] {
            let won = records
                .iter()
                .filter(|r| r.series == series && r.result == SeriesResult::Won)
                .count();
            let lost = records
                .iter()
                .filter(|r| r.series == series && r.result == SeriesResult::Lost)
                .count();
            assert_eq!((won, lost), (1, 1));
        }
    }

    #[test]
    fn excluded_and_out_of_range_years_dropped() {
        let records = extract(&sample_rows(), &SeasonRange::new(2004, 2021));
        assert!(records.iter().all(|r| r.year != 2020));
        assert!(records.iter().any(|r| r.year == 2004));

        let records = extract(&sample_rows(), &SeasonRange::new(2005, 2021));
        assert!(records.iter().all(|r| r.year == 2021));
    }

    #[test]
    fn extraction_is_repeatable() {
        let rows = sample_rows();
        let range = SeasonRange::new(2005, 2021);
        assert_eq!(extract(&rows, &range), extract(&rows, &range));
    }

    #[test]
    fn rows_read_from_table_by_position() {
        let table = Table::new(vec![
            Row::new(vec![Cell::text("Series"), Cell::text(""), Cell::text("")]),
            Row::new(vec![
                Cell::text("2021 World Series"),
                Cell::text("Oct 26-Nov 2"),
                Cell::text("Atlanta Braves (88-73) vs. Houston Astros (95-67)"),
            ]),
            Row::new(vec![Cell::text("Future")]),
        ]);
        let rows = rows_from_table(&table);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].series.as_deref(), Some("2021 World Series"));
        assert!(rows[0].matchup.as_deref().unwrap().starts_with("Atlanta"));
        assert_eq!(rows[1].matchup, None);
    }
}
