// Season game log collection.
//
// For every season in range: read the standings page for the team roster,
// then each team's schedule-and-results table, one team at a time. A team
// (or a whole season) that cannot be read is logged and recorded as a
// failure; everything collected so far is kept.

use std::collections::BTreeMap;

use pennant_core::{FetchError, PageFetcher, Row, Table};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::normalize::{normalize_game_date, parse_runs, parse_win_loss_record, ParseError};
use crate::records::GameRecord;
use crate::season::SeasonRange;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("no table found on {url}")]
    MissingTable { url: String },

    #[error("table on {url} has no `{column}` column")]
    MissingColumn { url: String, column: &'static str },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// A unit of work that produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionFailure {
    pub year: i32,
    /// `None` when the whole season's roster could not be read.
    pub team: Option<String>,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Site layout
// ---------------------------------------------------------------------------

/// URL layout of the source site.
#[derive(Debug, Clone)]
pub struct SiteUrls {
    base_url: String,
}

impl SiteUrls {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn postseason(&self) -> String {
        format!("{}/postseason/", self.base_url)
    }

    pub fn standings(&self, year: i32) -> String {
        format!("{}/leagues/majors/{}-standings.shtml", self.base_url, year)
    }

    pub fn schedule(&self, abbreviation: &str, year: i32) -> String {
        format!(
            "{}/teams/{}/{}-schedule-scores.shtml",
            self.base_url, abbreviation, year
        )
    }
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// A team as listed on a season's standings page.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RosterEntry {
    pub name: String,
    pub abbreviation: String,
}

impl RosterEntry {
    pub fn new(name: &str, abbreviation: &str) -> Self {
        Self {
            name: name.to_string(),
            abbreviation: abbreviation.to_string(),
        }
    }
}

/// `/teams/ATL/2021.shtml` -> `ATL`.
pub fn abbreviation_from_href(href: &str) -> Option<String> {
    href.split('/')
        .nth(2)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Teams of the standings summary table. The first row (headers) and the
/// last row (league average) are not teams.
pub fn roster_from_table(table: &Table) -> Vec<RosterEntry> {
    let count = table.rows.len();
    if count < 3 {
        return Vec::new();
    }

    table.rows[1..count - 1]
        .iter()
        .filter_map(|row| {
            let Some((name, href)) = row.first_link() else {
                debug!("standings row without a team link");
                return None;
            };
            match abbreviation_from_href(href) {
                Some(abbreviation) => Some(RosterEntry::new(name, &abbreviation)),
                None => {
                    warn!("cannot read team abbreviation from link `{}`", href);
                    None
                }
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Schedule parsing
// ---------------------------------------------------------------------------

const GAME_NUMBER: &str = "Gm#";
const DATE: &str = "Date";
const RUNS_SCORED: &str = "R";
const RUNS_ALLOWED: &str = "RA";
const WIN_LOSS: &str = "W-L";

struct ScheduleColumns {
    game_number: usize,
    date: usize,
    runs_scored: usize,
    runs_allowed: usize,
    win_loss: usize,
}

impl ScheduleColumns {
    fn locate(table: &Table, url: &str) -> Result<Self, CollectionError> {
        let find = |column: &'static str| {
            table
                .column_index(column)
                .ok_or_else(|| CollectionError::MissingColumn {
                    url: url.to_string(),
                    column,
                })
        };
        Ok(Self {
            game_number: find(GAME_NUMBER)?,
            date: find(DATE)?,
            runs_scored: find(RUNS_SCORED)?,
            runs_allowed: find(RUNS_ALLOWED)?,
            win_loss: find(WIN_LOSS)?,
        })
    }
}

fn game_from_row(
    row: &Row,
    columns: &ScheduleColumns,
    team: &RosterEntry,
    year: i32,
) -> Result<GameRecord, ParseError> {
    let date = row.text_at(columns.date).ok_or(ParseError::Missing(DATE))?;
    let win_loss = row.text_at(columns.win_loss).ok_or(ParseError::Missing(WIN_LOSS))?;
    let scored = row
        .text_at(columns.runs_scored)
        .ok_or(ParseError::Missing(RUNS_SCORED))?;
    let allowed = row
        .text_at(columns.runs_allowed)
        .ok_or(ParseError::Missing(RUNS_ALLOWED))?;

    let game_date = normalize_game_date(date, year)?;
    let (wins, losses) = parse_win_loss_record(win_loss)?;
    Ok(GameRecord::new(
        &team.name,
        &team.abbreviation,
        year,
        game_date,
        wins,
        losses,
        parse_runs(scored)?,
        parse_runs(allowed)?,
    ))
}

/// Turn a schedule-and-results table into game records. Repeated header rows
/// are skipped; rows that fail to parse are dropped with a warning.
pub fn games_from_schedule(
    table: &Table,
    team: &RosterEntry,
    year: i32,
    url: &str,
) -> Result<Vec<GameRecord>, CollectionError> {
    let columns = ScheduleColumns::locate(table, url)?;

    let mut games = Vec::new();
    for row in table.body() {
        if row.text_at(columns.game_number) == Some(GAME_NUMBER) {
            continue;
        }
        match game_from_row(row, &columns, team, year) {
            Ok(game) => games.push(game),
            Err(e) => warn!("{} {}: dropping schedule row: {}", year, team.abbreviation, e),
        }
    }
    Ok(games)
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

/// Everything one collection run produced.
#[derive(Debug, Clone, Default)]
pub struct GameLogCollection {
    pub games: Vec<GameRecord>,
    pub rosters: BTreeMap<i32, Vec<RosterEntry>>,
    pub failures: Vec<CollectionFailure>,
}

/// Walks seasons and teams strictly in order through one shared fetcher.
pub struct SeasonGameLogCollector<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    urls: SiteUrls,
}

impl<'a, F: PageFetcher + ?Sized> SeasonGameLogCollector<'a, F> {
    pub fn new(fetcher: &'a F, urls: SiteUrls) -> Self {
        Self { fetcher, urls }
    }

    /// The roster is the last table of the rendered standings page.
    pub async fn fetch_roster(&self, year: i32) -> Result<Vec<RosterEntry>, CollectionError> {
        let url = self.urls.standings(year);
        let markup = self.fetcher.fetch_rendered_page(&url).await?;
        let tables = pennant_core::table::parse_tables(&markup).map_err(|e| {
            CollectionError::Fetch(FetchError::Table {
                url: url.clone(),
                source: e,
            })
        })?;
        let table = tables
            .last()
            .ok_or_else(|| CollectionError::MissingTable { url: url.clone() })?;
        Ok(roster_from_table(table))
    }

    pub async fn fetch_team_games(
        &self,
        team: &RosterEntry,
        year: i32,
    ) -> Result<Vec<GameRecord>, CollectionError> {
        let url = self.urls.schedule(&team.abbreviation, year);
        let tables = self.fetcher.fetch_tables(&url).await?;
        let table = tables
            .first()
            .ok_or_else(|| CollectionError::MissingTable { url: url.clone() })?;
        games_from_schedule(table, team, year, &url)
    }

    /// Collect every team's games for every season in `range`.
    pub async fn collect(&self, range: &SeasonRange) -> GameLogCollection {
        let mut collection = GameLogCollection::default();

        for year in range.years() {
            info!("Retrieving {} season data", year);
            let roster = match self.fetch_roster(year).await {
                Ok(roster) => roster,
                Err(e) => {
                    error!("{} roster unavailable: {}", year, e);
                    collection.failures.push(CollectionFailure {
                        year,
                        team: None,
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            info!("{}: {} teams on the standings page", year, roster.len());

            for team in &roster {
                match self.fetch_team_games(team, year).await {
                    Ok(games) => {
                        info!("{} {}: {} games", year, team.name, games.len());
                        collection.games.extend(games);
                    }
                    Err(e) => {
                        error!("{} {}: schedule unavailable: {}", year, team.name, e);
                        collection.failures.push(CollectionFailure {
                            year,
                            team: Some(team.name.clone()),
                            message: e.to_string(),
                        });
                    }
                }
            }

            collection.rosters.insert(year, roster);
        }

        info!(
            "Collected {} games, {} failures",
            collection.games.len(),
            collection.failures.len()
        );
        collection
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
