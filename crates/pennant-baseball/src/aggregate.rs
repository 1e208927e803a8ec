// Early-season aggregation.
//
// Restricts games to one calendar month (April by default), computes each
// team-season's win rate in that month, joins postseason records to those
// aggregates, and counts the teams that won a series after a losing month.

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use crate::directory::Resolution;
use crate::labels::LabelBook;
use crate::records::{GameRecord, PostseasonRecord, SeasonLabels, SeriesResult, TeamSeasonKey};

pub const APRIL: u32 = 4;
pub const DEFAULT_WIN_PCT_THRESHOLD: f64 = 0.5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One team-season's record in the aggregation month.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamSeasonAggregate {
    pub year: i32,
    pub team: String,
    pub team_abbreviation: String,
    pub april_wins: u32,
    pub april_games_played: u32,
    /// `None` when no games were played in the month.
    pub april_win_pct: Option<f64>,
    pub labels: SeasonLabels,
}

impl TeamSeasonAggregate {
    pub fn key(&self) -> TeamSeasonKey {
        TeamSeasonKey::new(self.year, self.team_abbreviation.as_str())
    }
}

pub fn win_pct(wins: u32, games: u32) -> Option<f64> {
    (games > 0).then(|| f64::from(wins) / f64::from(games))
}

/// A postseason record left-joined to its team-season aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRecord {
    pub record: PostseasonRecord,
    pub aggregate: Option<TeamSeasonAggregate>,
}

impl JoinedRecord {
    pub fn win_pct(&self) -> Option<f64> {
        self.aggregate.as_ref().and_then(|a| a.april_win_pct)
    }
}

/// Headline numbers of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AprilSummary {
    /// Distinct postseason teams per year.
    pub playoff_teams_by_year: BTreeMap<i32, usize>,
    pub total_playoff_teams: usize,
    /// Distinct teams that won a series after a losing month.
    pub losing_april_series_winners: usize,
    /// The `(year, team)` pairs behind the count, sorted.
    pub qualifying_team_seasons: Vec<(i32, String)>,
}

/// Everything the aggregation stage produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationReport {
    pub aggregates: Vec<TeamSeasonAggregate>,
    pub joined: Vec<JoinedRecord>,
    pub summary: AprilSummary,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationEngine {
    month: u32,
    threshold: f64,
}

impl Default for AggregationEngine {
    fn default() -> Self {
        Self::new(APRIL, DEFAULT_WIN_PCT_THRESHOLD)
    }
}

impl AggregationEngine {
    pub fn new(month: u32, threshold: f64) -> Self {
        Self { month, threshold }
    }

    /// Group the month's games by team-season. Sorted by year, then team name.
    pub fn team_seasons(&self, games: &[GameRecord], book: &LabelBook) -> Vec<TeamSeasonAggregate> {
        let mut groups: BTreeMap<TeamSeasonKey, TeamSeasonAggregate> = BTreeMap::new();

        for game in games.iter().filter(|g| g.month == self.month) {
            let key = game.key();
            let entry = groups.entry(key.clone()).or_insert_with(|| TeamSeasonAggregate {
                year: game.year,
                team: game.team.clone(),
                team_abbreviation: game.team_abbreviation.clone(),
                april_wins: 0,
                april_games_played: 0,
                april_win_pct: None,
                labels: book.get(&key),
            });
            entry.april_games_played += 1;
            if game.is_win() {
                entry.april_wins += 1;
            }
        }

        let mut aggregates: Vec<TeamSeasonAggregate> = groups
            .into_values()
            .map(|mut a| {
                a.april_win_pct = win_pct(a.april_wins, a.april_games_played);
                a
            })
            .collect();
        aggregates.sort_by(|a, b| (a.year, &a.team).cmp(&(b.year, &b.team)));
        aggregates
    }

    /// Distinct team names per postseason year.
    pub fn playoff_teams_by_year(records: &[PostseasonRecord]) -> BTreeMap<i32, usize> {
        let mut teams: BTreeMap<i32, BTreeSet<&str>> = BTreeMap::new();
        for record in records {
            teams.entry(record.year).or_default().insert(record.team.as_str());
        }
        teams.into_iter().map(|(year, set)| (year, set.len())).collect()
    }

    /// Left join: every postseason record, with its team-season aggregate
    /// when the record resolved to a franchise that played in the month.
    pub fn join(&self, resolution: &Resolution, aggregates: &[TeamSeasonAggregate]) -> Vec<JoinedRecord> {
        let by_key: BTreeMap<TeamSeasonKey, &TeamSeasonAggregate> =
            aggregates.iter().map(|a| (a.key(), a)).collect();

        resolution
            .records
            .iter()
            .map(|resolved| {
                let aggregate = resolved.abbreviation.as_ref().and_then(|abbr| {
                    by_key
                        .get(&TeamSeasonKey::new(resolved.record.year, abbr.as_str()))
                        .map(|a| (*a).clone())
                });
                JoinedRecord {
                    record: resolved.record.clone(),
                    aggregate,
                }
            })
            .collect()
    }

    fn qualifies(&self, joined: &JoinedRecord) -> bool {
        joined.record.result == SeriesResult::Won
            && joined.win_pct().is_some_and(|pct| pct < self.threshold)
    }

    /// Run the whole stage.
    pub fn run(&self, games: &[GameRecord], book: &LabelBook, resolution: &Resolution) -> AggregationReport {
        let aggregates = self.team_seasons(games, book);
        let joined = self.join(resolution, &aggregates);

        let records: Vec<PostseasonRecord> =
            resolution.records.iter().map(|r| r.record.clone()).collect();
        let playoff_teams_by_year = Self::playoff_teams_by_year(&records);
        let total_playoff_teams = playoff_teams_by_year.values().sum();

        let qualifying: Vec<&JoinedRecord> = joined.iter().filter(|j| self.qualifies(j)).collect();
        let distinct_teams: BTreeSet<&str> =
            qualifying.iter().map(|j| j.record.team.as_str()).collect();
        let qualifying_team_seasons: Vec<(i32, String)> = qualifying
            .iter()
            .map(|j| (j.record.year, j.record.team.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let summary = AprilSummary {
            playoff_teams_by_year,
            total_playoff_teams,
            losing_april_series_winners: distinct_teams.len(),
            qualifying_team_seasons,
        };
        info!(
            "{} team-seasons aggregated; {} of {} postseason teams won a series after a losing month",
            aggregates.len(),
            summary.losing_april_series_winners,
            summary.total_playoff_teams
        );

        AggregationReport {
            aggregates,
            joined,
            summary,
        }
    }
}
