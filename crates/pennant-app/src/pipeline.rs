// End-to-end run: postseason extraction, game logs, labels, aggregation,
// exports.
//
// Generic over `PageFetcher` so the binary can pass the throttled HTTP
// session and tests can pass an in-memory site.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use tracing::{info, warn};

use pennant_baseball::collector::CollectionFailure;
use pennant_baseball::dataset::{self, BaselineGames};
use pennant_baseball::postseason;
use pennant_baseball::{
    assign_labels, AggregationEngine, AggregationReport, GameRecord, LabelBook, SeasonGameLogCollector,
    SeasonRange, SiteUrls, TeamDirectory,
};
use pennant_core::PageFetcher;

use crate::config::Config;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Files written by one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub games: PathBuf,
    pub postseason: PathBuf,
    pub aggregates: PathBuf,
    pub summary: PathBuf,
}

impl ExportPaths {
    pub fn new(output_dir: &Path, range: &SeasonRange) -> Self {
        let suffix = format!("{}_to_{}", range.start_year, range.end_year);
        Self {
            games: output_dir.join(format!("games_{suffix}.csv")),
            postseason: output_dir.join(format!("postseason_{suffix}.csv")),
            aggregates: output_dir.join(format!("april_{suffix}.csv")),
            summary: output_dir.join("summary.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualifyingTeamSeason {
    pub year: i32,
    pub team: String,
}

/// Contents of `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub start_year: i32,
    pub end_year: i32,
    pub excluded_years: Vec<i32>,
    pub month: u32,
    pub win_pct_threshold: f64,
    pub games: usize,
    pub team_seasons: usize,
    pub postseason_records: usize,
    pub unresolved_team_names: Vec<String>,
    pub collection_failures: usize,
    pub playoff_teams_by_year: BTreeMap<i32, usize>,
    pub total_playoff_teams: usize,
    pub losing_april_series_winners: usize,
    pub qualifying_team_seasons: Vec<QualifyingTeamSeason>,
}

/// Everything a run produced, for the caller to report on.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub report: AggregationReport,
    pub labels: LabelBook,
    pub failures: Vec<CollectionFailure>,
    pub exports: ExportPaths,
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Where the game population came from.
struct GamePopulation {
    games: Vec<GameRecord>,
    directory: TeamDirectory,
    failures: Vec<CollectionFailure>,
    baseline_labels: Option<LabelBook>,
}

async fn gather_games<F>(
    fetcher: &F,
    urls: &SiteUrls,
    range: &SeasonRange,
    baseline_csv: Option<&str>,
) -> anyhow::Result<GamePopulation>
where
    F: PageFetcher + ?Sized,
{
    if let Some(path) = baseline_csv {
        let BaselineGames { games, labels } = dataset::load_baseline(Path::new(path), range)
            .with_context(|| format!("failed to load baseline game log {path}"))?;
        info!("Loaded {} baseline games from {}", games.len(), path);
        let directory = TeamDirectory::from_games(&games);
        return Ok(GamePopulation {
            games,
            directory,
            failures: Vec::new(),
            baseline_labels: Some(labels),
        });
    }

    let collector = SeasonGameLogCollector::new(fetcher, urls.clone());
    let collection = collector.collect(range).await;
    Ok(GamePopulation {
        directory: TeamDirectory::from_rosters(collection.rosters),
        games: collection.games,
        failures: collection.failures,
        baseline_labels: None,
    })
}

/// Warn about team-seasons whose stored flags disagree with the fresh labels.
fn compare_baseline_labels(stored: &LabelBook, fresh: &LabelBook) {
    let differing = fresh
        .iter()
        .filter(|(key, labels)| stored.get(key) != **labels)
        .count();
    if differing > 0 {
        warn!(
            "{} team-seasons in the baseline carry stale labels; using recomputed labels",
            differing
        );
    }
}

fn summarize(
    config: &Config,
    range: &SeasonRange,
    population: &GamePopulation,
    report: &AggregationReport,
    unresolved: Vec<String>,
    postseason_records: usize,
) -> RunSummary {
    let summary = &report.summary;
    RunSummary {
        start_year: range.start_year,
        end_year: range.end_year,
        excluded_years: range.excluded_years.iter().copied().collect(),
        month: config.analysis.month,
        win_pct_threshold: config.analysis.win_pct_threshold,
        games: population.games.len(),
        team_seasons: report.aggregates.len(),
        postseason_records,
        unresolved_team_names: unresolved,
        collection_failures: population.failures.len(),
        playoff_teams_by_year: summary.playoff_teams_by_year.clone(),
        total_playoff_teams: summary.total_playoff_teams,
        losing_april_series_winners: summary.losing_april_series_winners,
        qualifying_team_seasons: summary
            .qualifying_team_seasons
            .iter()
            .map(|(year, team)| QualifyingTeamSeason {
                year: *year,
                team: team.clone(),
            })
            .collect(),
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(summary).context("failed to serialize summary")?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Run every stage against `fetcher` and write the exports.
pub async fn run<F>(fetcher: &F, config: &Config) -> anyhow::Result<RunOutcome>
where
    F: PageFetcher + ?Sized,
{
    let range = config.season_range();
    let urls = SiteUrls::new(&config.source.base_url);
    info!(
        "Analyzing seasons {}-{} (excluding {:?})",
        range.start_year, range.end_year, range.excluded_years
    );

    let output_dir = PathBuf::from(&config.data.output_dir);
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;
    let exports = ExportPaths::new(&output_dir, &range);

    // 1. Postseason results
    let rows = postseason::fetch_rows(fetcher, &urls.postseason())
        .await
        .context("failed to read the postseason page")?;
    let records = postseason::extract(&rows, &range);

    // 2. Game population
    let population = gather_games(fetcher, &urls, &range, config.data.baseline_csv.as_deref()).await?;

    // 3. Team identity and labels
    let resolution = population.directory.resolve_all(&records);
    let labels = assign_labels(&population.games, &resolution);
    if let Some(stored) = &population.baseline_labels {
        compare_baseline_labels(stored, &labels);
    }
    let unresolved: Vec<String> = resolution
        .records
        .iter()
        .filter(|r| r.abbreviation.is_none())
        .map(|r| format!("{} {}", r.record.year, r.record.team))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    dataset::write_file(&exports.games, |f| dataset::write_games(f, &population.games, &labels))?;
    dataset::write_file(&exports.postseason, |f| dataset::write_postseason(f, &records))?;
    info!(
        "Wrote {} games to {}",
        population.games.len(),
        exports.games.display()
    );

    // 4. Aggregation
    let engine = AggregationEngine::new(config.analysis.month, config.analysis.win_pct_threshold);
    let report = engine.run(&population.games, &labels, &resolution);
    dataset::write_file(&exports.aggregates, |f| dataset::write_aggregates(f, &report.aggregates))?;

    let summary = summarize(config, &range, &population, &report, unresolved, records.len());
    write_summary(&exports.summary, &summary)?;
    info!("Wrote summary to {}", exports.summary.display());

    Ok(RunOutcome {
        summary,
        report,
        labels,
        failures: population.failures,
        exports,
    })
}
