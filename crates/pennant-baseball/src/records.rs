// Core record types shared by every stage of the pipeline.

use std::fmt;

use chrono::{Datelike, NaiveDate};

// ---------------------------------------------------------------------------
// Postseason
// ---------------------------------------------------------------------------

/// A postseason round.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Series {
    /// Wild-card round, keeping the site's spelling (`ALWC`, `AL Wild Card Game`, ...).
    AlWildCard(String),
    NlWildCard(String),
    Alds,
    Nlds,
    Alcs,
    Nlcs,
    WorldSeries,
    /// A label the site uses that has no dedicated variant.
    Other(String),
}

impl Series {
    /// Map a series name as printed on the postseason page.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            label @ ("ALWC" | "AL Wild Card" | "AL Wild Card Game" | "AL Wild Card Series") => {
                Series::AlWildCard(label.to_string())
            }
            label @ ("NLWC" | "NL Wild Card" | "NL Wild Card Game" | "NL Wild Card Series") => {
                Series::NlWildCard(label.to_string())
            }
            "ALDS" => Series::Alds,
            "NLDS" => Series::Nlds,
            "ALCS" => Series::Alcs,
            "NLCS" => Series::Nlcs,
            "World Series" => Series::WorldSeries,
            other => Series::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Series::AlWildCard(label) | Series::NlWildCard(label) => label,
            Series::Alds => "ALDS",
            Series::Nlds => "NLDS",
            Series::Alcs => "ALCS",
            Series::Nlcs => "NLCS",
            Series::WorldSeries => "World Series",
            Series::Other(label) => label,
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesResult {
    Won,
    Lost,
}

impl SeriesResult {
    pub fn label(&self) -> &'static str {
        match self {
            SeriesResult::Won => "Won",
            SeriesResult::Lost => "Lost",
        }
    }
}

impl fmt::Display for SeriesResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One team's side of one postseason series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostseasonRecord {
    pub year: i32,
    pub series: Series,
    pub result: SeriesResult,
    /// Display name as printed on the postseason page.
    pub team: String,
}

// ---------------------------------------------------------------------------
// Game logs
// ---------------------------------------------------------------------------

/// Identifies a team-season by year and franchise abbreviation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TeamSeasonKey {
    pub year: i32,
    pub team: String,
}

impl TeamSeasonKey {
    pub fn new(year: i32, team: impl Into<String>) -> Self {
        Self {
            year,
            team: team.into(),
        }
    }
}

impl fmt::Display for TeamSeasonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.year, self.team)
    }
}

/// One scheduled game from a team's point of view. `wins` and `losses` are
/// the team's record after this game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub team: String,
    pub team_abbreviation: String,
    pub year: i32,
    pub month: u32,
    pub game_date: NaiveDate,
    pub wins: u32,
    pub losses: u32,
    pub runs_scored: u32,
    pub runs_allowed: u32,
}

impl GameRecord {
    /// Build a record, deriving `month` from `game_date`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        team: &str,
        team_abbreviation: &str,
        year: i32,
        game_date: NaiveDate,
        wins: u32,
        losses: u32,
        runs_scored: u32,
        runs_allowed: u32,
    ) -> Self {
        Self {
            team: team.to_string(),
            team_abbreviation: team_abbreviation.to_string(),
            year,
            month: game_date.month(),
            game_date,
            wins,
            losses,
            runs_scored,
            runs_allowed,
        }
    }

    pub fn key(&self) -> TeamSeasonKey {
        TeamSeasonKey::new(self.year, self.team_abbreviation.as_str())
    }

    /// Decided by the score, not the W-L column.
    pub fn is_win(&self) -> bool {
        self.runs_scored > self.runs_allowed
    }

    pub fn games_played(&self) -> u32 {
        self.wins + self.losses
    }
}

// ---------------------------------------------------------------------------
// Season labels
// ---------------------------------------------------------------------------

/// Season-level outcome flags for one team-season.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeasonLabels {
    pub postseason: bool,
    pub nl_pennant: bool,
    pub al_pennant: bool,
    pub world_series_champion: bool,
}

impl SeasonLabels {
    pub fn any(&self) -> bool {
        self.postseason || self.nl_pennant || self.al_pennant || self.world_series_champion
    }
}
