// Season-level outcome labels.
//
// Labels belong to a team-season, not to a game. They are computed once per
// team-season into a `LabelBook` and attached to game rows only when read.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::directory::Resolution;
use crate::records::{GameRecord, PostseasonRecord, SeasonLabels, Series, SeriesResult, TeamSeasonKey};

/// The four outcome flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    Postseason,
    WorldSeriesChampion,
    NlPennant,
    AlPennant,
}

impl LabelKind {
    pub const ALL: [LabelKind; 4] = [
        LabelKind::Postseason,
        LabelKind::WorldSeriesChampion,
        LabelKind::NlPennant,
        LabelKind::AlPennant,
    ];

    /// Whether a record already attributed to the team earns this label.
    pub fn is_earned_by(&self, record: &PostseasonRecord) -> bool {
        let won = |series: Series| record.series == series && record.result == SeriesResult::Won;
        match self {
            LabelKind::Postseason => true,
            LabelKind::WorldSeriesChampion => won(Series::WorldSeries),
            LabelKind::NlPennant => won(Series::Nlcs),
            LabelKind::AlPennant => won(Series::Alcs),
        }
    }
}

impl SeasonLabels {
    pub fn get(&self, kind: LabelKind) -> bool {
        match kind {
            LabelKind::Postseason => self.postseason,
            LabelKind::WorldSeriesChampion => self.world_series_champion,
            LabelKind::NlPennant => self.nl_pennant,
            LabelKind::AlPennant => self.al_pennant,
        }
    }

    pub fn set(&mut self, kind: LabelKind, value: bool) {
        match kind {
            LabelKind::Postseason => self.postseason = value,
            LabelKind::WorldSeriesChampion => self.world_series_champion = value,
            LabelKind::NlPennant => self.nl_pennant = value,
            LabelKind::AlPennant => self.al_pennant = value,
        }
    }
}

/// A game row viewed together with its team-season's labels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledGame<'a> {
    pub game: &'a GameRecord,
    pub labels: SeasonLabels,
}

/// Labels for every team-season, keyed by year and abbreviation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelBook {
    labels: BTreeMap<TeamSeasonKey, SeasonLabels>,
}

impl LabelBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels for a team-season; all false when unknown.
    pub fn get(&self, key: &TeamSeasonKey) -> SeasonLabels {
        self.labels.get(key).copied().unwrap_or_default()
    }

    /// Returns the previous labels, if any.
    pub fn insert(&mut self, key: TeamSeasonKey, labels: SeasonLabels) -> Option<SeasonLabels> {
        self.labels.insert(key, labels)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TeamSeasonKey, &SeasonLabels)> {
        self.labels.iter()
    }

    /// View every game with its team-season's labels.
    pub fn attach<'a>(&'a self, games: &'a [GameRecord]) -> impl Iterator<Item = LabeledGame<'a>> + 'a {
        games.iter().map(move |game| LabeledGame {
            game,
            labels: self.get(&game.key()),
        })
    }
}

/// Evaluate every label for one team-season.
pub fn labels_for(key: &TeamSeasonKey, resolution: &Resolution) -> SeasonLabels {
    let mut labels = SeasonLabels::default();
    for kind in LabelKind::ALL {
        let earned = resolution
            .for_team(key.year, &key.team)
            .any(|record| kind.is_earned_by(record));
        labels.set(kind, earned);
    }
    labels
}

/// Build the label book for every team-season present in `games`.
pub fn assign_labels(games: &[GameRecord], resolution: &Resolution) -> LabelBook {
    let mut book = LabelBook::new();
    for game in games {
        let key = game.key();
        if book.labels.contains_key(&key) {
            continue;
        }
        let labels = labels_for(&key, resolution);
        if labels.any() {
            debug!(team = %game.team, year = game.year, ?labels, "team-season labeled");
        }
        book.insert(key, labels);
    }

    let postseason_teams = book.iter().filter(|(_, l)| l.postseason).count();
    info!(
        "Labeled {} team-seasons ({} reached the postseason)",
        book.len(),
        postseason_teams
    );
    book
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::RosterEntry;
    use crate::directory::TeamDirectory;
    use chrono::NaiveDate;

    fn game(team: &str, abbr: &str, year: i32, day: u32) -> GameRecord {
        GameRecord::new(
            team,
            abbr,
            year,
            NaiveDate::from_ymd_opt(year, 4, day).unwrap(),
            0,
            0,
            1,
            0,
        )
    }

    fn record(year: i32, series: Series, result: SeriesResult, team: &str) -> PostseasonRecord {
        PostseasonRecord {
            year,
            series,
            result,
            team: team.to_string(),
        }
    }

    fn fixture() -> (Vec<GameRecord>, Resolution) {
        let games = vec![
            game("Atlanta Braves", "ATL", 2021, 1),
            game("Atlanta Braves", "ATL", 2021, 2),
            game("Houston Astros", "HOU", 2021, 1),
            game("Houston Astros", "HOU", 2021, 2),
            game("Boston Red Sox", "BOS", 2021, 1),
            game("Seattle Mariners", "SEA", 2021, 1),
            game("Atlanta Braves", "ATL", 2019, 1),
        ];
        let records = vec![
            record(2021, Series::WorldSeries, SeriesResult::Won, "Atlanta Braves"),
            record(2021, Series::Nlcs, SeriesResult::Won, "Atlanta Braves"),
            record(2021, Series::Alcs, SeriesResult::Won, "Houston Astros"),
            record(2021, Series::WorldSeries, SeriesResult::Lost, "Houston Astros"),
            record(2021, Series::Alcs, SeriesResult::Lost, "Boston Red Sox"),
        ];
        let directory = TeamDirectory::from_rosters(
            [(
                2021,
                vec![
                    RosterEntry::new("Atlanta Braves", "ATL"),
                    RosterEntry::new("Houston Astros", "HOU"),
                    RosterEntry::new("Boston Red Sox", "BOS"),
                    RosterEntry::new("Seattle Mariners", "SEA"),
                ],
            )]
            .into_iter()
            .collect(),
        );
        let resolution = directory.resolve_all(&records);
        (games, resolution)
    }

    #[test]
    fn champion_gets_every_applicable_label() {
        let (games, resolution) = fixture();
        let book = assign_labels(&games, &resolution);
        let atl = book.get(&TeamSeasonKey::new(2021, "ATL"));
        assert_eq!(
            atl,
            SeasonLabels {
                postseason: true,
                nl_pennant: true,
                al_pennant: false,
                world_series_champion: true,
            }
        );
    }

    #[test]
    fn labels_are_independent() {
        let (games, resolution) = fixture();
        let book = assign_labels(&games, &resolution);

        let hou = book.get(&TeamSeasonKey::new(2021, "HOU"));
        assert!(hou.postseason && hou.al_pennant);
        assert!(!hou.world_series_champion && !hou.nl_pennant);

        let bos = book.get(&TeamSeasonKey::new(2021, "BOS"));
        assert!(bos.postseason);
        assert!(!bos.al_pennant);

        assert_eq!(book.get(&TeamSeasonKey::new(2021, "SEA")), SeasonLabels::default());
    }

    #[test]
    fn labels_do_not_leak_across_years() {
        let (games, resolution) = fixture();
        let book = assign_labels(&games, &resolution);
        assert!(!book.get(&TeamSeasonKey::new(2019, "ATL")).any());
    }

    #[test]
    fn every_game_of_a_team_season_carries_the_same_flags() {
        let (games, resolution) = fixture();
        let book = assign_labels(&games, &resolution);

        let mut seen: BTreeMap<TeamSeasonKey, SeasonLabels> = BTreeMap::new();
        for labeled in book.attach(&games) {
            let prior = seen.entry(labeled.game.key()).or_insert(labeled.labels);
            assert_eq!(*prior, labeled.labels);
        }
        assert_eq!(seen.len(), book.len());
    }

    #[test]
    fn unresolved_records_earn_nothing() {
        let games = vec![game("Atlanta Braves", "ATL", 2021, 1)];
        let records = vec![record(2021, Series::WorldSeries, SeriesResult::Won, "Atlanta")];
        // Empty directory: nothing resolves.
        let resolution = TeamDirectory::default().resolve_all(&records);
        let book = assign_labels(&games, &resolution);
        assert!(!book.get(&TeamSeasonKey::new(2021, "ATL")).any());
        assert_eq!(resolution.errors.len(), 1);
    }

    #[test]
    fn set_and_get_cover_every_kind() {
        let mut labels = SeasonLabels::default();
        for kind in LabelKind::ALL {
            assert!(!labels.get(kind));
            labels.set(kind, true);
            assert!(labels.get(kind));
        }
    }
}
