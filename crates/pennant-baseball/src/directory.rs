// Team identity resolution.
//
// The postseason page and the standings pages print team names
// independently. Each season's standings give the authoritative
// (display name, abbreviation) pairs; a postseason name resolves to exactly
// one of them or it is a `MatchError`.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::warn;

use crate::collector::RosterEntry;
use crate::records::{GameRecord, PostseasonRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("no {year} team matches `{name}`")]
    NoMatch { year: i32, name: String },

    #[error("`{name}` matches several {year} teams: {}", .candidates.join(", "))]
    Ambiguous {
        year: i32,
        name: String,
        candidates: Vec<String>,
    },
}

/// A postseason record together with the franchise it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecord {
    pub record: PostseasonRecord,
    /// `None` when the name could not be resolved.
    pub abbreviation: Option<String>,
}

/// Outcome of resolving a batch of postseason records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Every input record, in input order.
    pub records: Vec<ResolvedRecord>,
    pub errors: Vec<MatchError>,
}

impl Resolution {
    /// Records attributed to the given franchise in the given year.
    pub fn for_team<'a>(
        &'a self,
        year: i32,
        abbreviation: &'a str,
    ) -> impl Iterator<Item = &'a PostseasonRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.record.year == year && r.abbreviation.as_deref() == Some(abbreviation))
            .map(|r| &r.record)
    }
}

/// Per-season roster of known teams.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamDirectory {
    seasons: BTreeMap<i32, Vec<RosterEntry>>,
}

impl TeamDirectory {
    pub fn from_rosters(rosters: BTreeMap<i32, Vec<RosterEntry>>) -> Self {
        let mut directory = Self::default();
        for (year, entries) in rosters {
            for entry in entries {
                directory.insert(year, entry);
            }
        }
        directory
    }

    /// Derive rosters from the teams present in a game log.
    pub fn from_games(games: &[GameRecord]) -> Self {
        let mut directory = Self::default();
        for game in games {
            directory.insert(
                game.year,
                RosterEntry::new(&game.team, &game.team_abbreviation),
            );
        }
        directory
    }

    fn insert(&mut self, year: i32, entry: RosterEntry) {
        let season = self.seasons.entry(year).or_default();
        if !season.contains(&entry) {
            season.push(entry);
        }
    }

    pub fn season(&self, year: i32) -> &[RosterEntry] {
        self.seasons.get(&year).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.seasons.keys().copied()
    }

    /// Resolve a display name for one season.
    ///
    /// An exact name match wins. Otherwise a roster entry matches when either
    /// name contains the other; exactly one franchise must match.
    pub fn resolve(&self, year: i32, name: &str) -> Result<&RosterEntry, MatchError> {
        let name = name.trim();
        let season = self.season(year);

        if let Some(entry) = season.iter().find(|e| e.name == name) {
            return Ok(entry);
        }

        let mut candidates: Vec<&RosterEntry> = season
            .iter()
            .filter(|e| !e.name.is_empty() && (name.contains(&e.name) || e.name.contains(name)))
            .collect();
        candidates.dedup_by(|a, b| a.abbreviation == b.abbreviation);

        match candidates.as_slice() {
            [entry] => Ok(*entry),
            [] => Err(MatchError::NoMatch {
                year,
                name: name.to_string(),
            }),
            many => Err(MatchError::Ambiguous {
                year,
                name: name.to_string(),
                candidates: many.iter().map(|e| e.name.clone()).collect(),
            }),
        }
    }

    /// Resolve every record. Failures are logged and kept in the result.
    pub fn resolve_all(&self, records: &[PostseasonRecord]) -> Resolution {
        let mut resolution = Resolution::default();
        for record in records {
            let abbreviation = match self.resolve(record.year, &record.team) {
                Ok(entry) => Some(entry.abbreviation.clone()),
                Err(e) => {
                    warn!("{} ({} {})", e, record.series, record.result);
                    resolution.errors.push(e);
                    None
                }
            };
            resolution.records.push(ResolvedRecord {
                record: record.clone(),
                abbreviation,
            });
        }
        resolution
    }
}
