// The configured span of seasons.

use std::collections::BTreeSet;

/// The 2020 season was cut to 60 games and is left out of every analysis.
pub const SHORTENED_SEASON: i32 = 2020;

/// Inclusive `[start_year, end_year]` minus a set of excluded years.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonRange {
    pub start_year: i32,
    pub end_year: i32,
    pub excluded_years: BTreeSet<i32>,
}

impl SeasonRange {
    /// A range excluding only the shortened season.
    pub fn new(start_year: i32, end_year: i32) -> Self {
        Self {
            start_year,
            end_year,
            excluded_years: BTreeSet::from([SHORTENED_SEASON]),
        }
    }

    /// Exclude additional years. The shortened season stays excluded.
    pub fn with_excluded(mut self, years: impl IntoIterator<Item = i32>) -> Self {
        self.excluded_years.extend(years);
        self
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start_year..=self.end_year).contains(&year) && !self.excluded_years.contains(&year)
    }

    /// Years to process, ascending.
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        (self.start_year..=self.end_year).filter(move |y| !self.excluded_years.contains(y))
    }
}
