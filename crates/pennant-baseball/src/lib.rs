pub mod aggregate;
pub mod collector;
pub mod dataset;
pub mod directory;
pub mod labels;
pub mod normalize;
pub mod postseason;
pub mod records;
pub mod season;

pub use aggregate::{AggregationEngine, AggregationReport, AprilSummary, TeamSeasonAggregate};
pub use collector::{CollectionError, GameLogCollection, RosterEntry, SeasonGameLogCollector, SiteUrls};
pub use dataset::{BaselineGames, DatasetError};
pub use directory::{MatchError, Resolution, TeamDirectory};
pub use labels::{assign_labels, LabelBook, LabelKind, LabeledGame};
pub use normalize::ParseError;
pub use records::{GameRecord, PostseasonRecord, SeasonLabels, Series, SeriesResult, TeamSeasonKey};
pub use season::SeasonRange;
