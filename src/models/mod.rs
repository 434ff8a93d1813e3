//! Data structures for the tournament: configuration, teams, matches, standings.

mod config;
mod error;
mod game;
mod standing;
mod team;
mod tournament;

pub use config::{
    default_criteria, CriterionKind, FinalsConfig, GroupConfig, PhaseTiming, PlacementCriterion,
    PointSystem, RefereePolicy, TournamentConfig,
};
pub use error::{ConfigurationError, ConflictReport, Precondition, Resource, TournamentError};
pub use game::{
    BracketKey, Fixture, Match, MatchId, MatchStatus, Parallelism, Phase, Placeholder, Referee,
    Score, Side, TeamRef,
};
pub use standing::Standing;
pub use team::{Team, TeamId};
pub use tournament::{CorrectionSession, ManualTiebreak, Tournament, TournamentId, TournamentState};
