//! Error types returned by every engine operation.

use crate::models::config::CriterionKind;
use crate::models::game::{MatchId, Placeholder, Referee};
use crate::models::team::TeamId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Invalid tournament setup, always reported before anything is generated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigurationError {
    NoFields,
    NoRounds,
    ZeroMatchDuration,
    EmptyRefereePool,
    InvalidGroupName(String),
    DuplicateGroup(String),
    FieldOutOfRange { group: String, field: u32 },
    DuplicateCriterion(CriterionKind),
    DuplicateCriterionPosition(u32),
    /// At least one enabled criterion other than direct comparison is required.
    NoScalarCriterion,
    /// A partition (group or the whole table) has fewer than 2 active teams.
    NotEnoughTeams { group: Option<String>, teams: usize },
    /// Team assigned to a group the configuration does not have, or missing a group.
    UnknownGroup { team: TeamId, group: Option<String> },
    /// Final stage needs a rank a group or table cannot produce.
    GroupTooSmall { group: Option<String>, rank: u32 },
    /// Final-stage layout not supported for this group count.
    UnsupportedFinals { groups: usize },
    /// The allocator found no slot for a match.
    Unschedulable { match_number: u32 },
    /// Groups are drawn but none are configured.
    NoGroups,
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::NoFields => write!(f, "At least one field is required"),
            ConfigurationError::NoRounds => write!(f, "At least one round is required"),
            ConfigurationError::ZeroMatchDuration => write!(f, "Match duration must be positive"),
            ConfigurationError::EmptyRefereePool => write!(f, "Referee pool must not be empty"),
            ConfigurationError::InvalidGroupName(name) => write!(f, "Invalid group name '{}'", name),
            ConfigurationError::DuplicateGroup(name) => write!(f, "Group '{}' is defined twice", name),
            ConfigurationError::FieldOutOfRange { group, field } => {
                write!(f, "Group '{}' uses field {} which does not exist", group, field)
            }
            ConfigurationError::DuplicateCriterion(kind) => {
                write!(f, "Placement criterion {:?} is listed twice", kind)
            }
            ConfigurationError::DuplicateCriterionPosition(pos) => {
                write!(f, "Two placement criteria share position {}", pos)
            }
            ConfigurationError::NoScalarCriterion => {
                write!(f, "At least one placement criterion besides direct comparison must be enabled")
            }
            ConfigurationError::NotEnoughTeams { group, teams } => match group {
                Some(g) => write!(f, "Group '{}' needs at least 2 teams (has {})", g, teams),
                None => write!(f, "Need at least 2 teams (have {})", teams),
            },
            ConfigurationError::UnknownGroup { group, .. } => match group {
                Some(g) => write!(f, "Team is assigned to unknown group '{}'", g),
                None => write!(f, "Team has no group"),
            },
            ConfigurationError::GroupTooSmall { group, rank } => match group {
                Some(g) => write!(f, "Group '{}' has no rank {} for the final stage", g, rank),
                None => write!(f, "Table has no rank {} for the final stage", rank),
            },
            ConfigurationError::UnsupportedFinals { groups } => {
                write!(f, "Final stage not supported with {} groups", groups)
            }
            ConfigurationError::Unschedulable { match_number } => {
                write!(f, "No slot found for match {}", match_number)
            }
            ConfigurationError::NoGroups => write!(f, "No groups are configured"),
        }
    }
}

/// The precondition an operation found violated.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Precondition {
    NotDraft,
    NotPublished,
    MatchFinished,
    MatchNotFinished,
    MatchRunning,
    MatchUnresolved,
    PlayoffDraw,
    CorrectionActive(MatchId),
    NoActiveCorrection,
    SessionMismatch,
    SameMatch,
    /// A match that consumed this result has already started or finished.
    DownstreamConsumed(MatchId),
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precondition::NotDraft => write!(f, "tournament is already published"),
            Precondition::NotPublished => write!(f, "tournament is not published"),
            Precondition::MatchFinished => write!(f, "match is already finished"),
            Precondition::MatchNotFinished => write!(f, "match is not finished"),
            Precondition::MatchRunning => write!(f, "match is running"),
            Precondition::MatchUnresolved => write!(f, "match participants are not known yet"),
            Precondition::PlayoffDraw => write!(f, "final-stage matches need a winner"),
            Precondition::CorrectionActive(_) => write!(f, "another correction is in progress"),
            Precondition::NoActiveCorrection => write!(f, "no correction is in progress"),
            Precondition::SessionMismatch => write!(f, "correction session does not match"),
            Precondition::SameMatch => write!(f, "a match cannot be swapped with itself"),
            Precondition::DownstreamConsumed(_) => {
                write!(f, "a following match already used this result")
            }
        }
    }
}

/// Resource involved in a conflict.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Resource {
    Field(u32),
    Referee(Referee),
    /// A team playing (or refereeing) two overlapping matches.
    Team(TeamId),
    /// A final-stage match scheduled before a match it depends on ends.
    Dependency,
    /// A sequential-only final-stage match overlapping another final-stage match.
    Sequential,
    /// Field not in the group's allowed set.
    FieldNotAllowed(u32),
}

/// Structured description of a double booking.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConflictReport {
    /// The match being edited.
    pub match_id: MatchId,
    /// The other match holding the resource (None for rule violations on the match itself).
    pub conflicting_match: Option<MatchId>,
    pub resource: Resource,
}

/// Errors that can occur during tournament operations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TournamentError {
    Configuration(ConfigurationError),
    Conflict(ConflictReport),
    /// Teams tied after every enabled criterion; needs a manual decision.
    UnresolvedTie { placeholder: Placeholder, teams: Vec<TeamId> },
    InvalidState(Precondition),
    MatchNotFound(MatchId),
    TeamNotFound(TeamId),
    GroupNotFound(String),
    DuplicateTeamName,
    EmptyTeamName,
    InvalidReferee(Referee),
    FieldOutOfRange(u32),
    /// Manual tie-break order does not list each team of the group exactly once.
    InvalidTiebreakOrder,
    /// Roster import failed (line number, message).
    Import { line: u64, message: String },
}

impl fmt::Display for TournamentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TournamentError::Configuration(e) => write!(f, "Configuration error: {}", e),
            TournamentError::Conflict(c) => write!(f, "Conflict on {:?}", c.resource),
            TournamentError::UnresolvedTie { placeholder, teams } => {
                write!(f, "{} teams tied for {}; manual tie-break required", teams.len(), placeholder)
            }
            TournamentError::InvalidState(p) => write!(f, "Invalid state: {}", p),
            TournamentError::MatchNotFound(_) => write!(f, "Match not found"),
            TournamentError::TeamNotFound(_) => write!(f, "Team not found"),
            TournamentError::GroupNotFound(g) => write!(f, "Group '{}' not found", g),
            TournamentError::DuplicateTeamName => write!(f, "A team with this name already exists"),
            TournamentError::EmptyTeamName => write!(f, "Team name must not be empty"),
            TournamentError::InvalidReferee(_) => write!(f, "Referee does not exist"),
            TournamentError::FieldOutOfRange(field) => write!(f, "Field {} does not exist", field),
            TournamentError::InvalidTiebreakOrder => {
                write!(f, "Tie-break order must list every team of the group once")
            }
            TournamentError::Import { line, message } => {
                write!(f, "Import failed at line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for TournamentError {}

impl From<ConfigurationError> for TournamentError {
    fn from(e: ConfigurationError) -> Self {
        TournamentError::Configuration(e)
    }
}

impl From<Precondition> for TournamentError {
    fn from(p: Precondition) -> Self {
        TournamentError::InvalidState(p)
    }
}

impl From<ConflictReport> for TournamentError {
    fn from(c: ConflictReport) -> Self {
        TournamentError::Conflict(c)
    }
}
