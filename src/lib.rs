//! Field tournament organizer: library with models and business logic.

pub mod logic;
pub mod models;

pub use logic::{
    all_standings, calculate_standings, cancel_correction, check_reassignment, commit_correction,
    compute_standings, draw_groups, generate_finals, generate_group_stage, generate_schedule,
    import_teams_csv, publish, reassign_resource, record_score, remove_team, reschedule_unplayed,
    resolve_placeholder, resolve_placements, restore_team, round_robin_pairings, set_manual_tiebreak,
    start_correction, start_match, swap_matches, CorrectionOutcome, PlacementReport,
    ResourceChange, ScoreUpdate, UnresolvedTie,
};
pub use models::{
    BracketKey, ConfigurationError, ConflictReport, CorrectionSession, CriterionKind,
    FinalsConfig, GroupConfig, Match, MatchId, MatchStatus, Parallelism, Phase, PhaseTiming,
    PlacementCriterion, Placeholder, PointSystem, Precondition, Referee, RefereePolicy, Resource,
    Score, Standing, Team, TeamId, TeamRef, Tournament, TournamentConfig, TournamentError,
    TournamentId, TournamentState,
};
