//! Tournament business logic: generation, allocation, standings, placement, live edits.

mod correction;
mod editing;
mod finals;
mod group_play;
mod placement;
mod results;
mod roster;
mod scheduling;
mod setup;
mod standings;

pub use correction::{cancel_correction, commit_correction, start_correction, CorrectionOutcome};
pub use editing::{check_reassignment, reassign_resource, swap_matches, ResourceChange};
pub use finals::{generate_finals, prerequisites};
pub use group_play::{
    generate_group_stage, partition_teams, round_robin_match_count, round_robin_pairings,
};
pub use placement::{
    consumers, resolve_placeholder, resolve_placements, PlacementReport, UnresolvedTie,
};
pub use results::{record_score, start_match, ScoreUpdate};
pub use roster::{remove_team, restore_team};
pub use scheduling::{generate_schedule, reschedule_unplayed};
pub use setup::{draw_groups, import_teams_csv, publish};
pub use standings::{
    all_standings, calculate_standings, compare_scalar, compute_standings, group_complete,
    set_manual_tiebreak,
};
