//! Roster changes that reach the bracket: once published, removing or restoring a team
//! changes the tables, so placements are resolved again.

use crate::logic::placement::{resolve_placements, PlacementReport};
use crate::models::{TeamId, Tournament, TournamentError, TournamentState};

fn replay(tournament: &mut Tournament) -> PlacementReport {
    match tournament.state {
        TournamentState::Draft => PlacementReport::default(),
        TournamentState::Published => resolve_placements(tournament),
    }
}

/// Remove a team. Drafts drop it entirely; published tournaments only mark it removed and
/// re-resolve every unplayed final-stage slot.
pub fn remove_team(tournament: &mut Tournament, id: TeamId) -> Result<PlacementReport, TournamentError> {
    tournament.remove_team(id)?;
    Ok(replay(tournament))
}

/// Undo a soft removal.
pub fn restore_team(tournament: &mut Tournament, id: TeamId) -> Result<PlacementReport, TournamentError> {
    tournament.restore_team(id)?;
    let report = replay(tournament);
    log::info!("Team {} restored", id);
    Ok(report)
}
