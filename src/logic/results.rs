//! Live play: start a match, record its score, recompute standings and placements.

use crate::logic::placement::{resolve_placements, PlacementReport};
use crate::logic::standings::calculate_standings;
use crate::models::{
    Match, MatchId, Precondition, Score, Standing, Tournament, TournamentError, TournamentState,
};
use serde::Serialize;

/// Standings of the affected group plus what the bracket did with them.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ScoreUpdate {
    pub match_id: MatchId,
    /// Group of the match; None for final-stage matches and group-less tournaments.
    pub group: Option<String>,
    /// Table of that group (empty for final-stage matches).
    pub standings: Vec<Standing>,
    pub placements: PlacementReport,
}

pub(crate) fn require_published(tournament: &Tournament) -> Result<(), TournamentError> {
    if tournament.state != TournamentState::Published {
        return Err(Precondition::NotPublished.into());
    }
    Ok(())
}

/// Scores a match may take: final-stage matches need a winner.
pub(crate) fn check_score(m: &Match, score: Score) -> Result<(), TournamentError> {
    if m.is_playoff() && score.is_draw() {
        return Err(Precondition::PlayoffDraw.into());
    }
    Ok(())
}

/// Table of the match's group, or nothing for final-stage matches.
pub(crate) fn affected_standings(tournament: &Tournament, match_id: MatchId) -> Result<(Option<String>, Vec<Standing>), TournamentError> {
    let m = tournament.get_match(match_id)?;
    if m.is_playoff() {
        return Ok((None, Vec::new()));
    }
    let group = m.group.clone();
    let table = calculate_standings(
        &tournament.config,
        &tournament.teams,
        group.as_deref(),
        &tournament.matches,
        &tournament.manual_tiebreaks,
    );
    Ok((group, table))
}

/// Mark a scheduled match as running. Both participants must be known.
pub fn start_match(tournament: &mut Tournament, match_id: MatchId) -> Result<(), TournamentError> {
    require_published(tournament)?;
    let m = tournament.get_match_mut(match_id)?;
    if m.is_finished() {
        return Err(Precondition::MatchFinished.into());
    }
    if m.started {
        return Err(Precondition::MatchRunning.into());
    }
    if m.teams().is_none() {
        return Err(Precondition::MatchUnresolved.into());
    }
    m.started = true;
    log::info!("Match {} started", m.number);
    Ok(())
}

/// Record the final score of a match that has not been finished yet.
///
/// Recomputes the group table and re-resolves every final-stage placeholder.
/// Finished matches can only change through a correction.
pub fn record_score(tournament: &mut Tournament, match_id: MatchId, score_a: u32, score_b: u32) -> Result<ScoreUpdate, TournamentError> {
    require_published(tournament)?;
    let score = Score::new(score_a, score_b);
    {
        let m = tournament.get_match(match_id)?;
        if m.is_finished() {
            return Err(Precondition::MatchFinished.into());
        }
        if m.teams().is_none() {
            return Err(Precondition::MatchUnresolved.into());
        }
        check_score(m, score)?;
    }

    let m = tournament.get_match_mut(match_id)?;
    m.score = Some(score);
    m.started = true;
    log::info!("Match {} finished {}:{}", m.number, score_a, score_b);

    let placements = resolve_placements(tournament);
    let (group, standings) = affected_standings(tournament, match_id)?;
    Ok(ScoreUpdate {
        match_id,
        group,
        standings,
        placements,
    })
}
