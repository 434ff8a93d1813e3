//! Score correction on finished matches.
//!
//! `finished → correction_in_progress → finished`. Commit replays standings and placement
//! resolution on a staged copy and swaps it in only when everything succeeded. Final-stage
//! matches that were already played keep their participants; they are reported as stale.

use crate::logic::placement::{consumers, resolve_placements, PlacementReport};
use crate::logic::results::{affected_standings, check_score, require_published, ScoreUpdate};
use crate::models::{CorrectionSession, MatchId, Precondition, Score, Tournament, TournamentError};
use serde::Serialize;

/// Result of a committed correction.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CorrectionOutcome {
    pub update: ScoreUpdate,
    pub previous: Score,
    /// True if a played final-stage match no longer matches the corrected standings.
    pub stale_bracket: bool,
}

/// Open a correction on a finished match. Only one correction per tournament at a time.
pub fn start_correction(tournament: &mut Tournament, match_id: MatchId) -> Result<CorrectionSession, TournamentError> {
    require_published(tournament)?;
    if let Some(active) = tournament.correction {
        return Err(Precondition::CorrectionActive(active.match_id).into());
    }
    let m = tournament.get_match_mut(match_id)?;
    let original = m.score.ok_or(Precondition::MatchNotFinished)?;
    m.correction_in_progress = true;
    let number = m.number;
    let session = CorrectionSession { match_id, original };
    tournament.correction = Some(session);
    log::info!("Correction opened for match {}", number);
    Ok(session)
}

fn require_session(tournament: &Tournament, session: &CorrectionSession) -> Result<(), TournamentError> {
    match tournament.correction {
        None => Err(Precondition::NoActiveCorrection.into()),
        Some(active) if active != *session => Err(Precondition::SessionMismatch.into()),
        Some(_) => Ok(()),
    }
}

/// Overwrite the score and replay standings and placements.
///
/// Rejected when a final-stage match's winner would change after a match consuming that
/// result has started or finished.
pub fn commit_correction(
    tournament: &mut Tournament,
    session: &CorrectionSession,
    score_a: u32,
    score_b: u32,
) -> Result<CorrectionOutcome, TournamentError> {
    require_session(tournament, session)?;
    let score = Score::new(score_a, score_b);
    let m = tournament.get_match(session.match_id)?;
    check_score(m, score)?;

    if let Some(key) = m.bracket {
        let flips = (session.original.a > session.original.b) != (score.a > score.b);
        if flips {
            if let Some(consumer) = consumers(tournament, key).first() {
                return Err(Precondition::DownstreamConsumed(consumer.id).into());
            }
        }
    }

    let mut staged = tournament.clone();
    {
        let m = staged.get_match_mut(session.match_id)?;
        m.score = Some(score);
        m.correction_in_progress = false;
    }
    staged.correction = None;
    let placements: PlacementReport = resolve_placements(&mut staged);
    let (group, standings) = affected_standings(&staged, session.match_id)?;
    let stale_bracket = !placements.stale.is_empty();
    if stale_bracket {
        log::warn!(
            "Correction leaves {} played final-stage match(es) with outdated participants",
            placements.stale.len()
        );
    }

    *tournament = staged;
    log::info!(
        "Correction committed: {}:{} -> {}:{}",
        session.original.a,
        session.original.b,
        score_a,
        score_b
    );
    Ok(CorrectionOutcome {
        update: ScoreUpdate {
            match_id: session.match_id,
            group,
            standings,
            placements,
        },
        previous: session.original,
        stale_bracket,
    })
}

/// Leave the correction without changes; the original score stays.
pub fn cancel_correction(tournament: &mut Tournament, session: &CorrectionSession) -> Result<(), TournamentError> {
    require_session(tournament, session)?;
    let m = tournament.get_match_mut(session.match_id)?;
    m.score = Some(session.original);
    m.correction_in_progress = false;
    tournament.correction = None;
    log::info!("Correction cancelled");
    Ok(())
}
