//! Manual edits after publication: move a match to another field or referee, or swap two
//! matches' slots. Every edit is checked against the whole match list first and either
//! applies completely or not at all.

use crate::logic::finals::prerequisites;
use crate::logic::results::require_published;
use crate::models::{
    ConflictReport, Match, MatchId, Parallelism, Precondition, Referee, RefereePolicy, Resource,
    Tournament, TournamentError,
};
use serde::Deserialize;

/// Requested change of field and/or referee. `None` keeps the current value.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
pub struct ResourceChange {
    pub field: Option<u32>,
    pub referee: Option<Referee>,
}

/// Only matches that have not started may move.
fn require_unplayed(m: &Match) -> Result<(), TournamentError> {
    if m.is_finished() {
        return Err(Precondition::MatchFinished.into());
    }
    if m.started {
        return Err(Precondition::MatchRunning.into());
    }
    Ok(())
}

fn validate_field(tournament: &Tournament, field: u32) -> Result<(), TournamentError> {
    if field == 0 || field > tournament.config.fields {
        return Err(TournamentError::FieldOutOfRange(field));
    }
    Ok(())
}

fn validate_referee(tournament: &Tournament, referee: Referee) -> Result<(), TournamentError> {
    let valid = match (tournament.config.referees, referee) {
        (RefereePolicy::Pool { size }, Referee::Pool(n)) => (1..=size).contains(&n),
        (RefereePolicy::Teams, Referee::Team(id)) => tournament.team(id).is_some_and(|t| t.is_active()),
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(TournamentError::InvalidReferee(referee))
    }
}

fn conflict(m: &Match, other: Option<&Match>, resource: Resource) -> ConflictReport {
    ConflictReport {
        match_id: m.id,
        conflicting_match: other.map(|o| o.id),
        resource,
    }
}

/// Field rules for `m` as it would stand: allowed set, then double booking.
fn field_conflict(tournament: &Tournament, m: &Match) -> Option<ConflictReport> {
    if !m.is_playoff() && !tournament.config.allowed_fields(m.group.as_deref()).contains(&m.field) {
        return Some(conflict(m, None, Resource::FieldNotAllowed(m.field)));
    }
    tournament
        .matches
        .iter()
        .find(|o| o.id != m.id && o.field == m.field && o.overlaps(m))
        .map(|o| conflict(m, Some(o), Resource::Field(m.field)))
}

fn referee_conflict(tournament: &Tournament, m: &Match) -> Option<ConflictReport> {
    let referee = m.referee?;
    if let Referee::Team(team) = referee {
        if m.involves(team) {
            return Some(conflict(m, None, Resource::Team(team)));
        }
        if let Some(o) = tournament.matches.iter().find(|o| o.id != m.id && o.involves(team) && o.overlaps(m)) {
            return Some(conflict(m, Some(o), Resource::Team(team)));
        }
    }
    tournament
        .matches
        .iter()
        .find(|o| o.id != m.id && o.referee == Some(referee) && o.overlaps(m))
        .map(|o| conflict(m, Some(o), Resource::Referee(referee)))
}

/// Teams of `m` playing or refereeing elsewhere at the same time.
fn team_conflict(tournament: &Tournament, m: &Match) -> Option<ConflictReport> {
    let teams = [m.team_a.team_id(), m.team_b.team_id()];
    for team in teams.into_iter().flatten() {
        let busy = tournament.matches.iter().find(|o| {
            o.id != m.id && o.overlaps(m) && (o.involves(team) || o.referee == Some(Referee::Team(team)))
        });
        if let Some(o) = busy {
            return Some(conflict(m, Some(o), Resource::Team(team)));
        }
    }
    None
}

/// Final-stage ordering: prerequisites end first, sequential-only matches stand alone.
fn bracket_conflict(tournament: &Tournament, m: &Match) -> Option<ConflictReport> {
    let key = m.bracket?;
    let needs = prerequisites(m.source_a.iter().chain(m.source_b.iter()));
    for o in tournament.matches.iter().filter(|o| o.id != m.id) {
        let Some(other_key) = o.bracket else { continue };
        if needs.contains(&other_key) && o.end > m.start {
            return Some(conflict(m, Some(o), Resource::Dependency));
        }
        let depends_on_m = prerequisites(o.source_a.iter().chain(o.source_b.iter())).contains(&key);
        if depends_on_m && m.end > o.start {
            return Some(conflict(m, Some(o), Resource::Dependency));
        }
        let sequential = m.parallelism == Parallelism::SequentialOnly || o.parallelism == Parallelism::SequentialOnly;
        if sequential && o.overlaps(m) {
            return Some(conflict(m, Some(o), Resource::Sequential));
        }
    }
    None
}

/// Apply `change` to a copy of the match and validate the new resources.
fn candidate(tournament: &Tournament, match_id: MatchId, change: ResourceChange) -> Result<Match, TournamentError> {
    let m = tournament.get_match(match_id)?;
    require_unplayed(m)?;
    let mut edited = m.clone();
    if let Some(field) = change.field {
        validate_field(tournament, field)?;
        edited.field = field;
    }
    if let Some(referee) = change.referee {
        validate_referee(tournament, referee)?;
        edited.referee = Some(referee);
    }
    Ok(edited)
}

/// Dry run: the first conflict the change would create, if any. Changes nothing.
pub fn check_reassignment(
    tournament: &Tournament,
    match_id: MatchId,
    change: ResourceChange,
) -> Result<Option<ConflictReport>, TournamentError> {
    let edited = candidate(tournament, match_id, change)?;
    let mut report = None;
    if change.field.is_some() {
        report = field_conflict(tournament, &edited);
    }
    if report.is_none() && change.referee.is_some() {
        report = referee_conflict(tournament, &edited);
    }
    Ok(report)
}

/// Move a match to another field and/or referee. The check is repeated here; a conflict
/// leaves the tournament untouched.
pub fn reassign_resource(tournament: &mut Tournament, match_id: MatchId, change: ResourceChange) -> Result<(), TournamentError> {
    require_published(tournament)?;
    if let Some(report) = check_reassignment(tournament, match_id, change)? {
        log::info!("Reassignment rejected: {:?}", report.resource);
        return Err(report.into());
    }
    let edited = candidate(tournament, match_id, change)?;
    let m = tournament.get_match_mut(match_id)?;
    m.field = edited.field;
    m.referee = edited.referee;
    log::info!("Match {} now on field {} (referee {:?})", m.number, m.field, m.referee);
    Ok(())
}

fn full_check(tournament: &Tournament, m: &Match) -> Option<ConflictReport> {
    field_conflict(tournament, m)
        .or_else(|| team_conflict(tournament, m))
        .or_else(|| referee_conflict(tournament, m))
        .or_else(|| bracket_conflict(tournament, m))
}

/// Exchange time, field and referee of two unplayed matches. Swapping again restores both.
pub fn swap_matches(tournament: &mut Tournament, first: MatchId, second: MatchId) -> Result<(), TournamentError> {
    require_published(tournament)?;
    if first == second {
        return Err(Precondition::SameMatch.into());
    }
    require_unplayed(tournament.get_match(first)?)?;
    require_unplayed(tournament.get_match(second)?)?;

    let mut staged = tournament.clone();
    let a = staged.get_match(first)?.clone();
    let b = staged.get_match(second)?.clone();
    {
        let m = staged.get_match_mut(first)?;
        m.start = b.start;
        m.end = b.end;
        m.field = b.field;
        m.referee = b.referee;
    }
    {
        let m = staged.get_match_mut(second)?;
        m.start = a.start;
        m.end = a.end;
        m.field = a.field;
        m.referee = a.referee;
    }

    for id in [first, second] {
        let m = staged.get_match(id)?;
        if let Some(report) = full_check(&staged, m) {
            log::info!("Swap rejected: {:?}", report.resource);
            return Err(report.into());
        }
    }

    *tournament = staged;
    log::info!("Swapped matches {} and {}", a.number, b.number);
    Ok(())
}
