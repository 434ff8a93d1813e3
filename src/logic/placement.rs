//! Placement resolution: turn placeholders into teams once the data behind them exists.
//!
//! The binding table is rebuilt from the match list every time and never stored. Final-stage
//! matches are visited in bracket dependency order so a semifinal only ever reads quarterfinal
//! slots that were already settled in the same pass. Matches that have started or finished keep
//! their participants; if the current data would now put someone else there, they are reported
//! as stale instead of being rewritten.

use crate::logic::standings::{calculate_standings, compare_scalar, group_complete};
use crate::models::{
    BracketKey, Match, MatchId, Placeholder, Side, Standing, TeamId, TeamRef, Tournament,
    TournamentError,
};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Teams a referenced placeholder cannot choose between.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct UnresolvedTie {
    pub placeholder: Placeholder,
    pub teams: Vec<TeamId>,
}

impl From<UnresolvedTie> for TournamentError {
    fn from(tie: UnresolvedTie) -> Self {
        TournamentError::UnresolvedTie {
            placeholder: tie.placeholder,
            teams: tie.teams,
        }
    }
}

/// Outcome of one resolution pass.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct PlacementReport {
    /// Unplayed final-stage matches whose slots changed in this pass.
    pub changed: Vec<MatchId>,
    /// Placeholders used by the bracket that need a manual tie-break.
    pub unresolved_ties: Vec<UnresolvedTie>,
    /// Started or finished final-stage matches whose participants no longer match the data.
    pub stale: Vec<MatchId>,
}

impl PlacementReport {
    /// First unresolved tie as an error, if any.
    pub fn check_ties(&self) -> Result<(), TournamentError> {
        match self.unresolved_ties.first() {
            Some(tie) => Err(tie.clone().into()),
            None => Ok(()),
        }
    }
}

/// Placeholder → team, plus placeholders blocked by a tie.
#[derive(Debug, Default)]
struct Bindings {
    table: BTreeMap<Placeholder, TeamId>,
    ties: BTreeMap<Placeholder, Vec<TeamId>>,
}

impl Bindings {
    fn slot_for(&self, source: &Placeholder) -> TeamRef {
        match self.table.get(source) {
            Some(id) => TeamRef::Team(*id),
            None => TeamRef::Placeholder(source.clone()),
        }
    }
}

/// Resolution target for every final-stage match, computed without touching the tournament.
struct Plan {
    bindings: Bindings,
    /// (match, desired side A, desired side B) in bracket order.
    slots: Vec<(MatchId, TeamRef, TeamRef)>,
}

fn rank_placeholder(group: Option<&str>, rank: u32) -> Placeholder {
    match group {
        Some(g) => Placeholder::group_rank(g, rank),
        None => Placeholder::TableRank(rank),
    }
}

/// Bind every rank of a finished table; tied positions go to `ties`.
fn bind_table(bindings: &mut Bindings, group: Option<&str>, table: &[Standing]) {
    for (i, row) in table.iter().enumerate() {
        let placeholder = rank_placeholder(group, i as u32 + 1);
        if row.tied {
            let teams = table
                .iter()
                .filter(|r| r.position == row.position)
                .map(|r| r.team_id)
                .collect();
            bindings.ties.insert(placeholder, teams);
        } else {
            bindings.table.insert(placeholder, row.team_id);
        }
    }
}

/// A match is locked once it has started, finished, or is being corrected.
fn is_locked(m: &Match) -> bool {
    !m.is_unplayed() || m.correction_in_progress
}

fn plan(tournament: &Tournament) -> Plan {
    let mut bindings = Bindings::default();
    let mut runners_up: Vec<Standing> = Vec::new();
    let mut tied_second: Option<Vec<TeamId>> = None;
    let mut all_groups_done = true;

    for group in tournament.partitions() {
        let group = group.as_deref();
        if !group_complete(tournament, group) {
            all_groups_done = false;
            continue;
        }
        let table = calculate_standings(
            &tournament.config,
            &tournament.teams,
            group,
            &tournament.matches,
            &tournament.manual_tiebreaks,
        );
        bind_table(&mut bindings, group, &table);
        match table.get(1) {
            Some(second) if !second.tied => runners_up.push(second.clone()),
            Some(second) => {
                let level = table.iter().filter(|r| r.position == second.position).map(|r| r.team_id);
                tied_second.get_or_insert_with(Vec::new).extend(level);
            }
            None => all_groups_done = false,
        }
    }

    if let (true, Some(teams)) = (all_groups_done, tied_second) {
        // A group without a clear runner-up blocks the cross-group comparison.
        bindings.ties.insert(Placeholder::BestSecond, teams);
    } else if all_groups_done && tournament.config.groups.len() >= 2 {
        runners_up.sort_by(|a, b| compare_scalar(&tournament.config, a, b));
        let best = &runners_up[0];
        let level: Vec<TeamId> = runners_up
            .iter()
            .filter(|r| compare_scalar(&tournament.config, best, r) == Ordering::Equal)
            .map(|r| r.team_id)
            .collect();
        if level.len() == 1 {
            bindings.table.insert(Placeholder::BestSecond, best.team_id);
        } else {
            bindings.ties.insert(Placeholder::BestSecond, level);
        }
    }

    let mut playoff: Vec<&Match> = tournament.matches.iter().filter(|m| m.bracket.is_some()).collect();
    playoff.sort_by_key(|m| m.bracket.map(BracketKey::order));

    let mut slots = Vec::with_capacity(playoff.len());
    for m in playoff {
        let desired = |side: Side| match m.source(side) {
            Some(source) => bindings.slot_for(source),
            None => m.team(side).clone(),
        };
        let (a, b) = (desired(Side::A), desired(Side::B));

        // Winners and losers come from the participants stored on the played match,
        // which may differ from `desired` after a correction.
        if let (Some(key), Some((winner, loser))) = (m.bracket, m.outcome()) {
            bindings.table.insert(Placeholder::Winner(key), winner);
            bindings.table.insert(Placeholder::Loser(key), loser);
        }
        slots.push((m.id, a, b));
    }

    Plan { bindings, slots }
}

/// Placeholders some final-stage match was generated from.
fn referenced(tournament: &Tournament) -> BTreeSet<Placeholder> {
    tournament
        .matches
        .iter()
        .flat_map(|m| m.source_a.iter().chain(m.source_b.iter()))
        .cloned()
        .collect()
}

/// Re-run resolution for every final-stage match and write the result into unplayed ones.
pub fn resolve_placements(tournament: &mut Tournament) -> PlacementReport {
    let Plan { bindings, slots } = plan(tournament);
    let used = referenced(tournament);
    let mut report = PlacementReport {
        unresolved_ties: bindings
            .ties
            .iter()
            .filter(|(p, _)| used.contains(*p))
            .map(|(p, teams)| UnresolvedTie {
                placeholder: p.clone(),
                teams: teams.clone(),
            })
            .collect(),
        ..PlacementReport::default()
    };

    for (id, a, b) in slots {
        let Ok(m) = tournament.get_match_mut(id) else { continue };
        if is_locked(m) {
            if m.team_a != a || m.team_b != b {
                log::warn!("Match {} was played with participants the current standings no longer give", m.number);
                report.stale.push(id);
            }
            continue;
        }
        if m.team_a != a || m.team_b != b {
            log::debug!("Match {}: {:?} vs {:?}", m.number, a, b);
            m.team_a = a;
            m.team_b = b;
            report.changed.push(id);
        }
    }

    for tie in &report.unresolved_ties {
        log::info!("{} needs a manual tie-break ({} teams)", tie.placeholder, tie.teams.len());
    }
    report
}

/// Current value of one placeholder.
///
/// `Ok(None)` means the data behind it is not complete yet; a tie that no enabled criterion
/// breaks is an `UnresolvedTie` error.
pub fn resolve_placeholder(tournament: &Tournament, placeholder: &Placeholder) -> Result<Option<TeamId>, TournamentError> {
    let Plan { bindings, .. } = plan(tournament);
    if let Some(id) = bindings.table.get(placeholder) {
        return Ok(Some(*id));
    }
    if let Some(teams) = bindings.ties.get(placeholder) {
        return Err(TournamentError::UnresolvedTie {
            placeholder: placeholder.clone(),
            teams: teams.clone(),
        });
    }
    Ok(None)
}

/// Locked final-stage matches that directly consume the result of `key`.
pub fn consumers(tournament: &Tournament, key: BracketKey) -> Vec<&Match> {
    tournament
        .matches
        .iter()
        .filter(|m| {
            m.source_a.iter().chain(m.source_b.iter()).any(|p| {
                matches!(p, Placeholder::Winner(k) | Placeholder::Loser(k) if *k == key)
            })
        })
        .filter(|m| is_locked(m))
        .collect()
}
