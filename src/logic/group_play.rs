//! Group stage: round-robin fixture generation per group.

use crate::models::{ConfigurationError, Fixture, Team, TeamId, TournamentConfig, TournamentError};

/// Round-robin pairings for one partition using the circle method.
///
/// One team stays fixed while the others rotate. Odd counts get a bye slot whose
/// pairings are dropped. Each repetition flips home/away. Returns `(round, home, away)`
/// with rounds numbered from 1 across all repetitions.
pub fn round_robin_pairings(teams: &[TeamId], repetitions: u32) -> Vec<(u32, TeamId, TeamId)> {
    if teams.len() < 2 {
        return Vec::new();
    }
    let mut slots: Vec<Option<TeamId>> = teams.iter().copied().map(Some).collect();
    if slots.len() % 2 == 1 {
        slots.push(None);
    }
    let n = slots.len();
    let rounds_per_cycle = (n - 1) as u32;

    let mut base: Vec<Vec<(TeamId, TeamId)>> = Vec::with_capacity(n - 1);
    for r in 0..n - 1 {
        let mut round = Vec::with_capacity(n / 2);
        for i in 0..n / 2 {
            if let (Some(a), Some(b)) = (slots[i], slots[n - 1 - i]) {
                // The fixed team would otherwise always be home.
                if i == 0 && r % 2 == 1 {
                    round.push((b, a));
                } else {
                    round.push((a, b));
                }
            }
        }
        base.push(round);
        slots[1..].rotate_right(1);
    }

    let mut pairings = Vec::with_capacity(base.iter().map(Vec::len).sum::<usize>() * repetitions as usize);
    for rep in 0..repetitions {
        for (r, round) in base.iter().enumerate() {
            let number = rep * rounds_per_cycle + r as u32 + 1;
            for &(home, away) in round {
                if rep % 2 == 1 {
                    pairings.push((number, away, home));
                } else {
                    pairings.push((number, home, away));
                }
            }
        }
    }
    pairings
}

/// Number of matches a partition of `teams` plays: `teams*(teams-1)/2 * repetitions`.
pub fn round_robin_match_count(teams: usize, repetitions: u32) -> usize {
    teams * teams.saturating_sub(1) / 2 * repetitions as usize
}

/// Active teams per partition, in registration order. Fails if a team's group is unknown
/// or a partition has fewer than 2 teams.
pub fn partition_teams(
    config: &TournamentConfig,
    teams: &[Team],
) -> Result<Vec<(Option<String>, Vec<TeamId>)>, TournamentError> {
    let active: Vec<&Team> = teams.iter().filter(|t| t.is_active()).collect();

    if config.groups.is_empty() {
        if let Some(t) = active.iter().find(|t| t.group.is_some()) {
            return Err(ConfigurationError::UnknownGroup {
                team: t.id,
                group: t.group.clone(),
            }
            .into());
        }
        let ids: Vec<TeamId> = active.iter().map(|t| t.id).collect();
        if ids.len() < 2 {
            return Err(ConfigurationError::NotEnoughTeams {
                group: None,
                teams: ids.len(),
            }
            .into());
        }
        return Ok(vec![(None, ids)]);
    }

    for t in &active {
        let known = t.group.as_deref().and_then(|g| config.group(g)).is_some();
        if !known {
            return Err(ConfigurationError::UnknownGroup {
                team: t.id,
                group: t.group.clone(),
            }
            .into());
        }
    }

    config
        .groups
        .iter()
        .map(|g| {
            let ids: Vec<TeamId> = active
                .iter()
                .filter(|t| t.group.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(&g.name)))
                .map(|t| t.id)
                .collect();
            if ids.len() < 2 {
                return Err(ConfigurationError::NotEnoughTeams {
                    group: Some(g.name.clone()),
                    teams: ids.len(),
                }
                .into());
            }
            Ok((Some(g.name.clone()), ids))
        })
        .collect()
}

/// Generate all group-stage fixtures.
///
/// Groups are interleaved round by round (round 1 of every group, then round 2, ...)
/// so all groups progress at the same pace.
pub fn generate_group_stage(config: &TournamentConfig, teams: &[Team]) -> Result<Vec<Fixture>, TournamentError> {
    let partitions = partition_teams(config, teams)?;

    let per_group: Vec<(Option<String>, Vec<(u32, TeamId, TeamId)>)> = partitions
        .into_iter()
        .map(|(group, ids)| {
            let pairings = round_robin_pairings(&ids, config.rounds);
            log::debug!(
                "Group {:?}: {} teams, {} matches",
                group,
                ids.len(),
                pairings.len()
            );
            (group, pairings)
        })
        .collect();

    let last_round = per_group
        .iter()
        .flat_map(|(_, p)| p.iter().map(|(r, _, _)| *r))
        .max()
        .unwrap_or(0);

    let mut fixtures = Vec::new();
    for round in 1..=last_round {
        for (group, pairings) in &per_group {
            fixtures.extend(
                pairings
                    .iter()
                    .filter(|(r, _, _)| *r == round)
                    .map(|&(r, home, away)| Fixture::group_stage(group.clone(), r, home, away)),
            );
        }
    }
    Ok(fixtures)
}
