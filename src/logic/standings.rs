//! Standings: fold finished group results into table rows and rank them.
//!
//! Ranking walks the enabled criteria in configured order and splits every block of
//! still-equal teams by the next criterion. Direct comparison only ever splits a block of
//! exactly two teams, at its own position and again for pairs left after the last criterion.
//! Blocks that survive every criterion (and any manual tie-break) keep registration order
//! and are flagged `tied`; that order carries no meaning.

use crate::logic::placement::{resolve_placements, PlacementReport};
use crate::models::{
    CriterionKind, ManualTiebreak, Match, Standing, Team, TeamId, Tournament, TournamentConfig,
    TournamentError, TournamentState,
};
use std::cmp::Ordering;
use std::collections::HashMap;

fn same_group(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    }
}

/// Finished group-stage matches of `group` with both teams known.
fn finished_in_group<'a>(matches: &'a [Match], group: Option<&'a str>) -> impl Iterator<Item = (&'a Match, TeamId, TeamId)> + 'a {
    matches.iter().filter_map(move |m| {
        if m.is_playoff() || !same_group(m.group.as_deref(), group) || !m.is_finished() {
            return None;
        }
        let (a, b) = m.teams()?;
        Some((m, a, b))
    })
}

/// Value of a scalar criterion; higher is better.
fn scalar(kind: CriterionKind, s: &Standing) -> i64 {
    match kind {
        CriterionKind::Points => i64::from(s.points),
        CriterionKind::Wins => i64::from(s.won),
        CriterionKind::GoalDifference => s.goal_difference(),
        CriterionKind::GoalsFor => i64::from(s.goals_for),
        CriterionKind::GoalsAgainst => -i64::from(s.goals_against),
        CriterionKind::DirectComparison => 0,
    }
}

/// Compare two rows (possibly from different groups) on the enabled scalar criteria.
/// `Less` means `a` ranks ahead of `b`.
pub fn compare_scalar(config: &TournamentConfig, a: &Standing, b: &Standing) -> Ordering {
    config
        .enabled_criteria()
        .into_iter()
        .filter(|k| *k != CriterionKind::DirectComparison)
        .map(|k| scalar(k, b).cmp(&scalar(k, a)))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Head-to-head points and goal difference of `a` against `b`.
fn head_to_head(config: &TournamentConfig, matches: &[Match], group: Option<&str>, a: TeamId, b: TeamId) -> (i64, i64) {
    let mut row = Standing::new(a, None);
    for (m, x, y) in finished_in_group(matches, group) {
        let Some(score) = m.score else { continue };
        if x == a && y == b {
            row.record(score.a, score.b, &config.points);
        } else if x == b && y == a {
            row.record(score.b, score.a, &config.points);
        }
    }
    (i64::from(row.points), row.goal_difference())
}

/// Split `block` into runs of equal `key`, best first. Stable within a run.
fn split_by<K: Ord + Copy>(block: Vec<usize>, key: impl Fn(usize) -> K) -> Vec<Vec<usize>> {
    let mut sorted = block;
    sorted.sort_by(|x, y| key(*y).cmp(&key(*x)));
    let mut runs: Vec<Vec<usize>> = Vec::new();
    for idx in sorted {
        match runs.last_mut() {
            Some(run) if key(run[0]) == key(idx) => run.push(idx),
            _ => runs.push(vec![idx]),
        }
    }
    runs
}

/// Pure standings for one partition. Never touches the tournament.
///
/// `teams` gives registration order; removed teams and teams of other groups are skipped.
/// Matches against removed teams still count for their opponents.
pub fn calculate_standings(
    config: &TournamentConfig,
    teams: &[Team],
    group: Option<&str>,
    matches: &[Match],
    manual: &[ManualTiebreak],
) -> Vec<Standing> {
    let group_name: Option<String> = group.map(str::to_string);
    let mut rows: Vec<Standing> = teams
        .iter()
        .filter(|t| t.is_active() && same_group(t.group.as_deref(), group))
        .map(|t| Standing::new(t.id, group_name.clone()))
        .collect();
    let index: HashMap<TeamId, usize> = rows.iter().enumerate().map(|(i, r)| (r.team_id, i)).collect();

    for (m, a, b) in finished_in_group(matches, group) {
        let Some(score) = m.score else { continue };
        if let Some(&i) = index.get(&a) {
            rows[i].record(score.a, score.b, &config.points);
        }
        if let Some(&i) = index.get(&b) {
            rows[i].record(score.b, score.a, &config.points);
        }
    }

    let head_to_head_split = |block: Vec<usize>| -> Vec<Vec<usize>> {
        let (x, y) = (block[0], block[1]);
        let (tx, ty) = (rows[x].team_id, rows[y].team_id);
        let hx = head_to_head(config, matches, group, tx, ty);
        let hy = head_to_head(config, matches, group, ty, tx);
        match hx.cmp(&hy) {
            Ordering::Greater => vec![vec![x], vec![y]],
            Ordering::Less => vec![vec![y], vec![x]],
            Ordering::Equal => vec![block],
        }
    };

    let criteria = config.enabled_criteria();
    let mut blocks: Vec<Vec<usize>> = vec![(0..rows.len()).collect()];
    for &kind in &criteria {
        blocks = blocks
            .into_iter()
            .flat_map(|block| match kind {
                _ if block.len() < 2 => vec![block],
                CriterionKind::DirectComparison if block.len() == 2 => head_to_head_split(block),
                // Not enough to break a tie of three or more.
                CriterionKind::DirectComparison => vec![block],
                _ => split_by(block, |i| scalar(kind, &rows[i])),
            })
            .collect();
    }
    // A later criterion may have cut a larger block down to two teams.
    if criteria.contains(&CriterionKind::DirectComparison) {
        blocks = blocks
            .into_iter()
            .flat_map(|block| if block.len() == 2 { head_to_head_split(block) } else { vec![block] })
            .collect();
    }

    let manual_order = manual
        .iter()
        .find(|t| same_group(t.group.as_deref(), group))
        .map(|t| t.order.as_slice())
        .unwrap_or(&[]);
    blocks = blocks
        .into_iter()
        .flat_map(|block| {
            let covered = block.iter().all(|&i| manual_order.contains(&rows[i].team_id));
            if block.len() > 1 && covered {
                // Lower manual index ranks first.
                split_by(block, |i| {
                    let pos = manual_order.iter().position(|id| *id == rows[i].team_id);
                    std::cmp::Reverse(pos.unwrap_or(usize::MAX))
                })
            } else {
                vec![block]
            }
        })
        .collect();

    let mut position = 1;
    let mut ordered = Vec::with_capacity(rows.len());
    for block in blocks {
        let tied = block.len() > 1;
        for &i in &block {
            let mut row = rows[i].clone();
            row.position = position;
            row.tied = tied;
            ordered.push(row);
        }
        position += block.len() as u32;
    }
    ordered
}

/// Standings of one group (None for tournaments without groups). Read-only; callable any time.
pub fn compute_standings(tournament: &Tournament, group: Option<&str>) -> Result<Vec<Standing>, TournamentError> {
    let group = tournament.resolve_group(group)?;
    Ok(calculate_standings(
        &tournament.config,
        &tournament.teams,
        group.as_deref(),
        &tournament.matches,
        &tournament.manual_tiebreaks,
    ))
}

/// Standings of every partition in configured order.
pub fn all_standings(tournament: &Tournament) -> Vec<(Option<String>, Vec<Standing>)> {
    tournament
        .partitions()
        .into_iter()
        .map(|group| {
            let table = calculate_standings(
                &tournament.config,
                &tournament.teams,
                group.as_deref(),
                &tournament.matches,
                &tournament.manual_tiebreaks,
            );
            (group, table)
        })
        .collect()
}

/// True once every group-stage match of `group` has a score.
pub fn group_complete(tournament: &Tournament, group: Option<&str>) -> bool {
    let mut matches = tournament
        .matches
        .iter()
        .filter(|m| !m.is_playoff() && same_group(m.group.as_deref(), group))
        .peekable();
    matches.peek().is_some() && matches.all(|m| m.is_finished())
}

/// Store an organizer-chosen order for teams no criterion separates (replaces any earlier one)
/// and resolve the final-stage slots that waited on it.
pub fn set_manual_tiebreak(
    tournament: &mut Tournament,
    group: Option<&str>,
    order: Vec<TeamId>,
) -> Result<PlacementReport, TournamentError> {
    let group = tournament.resolve_group(group)?;
    let mut seen = std::collections::HashSet::new();
    for id in &order {
        let team = tournament.team(*id).ok_or(TournamentError::TeamNotFound(*id))?;
        if !same_group(team.group.as_deref(), group.as_deref()) || !seen.insert(*id) {
            return Err(TournamentError::InvalidTiebreakOrder);
        }
    }
    if order.len() < 2 {
        return Err(TournamentError::InvalidTiebreakOrder);
    }
    tournament
        .manual_tiebreaks
        .retain(|t| !same_group(t.group.as_deref(), group.as_deref()));
    log::info!("Manual tie-break set for group {:?}", group);
    tournament.manual_tiebreaks.push(ManualTiebreak { group, order });
    Ok(match tournament.state {
        TournamentState::Draft => PlacementReport::default(),
        TournamentState::Published => resolve_placements(tournament),
    })
}
