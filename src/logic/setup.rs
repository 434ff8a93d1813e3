//! Setup phase: roster import, group draw, and publication (Draft → Published).

use crate::logic::placement::resolve_placements;
use crate::logic::scheduling::generate_schedule;
use crate::models::{ConfigurationError, Precondition, Tournament, TournamentError, TournamentState};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::io::Read;

fn require_draft(tournament: &Tournament) -> Result<(), TournamentError> {
    if tournament.state != TournamentState::Draft {
        return Err(Precondition::NotDraft.into());
    }
    Ok(())
}

/// Generate and allocate the full match list, then publish.
///
/// On error nothing changes and the tournament stays a draft.
pub fn publish(tournament: &mut Tournament) -> Result<(), TournamentError> {
    require_draft(tournament)?;
    let matches = generate_schedule(&tournament.config, &tournament.teams)?;
    tournament.matches = matches;
    tournament.state = TournamentState::Published;
    resolve_placements(tournament);
    log::info!(
        "Tournament '{}' published with {} teams and {} matches",
        tournament.name,
        tournament.active_teams().count(),
        tournament.matches.len()
    );
    Ok(())
}

/// Import teams from CSV rows `name[,group]`. A first row starting with `name` is a header.
///
/// All-or-nothing: one bad row (empty or duplicate name, unknown group) rejects the file.
/// Returns the number of teams added.
pub fn import_teams_csv<R: Read>(tournament: &mut Tournament, reader: R) -> Result<usize, TournamentError> {
    require_draft(tournament)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut staged = tournament.clone();
    let mut added = 0;
    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| TournamentError::Import {
            line: e.position().map_or(0, |p| p.line()),
            message: e.to_string(),
        })?;
        let line = record.position().map_or(i as u64 + 1, |p| p.line());
        let name = record.get(0).unwrap_or_default();
        if i == 0 && name.eq_ignore_ascii_case("name") {
            continue;
        }
        if record.iter().all(str::is_empty) {
            continue;
        }
        let group = record.get(1).filter(|g| !g.is_empty()).map(str::to_string);
        staged.add_team(name, group).map_err(|e| TournamentError::Import {
            line,
            message: e.to_string(),
        })?;
        added += 1;
    }

    *tournament = staged;
    log::info!("Imported {} team(s)", added);
    Ok(added)
}

/// Deal all active teams into the configured groups in a shuffled order.
///
/// The same seed always gives the same draw. Group sizes differ by at most one.
pub fn draw_groups(tournament: &mut Tournament, seed: u64) -> Result<(), TournamentError> {
    require_draft(tournament)?;
    let groups: Vec<String> = tournament.config.groups.iter().map(|g| g.name.clone()).collect();
    if groups.is_empty() {
        return Err(ConfigurationError::NoGroups.into());
    }

    let mut order: Vec<usize> = (0..tournament.teams.len())
        .filter(|&i| tournament.teams[i].is_active())
        .collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    for (slot, idx) in order.into_iter().enumerate() {
        tournament.teams[idx].group = Some(groups[slot % groups.len()].clone());
    }
    log::info!("Drew teams into {} groups (seed {})", groups.len(), seed);
    Ok(())
}
