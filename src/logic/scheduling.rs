//! Slot allocation: start/end time, field and referee for every match.
//!
//! Each field is a lane. The allocator always looks at the lane that frees up first and
//! places the first pending match (in schedule order) that may use that field and whose
//! teams, referee and prerequisite matches are available. Start times therefore never
//! decrease, which keeps the overlap checks local to the current instant.

use crate::logic::finals::{generate_finals, prerequisites};
use crate::logic::group_play::{generate_group_stage, partition_teams};
use crate::models::{
    BracketKey, ConfigurationError, Fixture, Match, Parallelism, Phase, PhaseTiming, Precondition,
    Referee, RefereePolicy, Team, TeamId, TeamRef, Tournament, TournamentConfig, TournamentError,
    TournamentState,
};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap, HashSet};

/// What the allocator needs to know about one match.
#[derive(Clone, Debug)]
pub struct SlotRequest {
    pub number: u32,
    pub phase: Phase,
    pub group: Option<String>,
    pub bracket: Option<BracketKey>,
    /// Teams already known to play this match.
    pub teams: Vec<TeamId>,
    pub prerequisites: Vec<BracketKey>,
    pub parallelism: Parallelism,
}

impl SlotRequest {
    fn from_fixture(number: u32, fixture: &Fixture) -> Self {
        let teams = fixture.team_a.team_id().into_iter().chain(fixture.team_b.team_id()).collect();
        let prerequisites = prerequisites([&fixture.team_a, &fixture.team_b].into_iter().filter_map(|r| match r {
            TeamRef::Placeholder(p) => Some(p),
            TeamRef::Team(_) => None,
        }));
        Self {
            number,
            phase: fixture.phase,
            group: fixture.group.clone(),
            bracket: fixture.bracket,
            teams,
            prerequisites,
            parallelism: fixture.parallelism,
        }
    }

    fn from_match(m: &Match) -> Self {
        let teams = known_teams(m);
        let prerequisites = prerequisites(m.source_a.iter().chain(m.source_b.iter()));
        Self {
            number: m.number,
            phase: m.phase,
            group: m.group.clone(),
            bracket: m.bracket,
            teams,
            prerequisites,
            parallelism: m.parallelism,
        }
    }
}

/// Assigned slot.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Slot {
    pub field: u32,
    pub referee: Option<Referee>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Resource clocks shared by both phases. "busy" values are the instant a resource is free again.
struct Allocator<'a> {
    config: &'a TournamentConfig,
    /// Teams that may referee, in registration order.
    referee_teams: Vec<TeamId>,
    /// Per-field earliest start, independent of phase (from fixed matches).
    field_blocked: BTreeMap<u32, NaiveDateTime>,
    team_busy: HashMap<TeamId, NaiveDateTime>,
    referee_busy: HashMap<Referee, NaiveDateTime>,
    referee_load: HashMap<Referee, u32>,
    bracket_end: HashMap<BracketKey, NaiveDateTime>,
    /// Final-stage: every final-stage match ends (+break) by this instant.
    playoff_until: Option<NaiveDateTime>,
    /// Final-stage: every sequential-only match ends (+break) by this instant.
    sequential_until: Option<NaiveDateTime>,
    last_group_end: Option<NaiveDateTime>,
}

fn later(slot: &mut Option<NaiveDateTime>, t: NaiveDateTime) {
    if slot.map_or(true, |cur| t > cur) {
        *slot = Some(t);
    }
}

fn later_in<K: std::hash::Hash + Eq>(map: &mut HashMap<K, NaiveDateTime>, key: K, t: NaiveDateTime) {
    let entry = map.entry(key).or_insert(t);
    if t > *entry {
        *entry = t;
    }
}

impl<'a> Allocator<'a> {
    fn new(config: &'a TournamentConfig, referee_teams: Vec<TeamId>) -> Self {
        Self {
            config,
            referee_teams,
            field_blocked: BTreeMap::new(),
            team_busy: HashMap::new(),
            referee_busy: HashMap::new(),
            referee_load: HashMap::new(),
            bracket_end: HashMap::new(),
            playoff_until: None,
            sequential_until: None,
            last_group_end: None,
        }
    }

    fn timing(&self, phase: Phase) -> PhaseTiming {
        if phase.is_playoff() {
            self.config.final_phase
        } else {
            self.config.group_phase
        }
    }

    /// Register a match that keeps its slot (started or finished) so nothing is placed over it.
    fn block(&mut self, m: &Match) {
        let free = m.end + self.timing(m.phase).break_length();
        let blocked = self.field_blocked.entry(m.field).or_insert(free);
        if free > *blocked {
            *blocked = free;
        }
        self.record(m.phase, m.bracket, m.parallelism, known_teams(m), m.referee, m.end);
    }

    fn record(
        &mut self,
        phase: Phase,
        bracket: Option<BracketKey>,
        parallelism: Parallelism,
        teams: Vec<TeamId>,
        referee: Option<Referee>,
        end: NaiveDateTime,
    ) {
        let free = end + self.timing(phase).break_length();
        for team in teams {
            later_in(&mut self.team_busy, team, free);
        }
        if let Some(r) = referee {
            later_in(&mut self.referee_busy, r, free);
            if let Referee::Team(team) = r {
                later_in(&mut self.team_busy, team, free);
            }
            *self.referee_load.entry(r).or_insert(0) += 1;
        }
        if let Some(key) = bracket {
            later_in(&mut self.bracket_end, key, end);
        }
        if phase.is_playoff() {
            later(&mut self.playoff_until, free);
            if parallelism == Parallelism::SequentialOnly {
                later(&mut self.sequential_until, free);
            }
        } else {
            later(&mut self.last_group_end, end);
        }
    }

    fn allowed_fields(&self, req: &SlotRequest) -> Vec<u32> {
        if req.phase.is_playoff() {
            (1..=self.config.fields).collect()
        } else {
            self.config.allowed_fields(req.group.as_deref())
        }
    }

    fn free_at(&self, busy: Option<&NaiveDateTime>, t: NaiveDateTime) -> bool {
        busy.map_or(true, |b| *b <= t)
    }

    /// Referee for `req` at `t`. Outer None = blocked; inner None = placed without referee.
    fn pick_referee(&self, req: &SlotRequest, t: NaiveDateTime) -> Option<Option<Referee>> {
        let load = |r: &Referee| self.referee_load.get(r).copied().unwrap_or(0);
        match self.config.referees {
            RefereePolicy::None => Some(None),
            RefereePolicy::Pool { size } => (1..=size)
                .map(Referee::Pool)
                .filter(|r| self.free_at(self.referee_busy.get(r), t))
                .enumerate()
                .min_by_key(|(idx, r)| (load(r), *idx))
                .map(|(_, r)| Some(r)),
            RefereePolicy::Teams if req.phase.is_playoff() => Some(None),
            RefereePolicy::Teams => {
                let pick = self
                    .referee_teams
                    .iter()
                    .filter(|team| !req.teams.contains(team))
                    .filter(|team| self.free_at(self.team_busy.get(team), t))
                    .map(|&team| Referee::Team(team))
                    .enumerate()
                    .min_by_key(|(idx, r)| (load(r), *idx))
                    .map(|(_, r)| r);
                Some(pick)
            }
        }
    }

    fn feasible(
        &self,
        req: &SlotRequest,
        field: u32,
        t: NaiveDateTime,
        pending_brackets: &HashSet<BracketKey>,
    ) -> Option<Option<Referee>> {
        if !self.allowed_fields(req).contains(&field) {
            return None;
        }
        if !req.teams.iter().all(|team| self.free_at(self.team_busy.get(team), t)) {
            return None;
        }
        let gap = self.config.final_phase.break_length();
        for key in &req.prerequisites {
            if pending_brackets.contains(key) {
                return None;
            }
            // Prerequisites outside this schedule impose nothing.
            if self.bracket_end.get(key).is_some_and(|end| *end + gap > t) {
                return None;
            }
        }
        if req.phase.is_playoff() {
            let until = match req.parallelism {
                Parallelism::SequentialOnly => self.playoff_until,
                Parallelism::ParallelAllowed => self.sequential_until,
            };
            if until.is_some_and(|u| u > t) {
                return None;
            }
        }
        self.pick_referee(req, t)
    }

    /// Earliest instant after `t` at which some clock changes.
    fn next_event(&self, t: NaiveDateTime, lanes: &BTreeMap<u32, NaiveDateTime>) -> Option<NaiveDateTime> {
        let gap = self.config.final_phase.break_length();
        self.team_busy
            .values()
            .chain(self.referee_busy.values())
            .chain(lanes.values())
            .copied()
            .chain(self.bracket_end.values().map(|e| *e + gap))
            .chain(self.playoff_until)
            .chain(self.sequential_until)
            .filter(|e| *e > t)
            .min()
    }

    /// Place one phase. `requests` are in schedule order; returns one slot per request.
    fn place_phase(
        &mut self,
        requests: &[SlotRequest],
        phase_start: NaiveDateTime,
    ) -> Result<Vec<Slot>, TournamentError> {
        let mut lanes: BTreeMap<u32, NaiveDateTime> = (1..=self.config.fields)
            .map(|f| {
                let blocked = self.field_blocked.get(&f).copied().unwrap_or(phase_start);
                (f, blocked.max(phase_start))
            })
            .collect();
        let mut slots: Vec<Option<Slot>> = vec![None; requests.len()];
        let mut pending: Vec<usize> = (0..requests.len()).collect();

        while let Some(&first) = pending.first() {
            let Some((&field, &t)) = lanes.iter().min_by_key(|(f, t)| (**t, **f)) else {
                return Err(ConfigurationError::Unschedulable {
                    match_number: requests[first].number,
                }
                .into());
            };

            let pending_brackets: HashSet<BracketKey> =
                pending.iter().filter_map(|&idx| requests[idx].bracket).collect();
            let choice = pending.iter().enumerate().find_map(|(pos, &idx)| {
                self.feasible(&requests[idx], field, t, &pending_brackets)
                    .map(|r| (pos, idx, r))
            });

            match choice {
                Some((pos, idx, referee)) => {
                    let req = &requests[idx];
                    let timing = self.timing(req.phase);
                    let end = t + timing.match_length();
                    log::debug!("Match {} -> field {} at {}", req.number, field, t);
                    if referee.is_none() && self.config.referees == RefereePolicy::Teams && !req.phase.is_playoff() {
                        log::warn!("No free team to referee match {}", req.number);
                    }
                    slots[idx] = Some(Slot {
                        field,
                        referee,
                        start: t,
                        end,
                    });
                    lanes.insert(field, end + timing.break_length());
                    self.record(req.phase, req.bracket, req.parallelism, req.teams.clone(), referee, end);
                    pending.remove(pos);
                }
                None => {
                    let usable = pending
                        .iter()
                        .any(|&idx| self.allowed_fields(&requests[idx]).contains(&field));
                    if !usable {
                        lanes.remove(&field);
                        continue;
                    }
                    match self.next_event(t, &lanes) {
                        Some(next) => {
                            lanes.insert(field, next);
                        }
                        None => {
                            return Err(ConfigurationError::Unschedulable {
                                match_number: requests[first].number,
                            }
                            .into())
                        }
                    }
                }
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }

    /// Place both phases; the final stage starts once, `break_between_phases` after the last group match.
    fn place(
        &mut self,
        group: &[SlotRequest],
        playoff: &[SlotRequest],
        start: NaiveDateTime,
    ) -> Result<(Vec<Slot>, Vec<Slot>), TournamentError> {
        let group_slots = self.place_phase(group, start)?;
        let playoff_start = match self.last_group_end {
            Some(end) => (end + self.config.break_between_phases()).max(start),
            None => start,
        };
        let playoff_slots = self.place_phase(playoff, playoff_start)?;
        Ok((group_slots, playoff_slots))
    }
}

fn known_teams(m: &Match) -> Vec<TeamId> {
    m.team_a.team_id().into_iter().chain(m.team_b.team_id()).collect()
}

/// Expand configuration and teams into the complete, allocated match list.
///
/// Nothing is returned unless every partition, the final-stage layout and every slot are valid.
/// Matches are numbered in start order.
pub fn generate_schedule(config: &TournamentConfig, teams: &[Team]) -> Result<Vec<Match>, TournamentError> {
    config.validate()?;
    let partitions = partition_teams(config, teams)?;
    let group_fixtures = generate_group_stage(config, teams)?;
    let playoff_fixtures = generate_finals(config, &partitions)?;

    let group_requests: Vec<SlotRequest> = group_fixtures
        .iter()
        .enumerate()
        .map(|(i, f)| SlotRequest::from_fixture(i as u32 + 1, f))
        .collect();
    let offset = group_requests.len() as u32;
    let playoff_requests: Vec<SlotRequest> = playoff_fixtures
        .iter()
        .enumerate()
        .map(|(i, f)| SlotRequest::from_fixture(offset + i as u32 + 1, f))
        .collect();

    let referee_teams = teams.iter().filter(|t| t.is_active()).map(|t| t.id).collect();
    let mut allocator = Allocator::new(config, referee_teams);
    let (group_slots, playoff_slots) = allocator.place(&group_requests, &playoff_requests, config.start_time)?;

    let mut matches: Vec<Match> = group_fixtures
        .into_iter()
        .zip(group_slots)
        .chain(playoff_fixtures.into_iter().zip(playoff_slots))
        .map(|(fixture, slot)| Match::from_fixture(fixture, 0, slot.field, slot.referee, slot.start, slot.end))
        .collect();
    matches.sort_by_key(|m| (m.start, m.field));
    for (i, m) in matches.iter_mut().enumerate() {
        m.number = i as u32 + 1;
    }
    log::info!("Generated {} matches on {} field(s)", matches.len(), config.fields);
    Ok(matches)
}

/// Re-time every match that has neither started nor finished, starting at `from`.
///
/// Started and finished matches keep their slot and block their field, teams and referee.
/// Team referees of final-stage matches are cleared (they are assigned manually).
pub fn reschedule_unplayed(tournament: &mut Tournament, from: NaiveDateTime) -> Result<(), TournamentError> {
    if tournament.state != TournamentState::Published {
        return Err(Precondition::NotPublished.into());
    }

    let referee_teams = tournament.active_teams().map(|t| t.id).collect();
    let mut allocator = Allocator::new(&tournament.config, referee_teams);
    for m in tournament.matches.iter().filter(|m| !m.is_unplayed()) {
        allocator.block(m);
    }

    let mut group: Vec<&Match> = tournament
        .matches
        .iter()
        .filter(|m| m.is_unplayed() && !m.is_playoff())
        .collect();
    group.sort_by_key(|m| (m.start, m.field));
    let mut playoff: Vec<&Match> = tournament
        .matches
        .iter()
        .filter(|m| m.is_unplayed() && m.is_playoff())
        .collect();
    playoff.sort_by_key(|m| m.bracket.map(BracketKey::order));

    let group_requests: Vec<SlotRequest> = group.iter().map(|m| SlotRequest::from_match(m)).collect();
    let playoff_requests: Vec<SlotRequest> = playoff.iter().map(|m| SlotRequest::from_match(m)).collect();
    let (group_slots, playoff_slots) = allocator.place(&group_requests, &playoff_requests, from)?;

    let updates: HashMap<_, Slot> = group
        .iter()
        .zip(group_slots)
        .chain(playoff.iter().zip(playoff_slots))
        .map(|(m, slot)| (m.id, slot))
        .collect();
    for m in tournament.matches.iter_mut() {
        if let Some(slot) = updates.get(&m.id) {
            m.field = slot.field;
            m.referee = slot.referee;
            m.start = slot.start;
            m.end = slot.end;
        }
    }
    log::info!("Rescheduled {} unplayed match(es) from {}", updates.len(), from);
    Ok(())
}
