//! Tournament configuration: fields, groups, timing, points, finals, referees, tie-break criteria.
//!
//! Everything the engine needs is passed in through this struct; nothing is read from globals.

use crate::models::error::{ConfigurationError, TournamentError};
use crate::models::game::{BracketKey, Parallelism};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Match and break length of one phase, in minutes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PhaseTiming {
    pub match_minutes: u32,
    pub break_minutes: u32,
}

impl PhaseTiming {
    pub fn new(match_minutes: u32, break_minutes: u32) -> Self {
        Self {
            match_minutes,
            break_minutes,
        }
    }

    pub fn match_length(&self) -> Duration {
        Duration::minutes(i64::from(self.match_minutes))
    }

    pub fn break_length(&self) -> Duration {
        Duration::minutes(i64::from(self.break_minutes))
    }
}

impl Default for PhaseTiming {
    fn default() -> Self {
        Self::new(10, 2)
    }
}

/// One group and the fields it may use.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    /// Allowed field numbers (1-based). Empty means all fields.
    #[serde(default)]
    pub allowed_fields: Vec<u32>,
}

impl GroupConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allowed_fields: Vec::new(),
        }
    }

    pub fn with_fields(name: impl Into<String>, fields: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            allowed_fields: fields,
        }
    }
}

/// Points per outcome.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PointSystem {
    pub win: u32,
    pub draw: u32,
    pub loss: u32,
}

impl Default for PointSystem {
    fn default() -> Self {
        Self {
            win: 3,
            draw: 1,
            loss: 0,
        }
    }
}

/// Ranking criterion.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKind {
    Points,
    Wins,
    GoalDifference,
    GoalsFor,
    GoalsAgainst,
    DirectComparison,
}

/// A criterion with its enabled flag; `position` defines tie-break precedence (lower first).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlacementCriterion {
    pub kind: CriterionKind,
    pub enabled: bool,
    pub position: u32,
}

impl PlacementCriterion {
    pub fn new(kind: CriterionKind, position: u32) -> Self {
        Self {
            kind,
            enabled: true,
            position,
        }
    }
}

/// Default order: points, goal difference, goals for, direct comparison.
pub fn default_criteria() -> Vec<PlacementCriterion> {
    use CriterionKind::*;
    vec![
        PlacementCriterion::new(Points, 0),
        PlacementCriterion::new(GoalDifference, 1),
        PlacementCriterion::new(GoalsFor, 2),
        PlacementCriterion::new(DirectComparison, 3),
        PlacementCriterion {
            kind: Wins,
            enabled: false,
            position: 4,
        },
        PlacementCriterion {
            kind: GoalsAgainst,
            enabled: false,
            position: 5,
        },
    ]
}

/// Which final-stage matches are played and how they may overlap.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalsConfig {
    pub final_match: bool,
    pub third_place: bool,
    pub fifth_sixth: bool,
    pub seventh_eighth: bool,
    /// Global toggle; when off every final-stage match is sequential.
    pub allow_parallel: bool,
    /// Per-match tags; matches not listed are parallel-allowed. The final is always sequential.
    pub parallelism: BTreeMap<BracketKey, Parallelism>,
}

impl Default for FinalsConfig {
    fn default() -> Self {
        Self {
            final_match: false,
            third_place: false,
            fifth_sixth: false,
            seventh_eighth: false,
            allow_parallel: true,
            parallelism: BTreeMap::new(),
        }
    }
}

impl FinalsConfig {
    pub fn any_enabled(&self) -> bool {
        self.final_match || self.third_place || self.fifth_sixth || self.seventh_eighth
    }

    /// Tag actually used for scheduling `key`.
    pub fn effective_parallelism(&self, key: BracketKey) -> Parallelism {
        if key == BracketKey::Final || !self.allow_parallel {
            return Parallelism::SequentialOnly;
        }
        self.parallelism.get(&key).copied().unwrap_or_default()
    }
}

/// How referees are assigned.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RefereePolicy {
    #[default]
    None,
    /// Organizer-supplied pool of referees numbered 1..=size.
    Pool { size: u32 },
    /// One referee per match drawn from teams not playing at the time.
    Teams,
}

/// Full tournament configuration (JSON boundary; missing fields take defaults).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TournamentConfig {
    pub sport: String,
    pub fields: u32,
    pub start_time: NaiveDateTime,
    /// Empty = one table for all teams.
    pub groups: Vec<GroupConfig>,
    /// How often each pair meets in the group stage.
    pub rounds: u32,
    pub group_phase: PhaseTiming,
    pub final_phase: PhaseTiming,
    pub break_between_phases: u32,
    pub points: PointSystem,
    pub criteria: Vec<PlacementCriterion>,
    pub finals: FinalsConfig,
    pub referees: RefereePolicy,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            sport: "football".to_string(),
            fields: 1,
            start_time: NaiveDateTime::default(),
            groups: Vec::new(),
            rounds: 1,
            group_phase: PhaseTiming::default(),
            final_phase: PhaseTiming::new(12, 3),
            break_between_phases: 15,
            points: PointSystem::default(),
            criteria: default_criteria(),
            finals: FinalsConfig::default(),
            referees: RefereePolicy::None,
        }
    }
}

impl TournamentConfig {
    /// Default configuration starting at `start_time`.
    pub fn starting_at(start_time: NaiveDateTime) -> Self {
        Self {
            start_time,
            ..Self::default()
        }
    }

    pub fn break_between_phases(&self) -> Duration {
        Duration::minutes(i64::from(self.break_between_phases))
    }

    pub fn group(&self, name: &str) -> Option<&GroupConfig> {
        self.groups.iter().find(|g| g.name.eq_ignore_ascii_case(name))
    }

    /// Fields a match of `group` may use, ascending.
    pub fn allowed_fields(&self, group: Option<&str>) -> Vec<u32> {
        let restricted = group
            .and_then(|g| self.group(g))
            .map(|g| g.allowed_fields.clone())
            .unwrap_or_default();
        if restricted.is_empty() {
            (1..=self.fields).collect()
        } else {
            let mut fields = restricted;
            fields.sort_unstable();
            fields.dedup();
            fields
        }
    }

    /// Enabled criteria in precedence order.
    pub fn enabled_criteria(&self) -> Vec<CriterionKind> {
        let mut enabled: Vec<&PlacementCriterion> = self.criteria.iter().filter(|c| c.enabled).collect();
        enabled.sort_by_key(|c| c.position);
        enabled.into_iter().map(|c| c.kind).collect()
    }

    /// Check everything that does not depend on the team list.
    pub fn validate(&self) -> Result<(), TournamentError> {
        if self.fields == 0 {
            return Err(ConfigurationError::NoFields.into());
        }
        if self.rounds == 0 {
            return Err(ConfigurationError::NoRounds.into());
        }
        if self.group_phase.match_minutes == 0 || self.final_phase.match_minutes == 0 {
            return Err(ConfigurationError::ZeroMatchDuration.into());
        }
        if let RefereePolicy::Pool { size: 0 } = self.referees {
            return Err(ConfigurationError::EmptyRefereePool.into());
        }

        let mut names = HashSet::new();
        for group in &self.groups {
            let name = group.name.trim();
            if name.is_empty() || name != group.name {
                return Err(ConfigurationError::InvalidGroupName(group.name.clone()).into());
            }
            if !names.insert(name.to_lowercase()) {
                return Err(ConfigurationError::DuplicateGroup(group.name.clone()).into());
            }
            if let Some(&field) = group
                .allowed_fields
                .iter()
                .find(|&&f| f == 0 || f > self.fields)
            {
                return Err(ConfigurationError::FieldOutOfRange {
                    group: group.name.clone(),
                    field,
                }
                .into());
            }
        }

        self.validate_criteria()
    }

    fn validate_criteria(&self) -> Result<(), TournamentError> {
        let mut kinds = HashSet::new();
        let mut positions = HashSet::new();
        for c in &self.criteria {
            if !kinds.insert(c.kind) {
                return Err(ConfigurationError::DuplicateCriterion(c.kind).into());
            }
            if !positions.insert(c.position) {
                return Err(ConfigurationError::DuplicateCriterionPosition(c.position).into());
            }
        }
        if !self.criteria.iter().any(|c| c.enabled && c.kind != CriterionKind::DirectComparison) {
            return Err(ConfigurationError::NoScalarCriterion.into());
        }
        Ok(())
    }
}
