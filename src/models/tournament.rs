//! Tournament and TournamentState.

use crate::models::config::TournamentConfig;
use crate::models::error::{Precondition, TournamentError};
use crate::models::game::{BracketKey, Match, MatchId, Score};
use crate::models::team::{Team, TeamId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

/// Lifecycle of the tournament.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentState {
    /// Teams and configuration are editable; no matches yet.
    #[default]
    Draft,
    /// Match list exists; only field-by-field edits from here on.
    Published,
}

/// Pending score correction. Holds the score to restore on cancel.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CorrectionSession {
    pub match_id: MatchId,
    pub original: Score,
}

/// Organizer decision for teams no criterion separates.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ManualTiebreak {
    pub group: Option<String>,
    /// Best team first.
    pub order: Vec<TeamId>,
}

/// Full tournament state: configuration, teams, matches.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub config: TournamentConfig,
    pub teams: Vec<Team>,
    pub matches: Vec<Match>,
    pub state: TournamentState,
    /// At most one correction per tournament at a time.
    #[serde(default)]
    pub correction: Option<CorrectionSession>,
    #[serde(default)]
    pub manual_tiebreaks: Vec<ManualTiebreak>,
}

impl Tournament {
    /// Create a new tournament in Draft state with no teams.
    pub fn new(name: impl Into<String>, config: TournamentConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            config,
            teams: Vec::new(),
            matches: Vec::new(),
            state: TournamentState::Draft,
            correction: None,
            manual_tiebreaks: Vec::new(),
        }
    }

    /// Create a tournament with initial teams. Still a draft until published.
    pub fn with_teams(name: impl Into<String>, config: TournamentConfig, teams: Vec<Team>) -> Self {
        Self {
            teams,
            ..Self::new(name, config)
        }
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    pub fn get_team_mut(&mut self, id: TeamId) -> Option<&mut Team> {
        self.teams.iter_mut().find(|t| t.id == id)
    }

    pub fn get_match(&self, id: MatchId) -> Result<&Match, TournamentError> {
        self.matches
            .iter()
            .find(|m| m.id == id)
            .ok_or(TournamentError::MatchNotFound(id))
    }

    pub fn get_match_mut(&mut self, id: MatchId) -> Result<&mut Match, TournamentError> {
        self.matches
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(TournamentError::MatchNotFound(id))
    }

    /// Active (not removed) teams in registration order.
    pub fn active_teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.iter().filter(|t| t.is_active())
    }

    /// Group partitions: the configured group names, or a single None when there are no groups.
    pub fn partitions(&self) -> Vec<Option<String>> {
        if self.config.groups.is_empty() {
            vec![None]
        } else {
            self.config.groups.iter().map(|g| Some(g.name.clone())).collect()
        }
    }

    /// Canonical group name as configured (case-insensitive lookup).
    pub fn resolve_group(&self, group: Option<&str>) -> Result<Option<String>, TournamentError> {
        match group {
            None if self.config.groups.is_empty() => Ok(None),
            None => Err(TournamentError::GroupNotFound(String::new())),
            Some(name) => self
                .config
                .group(name)
                .map(|g| Some(g.name.clone()))
                .ok_or_else(|| TournamentError::GroupNotFound(name.to_string())),
        }
    }

    fn require_draft(&self) -> Result<(), TournamentError> {
        if self.state != TournamentState::Draft {
            return Err(Precondition::NotDraft.into());
        }
        Ok(())
    }

    /// Replace the configuration (Draft only).
    pub fn set_config(&mut self, config: TournamentConfig) -> Result<(), TournamentError> {
        self.require_draft()?;
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Add a team (Draft only). Names must be unique (case-insensitive).
    pub fn add_team(&mut self, name: impl Into<String>, group: Option<String>) -> Result<TeamId, TournamentError> {
        self.require_draft()?;
        let name = name.into();
        let name = self.check_team_name(&name, None)?;
        let group = match group {
            Some(g) => self.resolve_group(Some(&g))?,
            None => None,
        };
        let team = Team {
            group,
            ..Team::new(name)
        };
        let id = team.id;
        self.teams.push(team);
        Ok(id)
    }

    fn check_team_name(&self, name: &str, except: Option<TeamId>) -> Result<String, TournamentError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(TournamentError::EmptyTeamName);
        }
        let is_duplicate = self
            .teams
            .iter()
            .any(|t| Some(t.id) != except && t.name.eq_ignore_ascii_case(trimmed));
        if is_duplicate {
            return Err(TournamentError::DuplicateTeamName);
        }
        Ok(trimmed.to_string())
    }

    /// Rename a team (any state).
    pub fn rename_team(&mut self, id: TeamId, name: &str) -> Result<(), TournamentError> {
        let name = self.check_team_name(name, Some(id))?;
        self.get_team_mut(id).ok_or(TournamentError::TeamNotFound(id))?.name = name;
        Ok(())
    }

    /// Move a team to another group (Draft only).
    pub fn set_team_group(&mut self, id: TeamId, group: Option<&str>) -> Result<(), TournamentError> {
        self.require_draft()?;
        let group = match group {
            Some(g) => self.resolve_group(Some(g))?,
            None => None,
        };
        self.get_team_mut(id).ok_or(TournamentError::TeamNotFound(id))?.group = group;
        Ok(())
    }

    /// Remove a team. Drafts drop it entirely; published tournaments only mark it removed.
    pub(crate) fn remove_team(&mut self, id: TeamId) -> Result<(), TournamentError> {
        let idx = self
            .teams
            .iter()
            .position(|t| t.id == id)
            .ok_or(TournamentError::TeamNotFound(id))?;
        match self.state {
            TournamentState::Draft => {
                self.teams.remove(idx);
            }
            TournamentState::Published => {
                self.teams[idx].removed = true;
                log::info!("Team {} marked removed", self.teams[idx].name);
            }
        }
        Ok(())
    }

    /// Undo a soft removal.
    pub(crate) fn restore_team(&mut self, id: TeamId) -> Result<(), TournamentError> {
        self.get_team_mut(id).ok_or(TournamentError::TeamNotFound(id))?.removed = false;
        Ok(())
    }

    /// Final-stage match with the given bracket key.
    pub fn bracket_match(&self, key: BracketKey) -> Option<&Match> {
        self.matches.iter().find(|m| m.bracket == Some(key))
    }
}
