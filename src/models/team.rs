//! Team data structure.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a team (used in matches, standings and placeholders).
pub type TeamId = Uuid;

/// A team registered for the tournament.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    /// Group name (e.g. "A"). None for tournaments without groups.
    #[serde(default)]
    pub group: Option<String>,
    /// Soft-delete marker: keeps historical results, excluded from active standings and generation.
    #[serde(default)]
    pub removed: bool,
}

impl Team {
    /// Create a new team without a group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            group: None,
            removed: false,
        }
    }

    /// Create a new team assigned to a group.
    pub fn in_group(name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            ..Self::new(name)
        }
    }

    pub fn is_active(&self) -> bool {
        !self.removed
    }
}
