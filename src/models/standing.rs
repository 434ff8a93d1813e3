//! Standing: one team's row in a group table.

use crate::models::config::PointSystem;
use crate::models::team::TeamId;
use serde::{Deserialize, Serialize};

/// Aggregated results of one team in one group. A projection of the match list, never stored.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub team_id: TeamId,
    pub group: Option<String>,
    /// 1-based position; teams no enabled criterion separates share a position.
    pub position: u32,
    /// True if this team shares its position with another team.
    pub tied: bool,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub points: u32,
}

impl Standing {
    pub fn new(team_id: TeamId, group: Option<String>) -> Self {
        Self {
            team_id,
            group,
            position: 0,
            tied: false,
            played: 0,
            won: 0,
            drawn: 0,
            lost: 0,
            goals_for: 0,
            goals_against: 0,
            points: 0,
        }
    }

    /// Derived on every read.
    pub fn goal_difference(&self) -> i64 {
        i64::from(self.goals_for) - i64::from(self.goals_against)
    }

    /// Fold one result into the row.
    pub fn record(&mut self, scored: u32, conceded: u32, points: &PointSystem) {
        self.played += 1;
        self.goals_for += scored;
        self.goals_against += conceded;
        match scored.cmp(&conceded) {
            std::cmp::Ordering::Greater => {
                self.won += 1;
                self.points += points.win;
            }
            std::cmp::Ordering::Equal => {
                self.drawn += 1;
                self.points += points.draw;
            }
            std::cmp::Ordering::Less => {
                self.lost += 1;
                self.points += points.loss;
            }
        }
    }
}
