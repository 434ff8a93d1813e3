//! Match, team references, placeholders and bracket keys.

use crate::models::team::TeamId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a match.
pub type MatchId = Uuid;

/// Phase of the tournament this match belongs to.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    GroupStage,
    Quarterfinal,
    Semifinal,
    Final,
    ThirdPlace,
    FifthSixth,
    SeventhEighth,
}

impl Phase {
    pub fn is_playoff(self) -> bool {
        self != Phase::GroupStage
    }
}

/// Identity of a final-stage match inside the bracket.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum BracketKey {
    Quarter(u8),
    Semi(u8),
    Final,
    ThirdPlace,
    FifthSixth,
    SeventhEighth,
}

impl BracketKey {
    /// Dependency order: a match never depends on one with a higher order.
    /// Placement matches come before the final so the final closes the day.
    pub fn order(self) -> u8 {
        match self {
            BracketKey::Quarter(n) => n,
            BracketKey::Semi(n) => 4 + n,
            BracketKey::SeventhEighth => 7,
            BracketKey::FifthSixth => 8,
            BracketKey::ThirdPlace => 9,
            BracketKey::Final => 10,
        }
    }

    pub fn phase(self) -> Phase {
        match self {
            BracketKey::Quarter(_) => Phase::Quarterfinal,
            BracketKey::Semi(_) => Phase::Semifinal,
            BracketKey::Final => Phase::Final,
            BracketKey::ThirdPlace => Phase::ThirdPlace,
            BracketKey::FifthSixth => Phase::FifthSixth,
            BracketKey::SeventhEighth => Phase::SeventhEighth,
        }
    }
}

impl fmt::Display for BracketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BracketKey::Quarter(n) => write!(f, "quarter{}", n),
            BracketKey::Semi(n) => write!(f, "semi{}", n),
            BracketKey::Final => write!(f, "final"),
            BracketKey::ThirdPlace => write!(f, "third"),
            BracketKey::FifthSixth => write!(f, "fifth"),
            BracketKey::SeventhEighth => write!(f, "seventh"),
        }
    }
}

impl FromStr for BracketKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let numbered = |prefix: &str, max: u8| -> Option<u8> {
            let n: u8 = s.strip_prefix(prefix)?.parse().ok()?;
            (1..=max).contains(&n).then_some(n)
        };
        match s {
            "final" => Ok(BracketKey::Final),
            "third" => Ok(BracketKey::ThirdPlace),
            "fifth" => Ok(BracketKey::FifthSixth),
            "seventh" => Ok(BracketKey::SeventhEighth),
            _ => {
                if let Some(n) = numbered("quarter", 4) {
                    Ok(BracketKey::Quarter(n))
                } else if let Some(n) = numbered("semi", 2) {
                    Ok(BracketKey::Semi(n))
                } else {
                    Err(format!("unknown bracket key '{}'", s))
                }
            }
        }
    }
}

impl From<BracketKey> for String {
    fn from(key: BracketKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for BracketKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Symbolic reference to a team that is not known yet.
///
/// Serialized as a plain key: `group-a-1st`, `table-3rd`, `semi1-winner`,
/// `quarter2-loser`, `bestSecond`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Placeholder {
    /// Rank in a group table. Group names are stored lowercase.
    GroupRank { group: String, rank: u32 },
    /// Rank in the single table of a tournament without groups.
    TableRank(u32),
    Winner(BracketKey),
    Loser(BracketKey),
    /// Best runner-up across all groups.
    BestSecond,
}

impl Placeholder {
    pub fn group_rank(group: &str, rank: u32) -> Self {
        Placeholder::GroupRank {
            group: group.to_lowercase(),
            rank,
        }
    }
}

fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

fn parse_ordinal(s: &str) -> Option<u32> {
    let digits = s.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    let n: u32 = digits.parse().ok()?;
    (n > 0 && ordinal(n) == s).then_some(n)
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placeholder::GroupRank { group, rank } => write!(f, "group-{}-{}", group, ordinal(*rank)),
            Placeholder::TableRank(rank) => write!(f, "table-{}", ordinal(*rank)),
            Placeholder::Winner(key) => write!(f, "{}-winner", key),
            Placeholder::Loser(key) => write!(f, "{}-loser", key),
            Placeholder::BestSecond => write!(f, "bestSecond"),
        }
    }
}

impl FromStr for Placeholder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("unknown placeholder '{}'", s);
        if s == "bestSecond" {
            return Ok(Placeholder::BestSecond);
        }
        if let Some(rest) = s.strip_prefix("group-") {
            let (group, rank) = rest.rsplit_once('-').ok_or_else(invalid)?;
            if group.is_empty() {
                return Err(invalid());
            }
            let rank = parse_ordinal(rank).ok_or_else(invalid)?;
            return Ok(Placeholder::group_rank(group, rank));
        }
        if let Some(rank) = s.strip_prefix("table-") {
            return parse_ordinal(rank).map(Placeholder::TableRank).ok_or_else(invalid);
        }
        if let Some(key) = s.strip_suffix("-winner") {
            return key.parse().map(Placeholder::Winner).map_err(|_| invalid());
        }
        if let Some(key) = s.strip_suffix("-loser") {
            return key.parse().map(Placeholder::Loser).map_err(|_| invalid());
        }
        Err(invalid())
    }
}

impl From<Placeholder> for String {
    fn from(p: Placeholder) -> Self {
        p.to_string()
    }
}

impl TryFrom<String> for Placeholder {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One side of a match: a resolved team or a placeholder still waiting for data.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TeamRef {
    Team(TeamId),
    Placeholder(Placeholder),
}

impl TeamRef {
    pub fn team_id(&self) -> Option<TeamId> {
        match self {
            TeamRef::Team(id) => Some(*id),
            TeamRef::Placeholder(_) => None,
        }
    }
}

/// Referee assigned to a match.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Referee {
    /// Number in the organizer-supplied pool (1-based).
    Pool(u32),
    /// A team that is not playing at the time.
    Team(TeamId),
}

/// Whether a final-stage match may overlap other final-stage matches.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parallelism {
    SequentialOnly,
    #[default]
    ParallelAllowed,
}

/// Final score; both goals are always present together.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub a: u32,
    pub b: u32,
}

impl Score {
    pub fn new(a: u32, b: u32) -> Self {
        Self { a, b }
    }

    pub fn is_draw(&self) -> bool {
        self.a == self.b
    }
}

/// Which side of a match.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    A,
    B,
}

/// Live status, derived from the stored flags.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    InProgress,
    Finished,
    CorrectionInProgress,
}

/// A match before it has a slot: who plays and where it sits in the tournament.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Fixture {
    pub phase: Phase,
    pub group: Option<String>,
    /// Group-stage round (1-based); 0 for final-stage matches.
    pub round: u32,
    pub bracket: Option<BracketKey>,
    pub team_a: TeamRef,
    pub team_b: TeamRef,
    pub parallelism: Parallelism,
}

impl Fixture {
    pub fn group_stage(group: Option<String>, round: u32, home: TeamId, away: TeamId) -> Self {
        Self {
            phase: Phase::GroupStage,
            group,
            round,
            bracket: None,
            team_a: TeamRef::Team(home),
            team_b: TeamRef::Team(away),
            parallelism: Parallelism::ParallelAllowed,
        }
    }

    pub fn playoff(key: BracketKey, a: Placeholder, b: Placeholder, parallelism: Parallelism) -> Self {
        Self {
            phase: key.phase(),
            group: None,
            round: 0,
            bracket: Some(key),
            team_a: TeamRef::Placeholder(a),
            team_b: TeamRef::Placeholder(b),
            parallelism,
        }
    }
}

/// A scheduled match.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    /// Running number in schedule order (1-based).
    pub number: u32,
    pub phase: Phase,
    pub group: Option<String>,
    pub round: u32,
    pub bracket: Option<BracketKey>,
    pub team_a: TeamRef,
    pub team_b: TeamRef,
    /// Placeholder this side was generated from; kept so resolution can be replayed.
    pub source_a: Option<Placeholder>,
    pub source_b: Option<Placeholder>,
    pub field: u32,
    pub referee: Option<Referee>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// None if not yet played.
    pub score: Option<Score>,
    #[serde(default)]
    pub started: bool,
    #[serde(default)]
    pub correction_in_progress: bool,
    pub parallelism: Parallelism,
}

impl Match {
    pub fn from_fixture(
        fixture: Fixture,
        number: u32,
        field: u32,
        referee: Option<Referee>,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Self {
        let source = |r: &TeamRef| match r {
            TeamRef::Placeholder(p) => Some(p.clone()),
            TeamRef::Team(_) => None,
        };
        Self {
            id: Uuid::new_v4(),
            number,
            phase: fixture.phase,
            group: fixture.group,
            round: fixture.round,
            bracket: fixture.bracket,
            source_a: source(&fixture.team_a),
            source_b: source(&fixture.team_b),
            team_a: fixture.team_a,
            team_b: fixture.team_b,
            field,
            referee,
            start,
            end,
            score: None,
            started: false,
            correction_in_progress: false,
            parallelism: fixture.parallelism,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.score.is_some()
    }

    pub fn is_playoff(&self) -> bool {
        self.phase.is_playoff()
    }

    pub fn status(&self) -> MatchStatus {
        if self.correction_in_progress {
            MatchStatus::CorrectionInProgress
        } else if self.score.is_some() {
            MatchStatus::Finished
        } else if self.started {
            MatchStatus::InProgress
        } else {
            MatchStatus::Scheduled
        }
    }

    /// Neither started nor finished: the slot may still move.
    pub fn is_unplayed(&self) -> bool {
        self.score.is_none() && !self.started
    }

    /// Half-open interval overlap: `[start, end)`.
    pub fn overlaps(&self, other: &Match) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn team(&self, side: Side) -> &TeamRef {
        match side {
            Side::A => &self.team_a,
            Side::B => &self.team_b,
        }
    }

    pub fn source(&self, side: Side) -> Option<&Placeholder> {
        match side {
            Side::A => self.source_a.as_ref(),
            Side::B => self.source_b.as_ref(),
        }
    }

    /// Both team ids, if both sides are resolved.
    pub fn teams(&self) -> Option<(TeamId, TeamId)> {
        Some((self.team_a.team_id()?, self.team_b.team_id()?))
    }

    pub fn involves(&self, team: TeamId) -> bool {
        self.team_a.team_id() == Some(team) || self.team_b.team_id() == Some(team)
    }

    /// Winner and loser of a finished match with resolved teams. None for draws.
    pub fn outcome(&self) -> Option<(TeamId, TeamId)> {
        let score = self.score?;
        let (a, b) = self.teams()?;
        match score.a.cmp(&score.b) {
            std::cmp::Ordering::Greater => Some((a, b)),
            std::cmp::Ordering::Less => Some((b, a)),
            std::cmp::Ordering::Equal => None,
        }
    }
}
