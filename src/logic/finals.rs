//! Final stage: bracket layout (quarterfinals, semifinals, final, placement matches).

use crate::models::{
    BracketKey, ConfigurationError, Fixture, Placeholder, TeamId, TournamentConfig, TournamentError,
};

/// Where a group-rank slot comes from: the group name (None = single table) and rank.
fn rank_slot(group: Option<&str>, rank: u32) -> Placeholder {
    match group {
        Some(g) => Placeholder::group_rank(g, rank),
        None => Placeholder::TableRank(rank),
    }
}

/// Matches a bracket match depends on (their result feeds its slots).
pub fn prerequisites<'a>(sources: impl IntoIterator<Item = &'a Placeholder>) -> Vec<BracketKey> {
    sources
        .into_iter()
        .filter_map(|p| match p {
            Placeholder::Winner(k) | Placeholder::Loser(k) => Some(*k),
            _ => None,
        })
        .collect()
}

/// Generate the final-stage fixtures in dependency order.
///
/// Layout by group count:
/// - 0 or 1: direct placement matches from the table (1v2, 3v4, 5v6, 7v8)
/// - 2: semifinals A1-B2 / B1-A2, placement matches between equal ranks
/// - 3: semifinals A1-bestSecond / B1-C1
/// - 4: quarterfinals A1-B2, B1-A2, C1-D2, D1-C2 feeding two semifinals
pub fn generate_finals(
    config: &TournamentConfig,
    partitions: &[(Option<String>, Vec<TeamId>)],
) -> Result<Vec<Fixture>, TournamentError> {
    let finals = &config.finals;
    if !finals.any_enabled() {
        return Ok(Vec::new());
    }

    let size_of = |idx: usize| partitions.get(idx).map(|(_, ids)| ids.len()).unwrap_or(0);
    let name_of = |idx: usize| partitions.get(idx).and_then(|(g, _)| g.as_deref());
    let need = |idx: usize, rank: u32| -> Result<Placeholder, TournamentError> {
        if size_of(idx) < rank as usize {
            return Err(ConfigurationError::GroupTooSmall {
                group: name_of(idx).map(str::to_string),
                rank,
            }
            .into());
        }
        Ok(rank_slot(name_of(idx), rank))
    };

    let mut pairs: Vec<(BracketKey, Placeholder, Placeholder)> = Vec::new();
    let bracket_needed = finals.final_match || finals.third_place;
    let group_count = config.groups.len();

    match group_count {
        0 | 1 => {
            let placement = [
                (finals.final_match, BracketKey::Final, 1),
                (finals.third_place, BracketKey::ThirdPlace, 3),
                (finals.fifth_sixth, BracketKey::FifthSixth, 5),
                (finals.seventh_eighth, BracketKey::SeventhEighth, 7),
            ];
            for (enabled, key, rank) in placement {
                if enabled {
                    pairs.push((key, need(0, rank)?, need(0, rank + 1)?));
                }
            }
        }
        2 => {
            if bracket_needed {
                pairs.push((BracketKey::Semi(1), need(0, 1)?, need(1, 2)?));
                pairs.push((BracketKey::Semi(2), need(1, 1)?, need(0, 2)?));
            }
            if finals.fifth_sixth {
                pairs.push((BracketKey::FifthSixth, need(0, 3)?, need(1, 3)?));
            }
            if finals.seventh_eighth {
                pairs.push((BracketKey::SeventhEighth, need(0, 4)?, need(1, 4)?));
            }
        }
        3 | 4 if finals.fifth_sixth || finals.seventh_eighth => {
            return Err(ConfigurationError::UnsupportedFinals { groups: group_count }.into());
        }
        3 => {
            // bestSecond needs every group to have a runner-up.
            for idx in 0..3 {
                need(idx, 2)?;
            }
            pairs.push((BracketKey::Semi(1), need(0, 1)?, Placeholder::BestSecond));
            pairs.push((BracketKey::Semi(2), need(1, 1)?, need(2, 1)?));
        }
        4 => {
            pairs.push((BracketKey::Quarter(1), need(0, 1)?, need(1, 2)?));
            pairs.push((BracketKey::Quarter(2), need(1, 1)?, need(0, 2)?));
            pairs.push((BracketKey::Quarter(3), need(2, 1)?, need(3, 2)?));
            pairs.push((BracketKey::Quarter(4), need(3, 1)?, need(2, 2)?));
            pairs.push((
                BracketKey::Semi(1),
                Placeholder::Winner(BracketKey::Quarter(1)),
                Placeholder::Winner(BracketKey::Quarter(2)),
            ));
            pairs.push((
                BracketKey::Semi(2),
                Placeholder::Winner(BracketKey::Quarter(3)),
                Placeholder::Winner(BracketKey::Quarter(4)),
            ));
        }
        n => return Err(ConfigurationError::UnsupportedFinals { groups: n }.into()),
    }

    if group_count >= 2 {
        if finals.third_place {
            pairs.push((
                BracketKey::ThirdPlace,
                Placeholder::Loser(BracketKey::Semi(1)),
                Placeholder::Loser(BracketKey::Semi(2)),
            ));
        }
        if finals.final_match {
            pairs.push((
                BracketKey::Final,
                Placeholder::Winner(BracketKey::Semi(1)),
                Placeholder::Winner(BracketKey::Semi(2)),
            ));
        }
    }

    pairs.sort_by_key(|(key, _, _)| key.order());
    Ok(pairs
        .into_iter()
        .map(|(key, a, b)| Fixture::playoff(key, a, b, finals.effective_parallelism(key)))
        .collect())
}
