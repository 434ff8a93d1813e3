//! Integration tests for final-stage placement resolution.

use chrono::NaiveDate;
use field_tournament_web::{
    publish, record_score, remove_team, resolve_placeholder, restore_team, set_manual_tiebreak,
    start_match,
    BracketKey, CriterionKind, FinalsConfig, GroupConfig, Placeholder, PlacementCriterion,
    Precondition, Team, TeamId, TeamRef, Tournament, TournamentConfig, TournamentError,
};

fn config(groups: &[&str]) -> TournamentConfig {
    let mut cfg = TournamentConfig::starting_at(
        NaiveDate::from_ymd_opt(2026, 7, 4)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap(),
    );
    cfg.fields = 2;
    cfg.groups = groups.iter().map(|g| GroupConfig::new(*g)).collect();
    cfg.finals = FinalsConfig {
        final_match: true,
        third_place: true,
        ..FinalsConfig::default()
    };
    cfg
}

fn published(config: TournamentConfig, groups: &[(&str, usize)]) -> Tournament {
    let teams = groups
        .iter()
        .flat_map(|(g, n)| (1..=*n).map(move |i| Team::in_group(format!("{g}{i}"), *g)))
        .collect();
    let mut t = Tournament::with_teams("Cup", config, teams);
    publish(&mut t).unwrap();
    t
}

fn id(t: &Tournament, name: &str) -> TeamId {
    t.teams.iter().find(|team| team.name == name).unwrap().id
}

fn play(t: &mut Tournament, home: &str, away: &str, goals_home: u32, goals_away: u32) {
    let (h, a) = (id(t, home), id(t, away));
    let m = t.matches.iter().find(|m| m.involves(h) && m.involves(a)).unwrap();
    let (match_id, home_is_a) = (m.id, m.team_a.team_id() == Some(h));
    if home_is_a {
        record_score(t, match_id, goals_home, goals_away).unwrap();
    } else {
        record_score(t, match_id, goals_away, goals_home).unwrap();
    }
}

fn slots(t: &Tournament, key: BracketKey) -> (TeamRef, TeamRef) {
    let m = t.bracket_match(key).unwrap();
    (m.team_a.clone(), m.team_b.clone())
}

fn team(t: &Tournament, name: &str) -> TeamRef {
    TeamRef::Team(id(t, name))
}

fn finish_two_groups(t: &mut Tournament) {
    play(t, "A1", "A2", 2, 0);
    play(t, "A1", "A3", 3, 0);
    play(t, "A2", "A3", 1, 0);
    play(t, "B1", "B2", 1, 0);
    play(t, "B1", "B3", 1, 0);
    play(t, "B2", "B3", 2, 1);
}

#[test]
fn semifinals_wait_for_their_groups() {
    let mut t = published(config(&["A", "B"]), &[("A", 3), ("B", 3)]);
    assert_eq!(
        slots(&t, BracketKey::Semi(1)),
        (
            TeamRef::Placeholder(Placeholder::group_rank("A", 1)),
            TeamRef::Placeholder(Placeholder::group_rank("B", 2)),
        )
    );

    // Group A alone is enough for its own ranks.
    play(&mut t, "A1", "A2", 2, 0);
    play(&mut t, "A1", "A3", 3, 0);
    play(&mut t, "A2", "A3", 1, 0);
    let (a, b) = slots(&t, BracketKey::Semi(1));
    assert_eq!(a, team(&t, "A1"));
    assert_eq!(b, TeamRef::Placeholder(Placeholder::group_rank("B", 2)));
    assert_eq!(slots(&t, BracketKey::Semi(2)).1, team(&t, "A2"));
}

#[test]
fn group_winners_and_runners_up_cross_over() {
    let mut t = published(config(&["A", "B"]), &[("A", 3), ("B", 3)]);
    finish_two_groups(&mut t);
    assert_eq!(slots(&t, BracketKey::Semi(1)), (team(&t, "A1"), team(&t, "B2")));
    assert_eq!(slots(&t, BracketKey::Semi(2)), (team(&t, "B1"), team(&t, "A2")));
    assert_eq!(resolve_placeholder(&t, &Placeholder::group_rank("b", 3)), Ok(Some(id(&t, "B3"))));
}

#[test]
fn final_and_third_place_follow_the_semifinals() {
    let mut t = published(config(&["A", "B"]), &[("A", 3), ("B", 3)]);
    finish_two_groups(&mut t);
    play(&mut t, "A1", "B2", 0, 1);
    play(&mut t, "B1", "A2", 3, 2);

    assert_eq!(slots(&t, BracketKey::Final), (team(&t, "B2"), team(&t, "B1")));
    assert_eq!(slots(&t, BracketKey::ThirdPlace), (team(&t, "A1"), team(&t, "A2")));
    assert_eq!(
        resolve_placeholder(&t, &Placeholder::Winner(BracketKey::Semi(2))),
        Ok(Some(id(&t, "B1")))
    );
}

#[test]
fn final_stage_draws_are_rejected() {
    let mut t = published(config(&["A", "B"]), &[("A", 3), ("B", 3)]);
    finish_two_groups(&mut t);
    let semi = t.bracket_match(BracketKey::Semi(1)).unwrap().id;
    assert_eq!(
        record_score(&mut t, semi, 1, 1),
        Err(TournamentError::InvalidState(Precondition::PlayoffDraw))
    );
}

#[test]
fn unresolved_final_cannot_be_scored() {
    let mut t = published(config(&["A", "B"]), &[("A", 3), ("B", 3)]);
    let fin = t.bracket_match(BracketKey::Final).unwrap().id;
    assert_eq!(
        record_score(&mut t, fin, 2, 1),
        Err(TournamentError::InvalidState(Precondition::MatchUnresolved))
    );
}

#[test]
fn tie_without_direct_comparison_needs_a_manual_decision() {
    let mut cfg = config(&["A", "B"]);
    cfg.criteria = vec![
        PlacementCriterion::new(CriterionKind::Points, 0),
        PlacementCriterion::new(CriterionKind::GoalDifference, 1),
    ];
    let mut t = published(cfg, &[("A", 3), ("B", 3)]);
    play(&mut t, "B1", "B2", 1, 0);
    play(&mut t, "B1", "B3", 1, 0);
    play(&mut t, "B2", "B3", 1, 0);
    play(&mut t, "A1", "A3", 2, 0);
    play(&mut t, "A2", "A3", 2, 0);

    let (a1, a2) = (id(&t, "A1"), id(&t, "A2"));
    let last = t.matches.iter().find(|m| m.involves(a1) && m.involves(a2)).unwrap().id;
    let update = record_score(&mut t, last, 1, 1).unwrap();

    let tie = update
        .placements
        .unresolved_ties
        .iter()
        .find(|tie| tie.placeholder == Placeholder::group_rank("A", 1))
        .expect("tie on group A winner");
    assert_eq!(tie.teams, vec![a1, a2]);
    assert!(matches!(
        update.placements.check_ties(),
        Err(TournamentError::UnresolvedTie { .. })
    ));
    assert!(matches!(
        resolve_placeholder(&t, &Placeholder::group_rank("A", 2)),
        Err(TournamentError::UnresolvedTie { .. })
    ));
    // The slot stays a placeholder instead of guessing.
    assert_eq!(slots(&t, BracketKey::Semi(1)).0, TeamRef::Placeholder(Placeholder::group_rank("A", 1)));

    let report = set_manual_tiebreak(&mut t, Some("A"), vec![a2, a1]).unwrap();
    assert!(report.unresolved_ties.is_empty());
    let semi1 = t.bracket_match(BracketKey::Semi(1)).unwrap().id;
    assert!(report.changed.contains(&semi1));
    assert_eq!(slots(&t, BracketKey::Semi(1)), (TeamRef::Team(a2), team(&t, "B2")));
    assert_eq!(slots(&t, BracketKey::Semi(2)), (team(&t, "B1"), TeamRef::Team(a1)));
    assert_eq!(start_match(&mut t, semi1), Ok(()));
}

#[test]
fn removing_a_qualified_team_moves_the_bracket() {
    let mut t = published(config(&["A", "B"]), &[("A", 3), ("B", 3)]);
    finish_two_groups(&mut t);
    let a1 = id(&t, "A1");
    let (semi1, semi2) = (
        t.bracket_match(BracketKey::Semi(1)).unwrap().id,
        t.bracket_match(BracketKey::Semi(2)).unwrap().id,
    );

    // A1's results still count for A2 and A3, so A2 tops the group ahead of A3.
    let report = remove_team(&mut t, a1).unwrap();
    assert_eq!(report.changed, vec![semi1, semi2]);
    assert_eq!(slots(&t, BracketKey::Semi(1)), (team(&t, "A2"), team(&t, "B2")));
    assert_eq!(slots(&t, BracketKey::Semi(2)), (team(&t, "B1"), team(&t, "A3")));

    let report = restore_team(&mut t, a1).unwrap();
    assert_eq!(report.changed, vec![semi1, semi2]);
    assert_eq!(slots(&t, BracketKey::Semi(1)), (team(&t, "A1"), team(&t, "B2")));
    assert_eq!(slots(&t, BracketKey::Semi(2)), (team(&t, "B1"), team(&t, "A2")));
}

#[test]
fn best_runner_up_across_three_groups() {
    let mut t = published(config(&["A", "B", "C"]), &[("A", 2), ("B", 2), ("C", 2)]);
    play(&mut t, "A1", "A2", 3, 0);
    play(&mut t, "B1", "B2", 1, 0);
    play(&mut t, "C1", "C2", 2, 1);

    // C2 lost by one like B2 but scored a goal.
    assert_eq!(slots(&t, BracketKey::Semi(1)), (team(&t, "A1"), team(&t, "C2")));
    assert_eq!(slots(&t, BracketKey::Semi(2)), (team(&t, "B1"), team(&t, "C1")));
}

#[test]
fn level_runners_up_leave_best_second_open() {
    let mut t = published(config(&["A", "B", "C"]), &[("A", 2), ("B", 2), ("C", 2)]);
    play(&mut t, "A1", "A2", 3, 0);
    play(&mut t, "B1", "B2", 1, 0);
    let c1 = id(&t, "C1");
    let last = t.matches.iter().find(|m| !m.is_playoff() && m.involves(c1)).unwrap().id;
    let m = t.get_match(last).unwrap();
    let (sa, sb) = if m.team_a.team_id() == Some(c1) { (1, 0) } else { (0, 1) };
    let update = record_score(&mut t, last, sa, sb).unwrap();

    let tie = update
        .placements
        .unresolved_ties
        .iter()
        .find(|tie| tie.placeholder == Placeholder::BestSecond)
        .expect("bestSecond tie");
    assert_eq!(tie.teams.len(), 2);
    assert_eq!(slots(&t, BracketKey::Semi(1)).1, TeamRef::Placeholder(Placeholder::BestSecond));
}

#[test]
fn table_without_groups_plays_direct_placement_matches() {
    let mut cfg = config(&[]);
    cfg.finals.third_place = true;
    let teams = ["W", "X", "Y", "Z"].iter().map(|n| Team::new(*n)).collect();
    let mut t = Tournament::with_teams("Cup", cfg, teams);
    publish(&mut t).unwrap();
    assert_eq!(t.matches.iter().filter(|m| m.is_playoff()).count(), 2);

    play(&mut t, "W", "X", 1, 0);
    play(&mut t, "W", "Y", 1, 0);
    play(&mut t, "W", "Z", 1, 0);
    play(&mut t, "X", "Y", 1, 0);
    play(&mut t, "X", "Z", 1, 0);
    play(&mut t, "Y", "Z", 1, 0);
    assert_eq!(slots(&t, BracketKey::Final), (team(&t, "W"), team(&t, "X")));
    assert_eq!(slots(&t, BracketKey::ThirdPlace), (team(&t, "Y"), team(&t, "Z")));
}
