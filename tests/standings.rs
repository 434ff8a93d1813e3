//! Integration tests for standings and tie-breaking.

use chrono::NaiveDate;
use field_tournament_web::{
    calculate_standings, compute_standings, publish, record_score, remove_team, set_manual_tiebreak,
    CriterionKind, PlacementCriterion, Standing, Team, TeamId, Tournament, TournamentConfig,
    TournamentError,
};
use proptest::prelude::*;

fn config() -> TournamentConfig {
    TournamentConfig::starting_at(
        NaiveDate::from_ymd_opt(2026, 6, 13)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap(),
    )
}

fn published(names: &[&str], config: TournamentConfig) -> Tournament {
    let teams = names.iter().map(|n| Team::new(*n)).collect();
    let mut t = Tournament::with_teams("League", config, teams);
    publish(&mut t).unwrap();
    t
}

fn id(t: &Tournament, name: &str) -> TeamId {
    t.teams.iter().find(|team| team.name == name).unwrap().id
}

/// Record `home goals_home : goals_away away` regardless of how the fixture is oriented.
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

fn row<'a>(table: &'a [Standing], t: &Tournament, name: &str) -> &'a Standing {
    let team = id(t, name);
    table.iter().find(|r| r.team_id == team).unwrap()
}

fn order(table: &[Standing], t: &Tournament) -> Vec<String> {
    table
        .iter()
        .map(|r| t.team(r.team_id).unwrap().name.clone())
        .collect()
}

/// A and B end level on points, goal difference and goals scored; A won their meeting.
fn level_pair(config: TournamentConfig) -> Tournament {
    let mut t = published(&["A", "B", "C", "D"], config);
    play(&mut t, "A", "B", 1, 0);
    play(&mut t, "C", "A", 1, 0);
    play(&mut t, "B", "C", 1, 0);
    play(&mut t, "A", "D", 2, 0);
    play(&mut t, "B", "D", 2, 0);
    play(&mut t, "C", "D", 1, 1);
    t
}

#[test]
fn points_follow_the_point_system() {
    let mut t = published(&["A", "B", "C"], config());
    play(&mut t, "A", "B", 3, 1);
    play(&mut t, "B", "C", 2, 2);

    let table = compute_standings(&t, None).unwrap();
    let a = row(&table, &t, "A");
    assert_eq!((a.played, a.won, a.points, a.goals_for, a.goals_against), (1, 1, 3, 3, 1));
    assert_eq!(a.goal_difference(), 2);
    let b = row(&table, &t, "B");
    assert_eq!((b.played, b.won, b.drawn, b.lost, b.points), (2, 0, 1, 1, 1));
    let c = row(&table, &t, "C");
    assert_eq!((c.played, c.drawn, c.points), (1, 1, 1));
    assert_eq!(order(&table, &t), vec!["A", "C", "B"]);
}

#[test]
fn standings_are_recomputed_identically() {
    let t = level_pair(config());
    assert_eq!(compute_standings(&t, None).unwrap(), compute_standings(&t, None).unwrap());
}

#[test]
fn direct_comparison_breaks_a_two_team_tie() {
    let t = level_pair(config());
    let table = compute_standings(&t, None).unwrap();
    assert_eq!(order(&table, &t), vec!["A", "B", "C", "D"]);
    assert!(table.iter().all(|r| !r.tied));
    assert_eq!(row(&table, &t, "B").position, 2);
}

#[test]
fn without_direct_comparison_the_tie_stays() {
    let mut cfg = config();
    cfg.criteria = vec![
        PlacementCriterion::new(CriterionKind::Points, 0),
        PlacementCriterion::new(CriterionKind::GoalDifference, 1),
    ];
    let t = level_pair(cfg);
    let table = compute_standings(&t, None).unwrap();
    let (a, b) = (row(&table, &t, "A"), row(&table, &t, "B"));
    assert!(a.tied && b.tied);
    assert_eq!((a.position, b.position), (1, 1));
    // Registration order inside the tie.
    assert_eq!(order(&table, &t)[..2], ["A".to_string(), "B".to_string()]);
    assert_eq!(row(&table, &t, "C").position, 3);
}

#[test]
fn criteria_apply_in_configured_order() {
    let mut cfg = config();
    cfg.criteria = vec![
        PlacementCriterion::new(CriterionKind::GoalsFor, 0),
        PlacementCriterion::new(CriterionKind::Points, 1),
    ];
    let mut t = published(&["A", "B", "C"], cfg);
    play(&mut t, "A", "B", 1, 0);
    play(&mut t, "A", "C", 1, 0);
    play(&mut t, "B", "C", 5, 5);
    let table = compute_standings(&t, None).unwrap();
    // A has the most points but only 2 goals; B and C are also level on points.
    assert_eq!(row(&table, &t, "A").position, 3);
    assert!(row(&table, &t, "B").tied);
}

#[test]
fn fewer_goals_against_ranks_higher() {
    let mut cfg = config();
    cfg.criteria = vec![
        PlacementCriterion::new(CriterionKind::Points, 0),
        PlacementCriterion::new(CriterionKind::GoalsAgainst, 1),
    ];
    let mut t = published(&["A", "B", "C"], cfg);
    play(&mut t, "A", "C", 4, 3);
    play(&mut t, "B", "C", 1, 0);
    play(&mut t, "A", "B", 0, 0);
    let table = compute_standings(&t, None).unwrap();
    assert_eq!(order(&table, &t), vec!["B", "A", "C"]);
}

#[test]
fn direct_comparison_settles_a_pair_left_by_a_later_criterion() {
    let mut cfg = config();
    cfg.criteria = vec![
        PlacementCriterion::new(CriterionKind::Points, 0),
        PlacementCriterion::new(CriterionKind::DirectComparison, 1),
        PlacementCriterion::new(CriterionKind::GoalDifference, 2),
    ];
    let mut t = published(&["A", "B", "C", "D"], cfg);
    play(&mut t, "A", "B", 1, 0);
    play(&mut t, "B", "C", 1, 0);
    play(&mut t, "C", "A", 1, 0);
    play(&mut t, "A", "D", 1, 0);
    play(&mut t, "B", "D", 1, 0);
    play(&mut t, "C", "D", 3, 0);

    // Three level on points; goal difference lifts C and leaves A and B, who met once.
    let table = compute_standings(&t, None).unwrap();
    assert_eq!(order(&table, &t), vec!["C", "A", "B", "D"]);
    assert!(table.iter().all(|r| !r.tied));
}

#[test]
fn three_way_tie_is_not_split_by_direct_comparison() {
    let mut t = published(&["A", "B", "C"], config());
    play(&mut t, "A", "B", 1, 0);
    play(&mut t, "B", "C", 1, 0);
    play(&mut t, "C", "A", 1, 0);
    let table = compute_standings(&t, None).unwrap();
    assert!(table.iter().all(|r| r.tied && r.position == 1));
    assert_eq!(order(&table, &t), vec!["A", "B", "C"]);
}

#[test]
fn manual_tiebreak_orders_a_tied_block() {
    let mut t = published(&["A", "B", "C"], config());
    play(&mut t, "A", "B", 1, 0);
    play(&mut t, "B", "C", 1, 0);
    play(&mut t, "C", "A", 1, 0);
    let manual = vec![id(&t, "C"), id(&t, "A"), id(&t, "B")];
    set_manual_tiebreak(&mut t, None, manual).unwrap();

    let table = compute_standings(&t, None).unwrap();
    assert_eq!(order(&table, &t), vec!["C", "A", "B"]);
    assert!(table.iter().all(|r| !r.tied));
    assert_eq!(table.iter().map(|r| r.position).collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[test]
fn manual_tiebreak_rejects_duplicates_and_short_lists() {
    let mut t = published(&["A", "B", "C"], config());
    let a = id(&t, "A");
    assert_eq!(set_manual_tiebreak(&mut t, None, vec![a, a]), Err(TournamentError::InvalidTiebreakOrder));
    assert_eq!(set_manual_tiebreak(&mut t, None, vec![a]), Err(TournamentError::InvalidTiebreakOrder));
}

#[test]
fn removed_team_results_still_count_for_opponents() {
    let mut t = published(&["A", "B", "C"], config());
    play(&mut t, "A", "C", 2, 0);
    let c = id(&t, "C");
    remove_team(&mut t, c).unwrap();

    let table = compute_standings(&t, None).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(row(&table, &t, "A").points, 3);
    assert!(t.team(c).unwrap().removed);
}

#[test]
fn unknown_group_is_reported() {
    let t = published(&["A", "B"], config());
    assert_eq!(
        compute_standings(&t, Some("Z")),
        Err(TournamentError::GroupNotFound("Z".to_string()))
    );
}

proptest! {
    #[test]
    fn prop_table_totals_are_consistent(
        scores in proptest::collection::vec((0u32..6, 0u32..6), 15),
        n in 2usize..7,
        played in 0usize..16,
    ) {
        let names: Vec<String> = (0..n).map(|i| format!("T{i}")).collect();
        let teams: Vec<Team> = names.iter().map(Team::new).collect();
        let mut t = Tournament::with_teams("Prop", config(), teams);
        publish(&mut t).unwrap();

        let ids: Vec<_> = t.matches.iter().map(|m| m.id).take(played).collect();
        for (match_id, (a, b)) in ids.iter().zip(&scores) {
            record_score(&mut t, *match_id, *a, *b).unwrap();
        }
        let finished = t.matches.iter().filter(|m| m.is_finished()).count() as u32;

        let table = calculate_standings(&t.config, &t.teams, None, &t.matches, &t.manual_tiebreaks);
        prop_assert_eq!(table.len(), n);
        let results: u32 = table.iter().map(|r| r.won + r.drawn + r.lost).sum();
        prop_assert_eq!(results, 2 * finished);
        let scored: u32 = table.iter().map(|r| r.goals_for).sum();
        let conceded: u32 = table.iter().map(|r| r.goals_against).sum();
        prop_assert_eq!(scored, conceded);

        prop_assert_eq!(table[0].position, 1);
        prop_assert!(table.windows(2).all(|w| w[0].position <= w[1].position));
        prop_assert_eq!(&table, &calculate_standings(&t.config, &t.teams, None, &t.matches, &t.manual_tiebreaks));
    }
}
