//! Integration tests for the setup phase: configuration, roster, group draw, publication.

use field_tournament_web::{
    draw_groups, import_teams_csv, publish, remove_team, restore_team, ConfigurationError,
    CriterionKind, GroupConfig, PlacementCriterion, Precondition, RefereePolicy, Team, Tournament,
    TournamentConfig, TournamentError, TournamentState,
};
use std::collections::HashMap;

fn grouped(groups: &[&str]) -> TournamentConfig {
    TournamentConfig {
        groups: groups.iter().map(|g| GroupConfig::new(*g)).collect(),
        ..TournamentConfig::default()
    }
}

fn config_error(config: TournamentConfig) -> ConfigurationError {
    match config.validate() {
        Err(TournamentError::Configuration(e)) => e,
        other => panic!("expected a configuration error, got {:?}", other),
    }
}

#[test]
fn default_configuration_is_valid() {
    assert_eq!(TournamentConfig::default().validate(), Ok(()));
}

#[test]
fn invalid_configurations_are_named() {
    let mut cfg = TournamentConfig::default();
    cfg.rounds = 0;
    assert_eq!(config_error(cfg), ConfigurationError::NoRounds);

    let mut cfg = TournamentConfig::default();
    cfg.group_phase.match_minutes = 0;
    assert_eq!(config_error(cfg), ConfigurationError::ZeroMatchDuration);

    let mut cfg = TournamentConfig::default();
    cfg.referees = RefereePolicy::Pool { size: 0 };
    assert_eq!(config_error(cfg), ConfigurationError::EmptyRefereePool);

    assert_eq!(
        config_error(grouped(&["A", "a"])),
        ConfigurationError::DuplicateGroup("a".to_string())
    );
    assert_eq!(
        config_error(grouped(&[" B"])),
        ConfigurationError::InvalidGroupName(" B".to_string())
    );

    let mut cfg = grouped(&["A"]);
    cfg.groups[0] = GroupConfig::with_fields("A", vec![2]);
    assert_eq!(
        config_error(cfg),
        ConfigurationError::FieldOutOfRange {
            group: "A".to_string(),
            field: 2
        }
    );
}

#[test]
fn criteria_must_be_unique_and_include_a_scalar() {
    let mut cfg = TournamentConfig::default();
    cfg.criteria = vec![PlacementCriterion::new(CriterionKind::DirectComparison, 0)];
    assert_eq!(config_error(cfg), ConfigurationError::NoScalarCriterion);

    let mut cfg = TournamentConfig::default();
    cfg.criteria = vec![
        PlacementCriterion::new(CriterionKind::Points, 0),
        PlacementCriterion::new(CriterionKind::Points, 1),
    ];
    assert_eq!(config_error(cfg), ConfigurationError::DuplicateCriterion(CriterionKind::Points));

    let mut cfg = TournamentConfig::default();
    cfg.criteria = vec![
        PlacementCriterion::new(CriterionKind::Points, 0),
        PlacementCriterion::new(CriterionKind::Wins, 0),
    ];
    assert_eq!(config_error(cfg), ConfigurationError::DuplicateCriterionPosition(0));
}

#[test]
fn configuration_reads_partial_json() {
    let cfg: TournamentConfig = serde_json::from_str(
        r#"{"fields": 3, "start_time": "2026-05-01T09:00:00", "groups": [{"name": "A", "allowed_fields": [1, 2]}],
            "referees": {"mode": "pool", "size": 4}, "finals": {"final_match": true}}"#,
    )
    .unwrap();
    assert_eq!(cfg.fields, 3);
    assert_eq!(cfg.allowed_fields(Some("a")), vec![1, 2]);
    assert_eq!(cfg.referees, RefereePolicy::Pool { size: 4 });
    assert!(cfg.finals.final_match && cfg.finals.allow_parallel);
    assert_eq!(cfg.rounds, 1);
    assert_eq!(cfg.validate(), Ok(()));
}

#[test]
fn team_names_are_unique_and_trimmed() {
    let mut t = Tournament::new("Cup", TournamentConfig::default());
    let id = t.add_team("  Rovers ", None).unwrap();
    assert_eq!(t.team(id).unwrap().name, "Rovers");
    assert_eq!(t.add_team("rovers", None), Err(TournamentError::DuplicateTeamName));
    assert_eq!(t.add_team("   ", None), Err(TournamentError::EmptyTeamName));
}

#[test]
fn draft_removal_deletes_published_removal_marks() {
    let mut t = Tournament::new("Cup", TournamentConfig::default());
    let a = t.add_team("A", None).unwrap();
    let b = t.add_team("B", None).unwrap();
    let c = t.add_team("C", None).unwrap();
    remove_team(&mut t, c).unwrap();
    assert!(t.team(c).is_none());

    publish(&mut t).unwrap();
    remove_team(&mut t, b).unwrap();
    assert!(t.team(b).unwrap().removed);
    assert_eq!(t.active_teams().count(), 1);
    restore_team(&mut t, b).unwrap();
    assert!(t.team(b).unwrap().is_active());
    assert!(t.team(a).is_some());
}

#[test]
fn csv_import_adds_all_rows() {
    let mut t = Tournament::new("Cup", grouped(&["A", "B"]));
    let csv = "name,group\nLions,A\nTigers, b\nBears,A\n# reserve\nWolves,B\n";
    assert_eq!(import_teams_csv(&mut t, csv.as_bytes()), Ok(4));
    let tigers = t.teams.iter().find(|team| team.name == "Tigers").unwrap();
    assert_eq!(tigers.group.as_deref(), Some("B"));
}

#[test]
fn csv_import_is_all_or_nothing() {
    let mut t = Tournament::new("Cup", grouped(&["A"]));
    let csv = "Lions,A\nTigers,A\nLions,A\n";
    match import_teams_csv(&mut t, csv.as_bytes()) {
        Err(TournamentError::Import { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected an import error, got {:?}", other),
    }
    assert!(t.teams.is_empty());

    let csv = "Lions,Z\n";
    assert!(matches!(import_teams_csv(&mut t, csv.as_bytes()), Err(TournamentError::Import { line: 1, .. })));
}

#[test]
fn seeded_draw_is_repeatable_and_balanced() {
    let teams: Vec<Team> = (0..7).map(|i| Team::new(format!("T{i}"))).collect();
    let mut first = Tournament::with_teams("Cup", grouped(&["A", "B", "C"]), teams.clone());
    let mut second = Tournament::with_teams("Cup", grouped(&["A", "B", "C"]), teams);
    draw_groups(&mut first, 42).unwrap();
    draw_groups(&mut second, 42).unwrap();
    assert_eq!(first.teams, second.teams);

    let mut sizes: HashMap<String, usize> = HashMap::new();
    for team in &first.teams {
        *sizes.entry(team.group.clone().unwrap()).or_default() += 1;
    }
    let mut counts: Vec<usize> = sizes.into_values().collect();
    counts.sort_unstable();
    assert_eq!(counts, vec![2, 2, 3]);
}

#[test]
fn draw_needs_groups() {
    let mut t = Tournament::with_teams("Cup", TournamentConfig::default(), vec![Team::new("A")]);
    assert_eq!(
        draw_groups(&mut t, 1),
        Err(TournamentError::Configuration(ConfigurationError::NoGroups))
    );
}

#[test]
fn publish_moves_to_published_once() {
    let teams = (0..4).map(|i| Team::new(format!("T{i}"))).collect();
    let mut t = Tournament::with_teams("Cup", TournamentConfig::default(), teams);
    publish(&mut t).unwrap();
    assert_eq!(t.state, TournamentState::Published);
    assert_eq!(t.matches.len(), 6);
    assert_eq!(publish(&mut t), Err(TournamentError::InvalidState(Precondition::NotDraft)));
    assert_eq!(
        t.add_team("Late", None),
        Err(TournamentError::InvalidState(Precondition::NotDraft))
    );
}

#[test]
fn failed_publish_leaves_the_draft_untouched() {
    let mut t = Tournament::with_teams("Cup", grouped(&["A", "B"]), vec![Team::in_group("X", "A"), Team::in_group("Y", "A")]);
    assert!(matches!(
        publish(&mut t),
        Err(TournamentError::Configuration(ConfigurationError::NotEnoughTeams { .. }))
    ));
    assert_eq!(t.state, TournamentState::Draft);
    assert!(t.matches.is_empty());
}
