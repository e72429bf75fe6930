//! Runs the bundled demo pack and scenario end to end.

use std::path::PathBuf;

use arbiter_content::application::command_handlers::handle_load_pack_file;
use arbiter_content::application::query_handlers::get_pack_summary;
use arbiter_core::config::EngineConfig;
use arbiter_core::rng::SystemRng;
use arbiter_sim::runner::{SimulationReport, load_templates, run_scenario};
use arbiter_sim::scenario::Scenario;
use uuid::Uuid;

fn demo(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(file)
}

fn run(seed: u64) -> SimulationReport {
    let templates = load_templates(Some(&demo("content.yaml"))).unwrap();
    let scenario = Scenario::from_file(&demo("scenario.yaml")).unwrap();
    run_scenario(
        &scenario,
        templates,
        EngineConfig::default(),
        Box::new(SystemRng::seeded(seed)),
    )
    .unwrap()
}

fn actor<'a>(
    report: &'a SimulationReport,
    name: &str,
) -> &'a arbiter_rules::application::query_handlers::ActorView {
    report.actors.iter().find(|a| a.name == name).unwrap()
}

#[test]
fn test_demo_pack_loads_cleanly() {
    let pack = handle_load_pack_file(&demo("content.yaml"), Uuid::new_v4()).unwrap();
    let summary = get_pack_summary(&pack);

    assert_eq!(summary.actions, 9);
    assert_eq!(summary.effects, 4);
    assert_eq!(summary.resources, 2);
    assert!(summary.issues.is_empty());
    assert!(summary.dangling.is_empty());
}

#[test]
fn test_demo_scenario_runs_to_completion() {
    let report = run(7);

    let blessed = report
        .journal
        .iter()
        .filter(|line| line.step == 0 && line.event_type == "rules.effect_given")
        .count();
    assert_eq!(blessed, 2);

    let brenna = actor(&report, "Brenna");
    assert!(brenna.modifiers.iter().any(|m| m == "Bless"));
    assert!(brenna.modifiers.iter().any(|m| m == "great_weapon_fighting"));
    assert_eq!(brenna.resources.len(), 1);
    assert_eq!(brenna.resources[0].resource_type, "inspiration");
    assert!(brenna.resources[0].temporary);

    let ilsa = actor(&report, "Ilsa");
    assert_eq!(ilsa.resources.iter().filter(|r| r.exhausted).count(), 1);

    let sequence: Vec<i64> = report.journal.iter().map(|l| l.sequence_number).collect();
    assert!(sequence.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn test_same_seed_replays_the_same_fight() {
    let first = run(42);
    let second = run(42);

    let types = |report: &SimulationReport| -> Vec<(usize, &'static str)> {
        report
            .journal
            .iter()
            .map(|line| (line.step, line.event_type))
            .collect()
    };
    assert_eq!(types(&first), types(&second));

    let hit_points = |report: &SimulationReport| -> Vec<i64> {
        report.actors.iter().map(|a| a.hit_points).collect()
    };
    assert_eq!(hit_points(&first), hit_points(&second));
}

#[test]
fn test_bless_helps_its_bearer_and_not_their_enemies() {
    let report = run(7);

    let rolled = |step: usize, event_type: &str, key: &str| -> Vec<i64> {
        report
            .journal
            .iter()
            .filter(|line| line.step == step && line.event_type == event_type)
            .map(|line| {
                let body = &line.payload[key];
                body["total"].as_i64().unwrap() - body["natural"].as_i64().unwrap()
            })
            .collect()
    };

    // Longsword: strength 3, proficiency 2, Bless 2.
    assert_eq!(rolled(2, "rules.attack_resolved", "AttackResolved"), vec![7]);
    // Burning hands: the goblin saves with dex 2, the hobgoblin with dex 1.
    assert_eq!(
        rolled(5, "rules.saving_throw_resolved", "SavingThrowResolved"),
        vec![2, 1]
    );
}
