//! Integration tests for the headless scenario runner
//!
//! These cover the end-to-end lifecycle behaviors: the downed/revive loop,
//! terminal mental collapse, outcome classification, seeded determinism,
//! and the saved log format.

use regex::Regex;
use serde_json::Value;

use coresim::headless::{run_scenario, ScenarioConfig, ScenarioOutcome};

fn run(json: &str) -> coresim::headless::ScenarioResult {
    let config = ScenarioConfig::from_json(json).expect("scenario must parse");
    run_scenario(config).expect("scenario must finish")
}

fn temp_log_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("coresim_test_{}_{}.json", name, std::process::id()))
}

const REVIVE_SCENARIO: &str = r#"{
    "name": "revive_loop",
    "player": {
        "stats": { "max_physical": 100.0, "max_mental": 90.0, "slot_value": 30.0 }
    },
    "script": [
        { "at": 1.0, "action": { "type": "damage_player", "amount": 100.0 } }
    ],
    "max_duration_secs": 20
}"#;

#[test]
fn test_lethal_physical_damage_downs_then_revives() {
    let result = run(REVIVE_SCENARIO);

    // Downed at t=1, restored at 20/s so back on its feet around t=6.
    assert_eq!(result.outcome, ScenarioOutcome::Completed);
    assert_eq!(result.player_state, "Normal");
    assert_eq!(result.player.current_physical, 100.0);
    assert!(
        result.elapsed > 5.5 && result.elapsed < 6.6,
        "elapsed was {}",
        result.elapsed
    );
    // Exposure drained roughly 5 seconds of mental at 1/s.
    assert!(
        result.player.current_mental > 84.5 && result.player.current_mental < 85.5,
        "mental was {}",
        result.player.current_mental
    );
}

#[test]
fn test_mental_collapse_during_revival_is_terminal() {
    // Only 3 mental against a 5 second revival: exposure decay wins and the
    // run ends in true death rather than a second wind.
    let result = run(
        r#"{
            "name": "collapse",
            "player": {
                "stats": { "max_physical": 100.0, "max_mental": 3.0, "slot_value": 3.0 }
            },
            "script": [
                { "at": 0.5, "action": { "type": "damage_player", "amount": 100.0 } }
            ],
            "max_duration_secs": 20
        }"#,
    );

    assert_eq!(result.outcome, ScenarioOutcome::PlayerTrueDeath);
    assert_eq!(result.player_state, "TrueDeath");
    assert_eq!(result.player.current_mental, 0.0);
    assert!(
        result.elapsed > 3.0 && result.elapsed < 4.2,
        "elapsed was {}",
        result.elapsed
    );
}

#[test]
fn test_scripted_mental_damage_kills_from_any_state() {
    let result = run(
        r#"{
            "name": "mental_burst",
            "player": {
                "stats": { "max_physical": 100.0, "max_mental": 60.0, "slot_value": 30.0 }
            },
            "script": [
                { "at": 0.5, "action": { "type": "mental_damage_player", "amount": 60.0 } }
            ],
            "max_duration_secs": 10
        }"#,
    );

    assert_eq!(result.outcome, ScenarioOutcome::PlayerTrueDeath);
    assert_eq!(result.player_state, "TrueDeath");
    // Physical health is irrelevant to mental death.
    assert_eq!(result.player.current_physical, 100.0);
}

#[test]
fn test_timeout_when_world_never_settles() {
    // No actions registered and no regeneration: the missing physical
    // health can never come back, so the run times out.
    let result = run(
        r#"{
            "name": "stalemate",
            "player": {
                "stats": { "max_physical": 100.0, "max_mental": 60.0, "slot_value": 30.0 },
                "actions": []
            },
            "script": [
                { "at": 0.2, "action": { "type": "damage_player", "amount": 50.0 } }
            ],
            "max_duration_secs": 3
        }"#,
    );

    assert_eq!(result.outcome, ScenarioOutcome::Timeout);
    assert!(result.elapsed >= 3.0, "elapsed was {}", result.elapsed);
    assert_eq!(result.player.current_physical, 50.0);
}

#[test]
fn test_seeded_runs_are_identical() {
    // A hostile enemy with jittered attack timing: two runs under the same
    // seed must agree on every observable.
    let scenario = r#"{
        "name": "seeded",
        "player": {
            "stats": { "max_physical": 100.0, "max_mental": 9.0, "slot_value": 3.0 },
            "actions": []
        },
        "enemies": [
            {
                "position": [10.0, 0.0, 0.0],
                "stats": { "max_physical": 100.0, "max_mental": 50.0, "slot_value": 30.0 },
                "detection_range": 50.0,
                "attack_range": 1.5,
                "attack_damage": 15.0,
                "attack_interval": 1.0
            }
        ],
        "max_duration_secs": 100,
        "random_seed": 424242
    }"#;

    let first = run(scenario);
    let second = run(scenario);

    assert_eq!(first.outcome, second.outcome);
    assert_eq!(first.elapsed.to_bits(), second.elapsed.to_bits());
    assert_eq!(
        first.player.current_mental.to_bits(),
        second.player.current_mental.to_bits()
    );
    assert_eq!(first.log_entries, second.log_entries);
    assert_eq!(first.enemies[0].final_physical, second.enemies[0].final_physical);
    // Repeated beatdowns drain the mental pool through exposure.
    assert_eq!(first.outcome, ScenarioOutcome::PlayerTrueDeath);
}

#[test]
fn test_saved_log_format() {
    let log_path = temp_log_path("log_format");
    let json = format!(
        r#"{{
            "name": "revive_logged",
            "player": {{
                "stats": {{ "max_physical": 100.0, "max_mental": 90.0, "slot_value": 30.0 }}
            }},
            "script": [
                {{ "at": 1.0, "action": {{ "type": "damage_player", "amount": 100.0 }} }}
            ],
            "max_duration_secs": 20,
            "random_seed": 7,
            "output_path": {:?}
        }}"#,
        log_path.display().to_string()
    );
    let result = run(&json);
    assert_eq!(result.outcome, ScenarioOutcome::Completed);

    let saved = std::fs::read_to_string(&log_path).expect("log file must exist");
    let _ = std::fs::remove_file(&log_path);
    let parsed: Value = serde_json::from_str(&saved).expect("log must be valid JSON");

    assert_eq!(parsed["metadata"]["scenario_name"], "revive_logged");
    assert_eq!(parsed["metadata"]["seed"], 7);
    assert_eq!(parsed["metadata"]["outcome"], "completed");

    let entries = parsed["entries"].as_array().expect("entries array");
    assert!(!entries.is_empty());
    let first_message = entries[0]["message"].as_str().unwrap();
    assert!(
        Regex::new(r"^Scenario .* started$").unwrap().is_match(first_message),
        "unexpected opening entry: {}",
        first_message
    );

    let mut last_timestamp = 0.0_f64;
    for entry in entries {
        let timestamp = entry["timestamp"].as_f64().expect("timestamp number");
        assert!(timestamp >= last_timestamp, "timestamps must be monotonic");
        last_timestamp = timestamp;
    }

    let full_text = entries
        .iter()
        .map(|e| e["message"].as_str().unwrap())
        .collect::<Vec<_>>()
        .join("\n");
    assert!(Regex::new(r"suffered physical death").unwrap().is_match(&full_text));
    assert!(Regex::new(r"state Normal -> Downed").unwrap().is_match(&full_text));
    assert!(Regex::new(r"state Downed -> Normal").unwrap().is_match(&full_text));
}

#[test]
fn test_missing_scenario_file_is_an_error() {
    let error = ScenarioConfig::load_from_file("does_not_exist.json").unwrap_err();
    assert!(error.contains("Failed to read"), "got: {}", error);
}

#[test]
fn test_invalid_scenario_is_rejected() {
    let error = ScenarioConfig::from_json(
        r#"{
            "name": "bad",
            "player": {
                "stats": { "max_physical": 100.0, "max_mental": 60.0, "slot_value": 30.0 },
                "actions": ["Dance"]
            }
        }"#,
    )
    .unwrap_err();
    assert!(error.contains("Dance"), "got: {}", error);
}
