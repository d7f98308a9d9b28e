//! Integration tests for the context actions
//!
//! Each test drives a full deterministic headless scenario and asserts on
//! the final snapshot, so the controller, the concrete actions, and the
//! tick ordering are exercised together exactly as the binary runs them.

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

#[test]
fn test_recover_heals_to_full_consuming_slots() {
    // 50 damage, then Recover auto-starts: one slot every 2 seconds, 25
    // physical each. Two slots close the gap exactly.
    let result = run(
        r#"{
            "name": "recover_full",
            "player": {
                "stats": { "max_physical": 100.0, "max_mental": 60.0, "slot_value": 30.0 },
                "actions": ["Recover"]
            },
            "script": [
                { "at": 0.5, "action": { "type": "damage_player", "amount": 50.0 } }
            ],
            "max_duration_secs": 20
        }"#,
    );

    assert_eq!(result.outcome, ScenarioOutcome::Completed);
    assert_eq!(result.player_state, "Normal");
    assert_eq!(result.player.current_physical, 100.0);
    assert_eq!(result.player.current_mental, 0.0);
    // Roughly two consumption intervals after the damage landed.
    assert!(
        result.elapsed > 4.0 && result.elapsed < 6.0,
        "elapsed was {}",
        result.elapsed
    );
}

#[test]
fn test_recover_ends_exhausted_short_of_full_health() {
    // 60 damage against two slots of healing: +50 is all the pool can fund,
    // so the action ends exhausted at 90 physical and the world never
    // settles back to full.
    let result = run(
        r#"{
            "name": "recover_exhausted",
            "player": {
                "stats": { "max_physical": 100.0, "max_mental": 60.0, "slot_value": 30.0 },
                "actions": ["Recover"]
            },
            "script": [
                { "at": 0.5, "action": { "type": "damage_player", "amount": 60.0 } }
            ],
            "max_duration_secs": 8
        }"#,
    );

    assert_eq!(result.outcome, ScenarioOutcome::Timeout);
    assert_eq!(result.player.current_physical, 90.0);
    assert_eq!(result.player.current_mental, 0.0);
}

#[test]
fn test_recover_interrupted_by_damage_then_restarts() {
    let log_path = temp_log_path("recover_interrupt");
    let json = format!(
        r#"{{
            "name": "recover_interrupt",
            "player": {{
                "stats": {{ "max_physical": 100.0, "max_mental": 60.0, "slot_value": 30.0 }},
                "actions": ["Recover"]
            }},
            "script": [
                {{ "at": 0.5, "action": {{ "type": "damage_player", "amount": 50.0 }} }},
                {{ "at": 1.5, "action": {{ "type": "damage_player", "amount": 10.0 }} }}
            ],
            "max_duration_secs": 8,
            "output_path": {:?}
        }}"#,
        log_path.display().to_string()
    );
    let result = run(&json);

    // The second hit interrupts the first attempt and resets its interval
    // timer; the restarted action still only funds +50 total.
    assert_eq!(result.player.current_physical, 90.0);
    assert_eq!(result.player.current_mental, 0.0);
    assert_eq!(result.outcome, ScenarioOutcome::Timeout);

    let saved = std::fs::read_to_string(&log_path).expect("log file must exist");
    let _ = std::fs::remove_file(&log_path);
    let interrupted = Regex::new(r"ended Recover \(interrupted\)").unwrap();
    let exhausted = Regex::new(r"ended Recover \(exhausted\)").unwrap();
    assert!(interrupted.is_match(&saved), "log must record the interruption");
    assert!(exhausted.is_match(&saved), "log must record the exhausted restart");
}

#[test]
fn test_resonance_honors_minimum_duration_floor() {
    // The enemy is downed for only ~0.25s before reviving; the channel must
    // still hold for the 0.5s floor before reporting target lost.
    let log_path = temp_log_path("resonance_floor");
    let json = format!(
        r#"{{
            "name": "resonance_floor",
            "player": {{
                "stats": {{ "max_physical": 100.0, "max_mental": 60.0, "slot_value": 30.0 }},
                "actions": ["Resonance"]
            }},
            "enemies": [
                {{
                    "position": [2.0, 0.0, 0.0],
                    "stats": {{ "max_physical": 5.0, "max_mental": 50.0, "slot_value": 30.0 }},
                    "detection_range": 0.5
                }}
            ],
            "script": [
                {{ "at": 0.5, "action": {{ "type": "damage_enemy", "index": 0, "amount": 5.0 }} }}
            ],
            "max_duration_secs": 10,
            "output_path": {:?}
        }}"#,
        log_path.display().to_string()
    );
    let result = run(&json);

    assert_eq!(result.outcome, ScenarioOutcome::Completed);
    // One slot was spent on the channel; the enemy survived it.
    assert_eq!(result.player.current_mental, 30.0);
    assert!(!result.enemies[0].destroyed);
    assert_eq!(result.enemies[0].state, "Normal");

    let saved = std::fs::read_to_string(&log_path).expect("log file must exist");
    let _ = std::fs::remove_file(&log_path);
    let parsed: Value = serde_json::from_str(&saved).unwrap();
    let entries = parsed["entries"].as_array().unwrap();
    let time_of = |pattern: &str| -> f32 {
        let regex = Regex::new(pattern).unwrap();
        entries
            .iter()
            .find(|e| regex.is_match(e["message"].as_str().unwrap()))
            .unwrap_or_else(|| panic!("no log entry matching {}", pattern))["timestamp"]
            .as_f64()
            .unwrap() as f32
    };
    let started = time_of("started Resonance");
    let ended = time_of(r"ended Resonance \(target lost\)");
    assert!(
        ended - started >= 0.45,
        "channel ran only {:.3}s before target-lost",
        ended - started
    );
}

#[test]
fn test_resonance_completion_destroys_target_and_grants_invulnerability() {
    // The enemy stays downed for its full 5s revival, so the 3s channel
    // completes and destroys it. The scripted 30 damage at t=2 lands during
    // the channel and must be suppressed entirely.
    let result = run(
        r#"{
            "name": "resonance_kill",
            "player": {
                "stats": { "max_physical": 100.0, "max_mental": 60.0, "slot_value": 30.0 },
                "actions": ["Resonance"]
            },
            "enemies": [
                {
                    "position": [2.0, 0.0, 0.0],
                    "stats": { "max_physical": 100.0, "max_mental": 50.0, "slot_value": 30.0 },
                    "detection_range": 0.5
                }
            ],
            "script": [
                { "at": 0.5, "action": { "type": "damage_enemy", "index": 0, "amount": 100.0 } },
                { "at": 2.0, "action": { "type": "damage_player", "amount": 30.0 } }
            ],
            "max_duration_secs": 30
        }"#,
    );

    assert_eq!(result.outcome, ScenarioOutcome::Completed);
    assert!(result.enemies[0].destroyed);
    assert_eq!(result.enemies[0].state, "Destroyed");
    assert_eq!(result.player.current_mental, 30.0);
    // Invulnerable for the whole channel: the scripted hit never landed.
    assert_eq!(result.player.current_physical, 100.0);
    // Channel completion at ~3.5s plus the 5s destruction countdown.
    assert!(
        result.elapsed > 8.0 && result.elapsed < 10.0,
        "elapsed was {}",
        result.elapsed
    );
}

#[test]
fn test_interact_grants_weapon_enabling_aimed_attacks() {
    let result = run(
        r#"{
            "name": "weapon_pickup",
            "player": {
                "stats": { "max_physical": 100.0, "max_mental": 60.0, "slot_value": 30.0 }
            },
            "enemies": [
                {
                    "position": [3.0, 0.0, 0.0],
                    "stats": { "max_physical": 100.0, "max_mental": 50.0, "slot_value": 30.0 },
                    "detection_range": 1.0,
                    "attack_range": 0.5
                }
            ],
            "interactables": [
                { "position": [0.5, 0.0, 0.0], "duration": 1.0 }
            ],
            "script": [
                { "at": 2.0, "action": { "type": "aim", "enabled": true } },
                { "at": 2.2, "action": { "type": "attack" } },
                { "at": 2.5, "action": { "type": "aim", "enabled": false } }
            ],
            "max_duration_secs": 10
        }"#,
    );

    // The pickup completed (the aim request was honored) and one aimed
    // attack landed on the patrolling enemy.
    assert_eq!(result.outcome, ScenarioOutcome::Completed);
    assert_eq!(result.enemies[0].final_physical, 75.0);
    assert_eq!(result.enemies[0].state, "Normal");
    assert_eq!(result.player_state, "Normal");
}

#[test]
fn test_interact_survives_damage_that_still_applies() {
    // Interact cannot be interrupted but grants no protection either: a hit
    // mid-pickup drops health while the channel runs to completion.
    let log_path = temp_log_path("interact_through_damage");
    let json = format!(
        r#"{{
            "name": "interact_through_damage",
            "player": {{
                "stats": {{ "max_physical": 100.0, "max_mental": 90.0, "slot_value": 30.0 }},
                "actions": ["Interact"]
            }},
            "interactables": [
                {{ "position": [0.5, 0.0, 0.0], "duration": 3.0 }}
            ],
            "script": [
                {{ "at": 1.0, "action": {{ "type": "damage_player", "amount": 30.0 }} }}
            ],
            "max_duration_secs": 6,
            "output_path": {:?}
        }}"#,
        log_path.display().to_string()
    );
    let result = run(&json);

    // The hit landed in full.
    assert_eq!(result.player.current_physical, 70.0);
    // Nothing refills physical health here, so the world never settles.
    assert_eq!(result.outcome, ScenarioOutcome::Timeout);

    let saved = std::fs::read_to_string(&log_path).expect("log file must exist");
    let _ = std::fs::remove_file(&log_path);
    assert!(
        Regex::new(r"completed weapon pickup").unwrap().is_match(&saved),
        "the pickup must still run to completion"
    );
    assert!(
        !Regex::new(r"ended Interact \((interrupted|cancelled)\)").unwrap().is_match(&saved),
        "the channel must not be cut short by the hit"
    );
}

#[test]
fn test_downed_mid_interaction_releases_the_object() {
    // Lethal damage during the pickup cancels the action and must also
    // release the object, so the revived player can pick it up after all.
    let log_path = temp_log_path("downed_mid_interaction");
    let json = format!(
        r#"{{
            "name": "downed_mid_interaction",
            "player": {{
                "stats": {{ "max_physical": 100.0, "max_mental": 90.0, "slot_value": 30.0 }}
            }},
            "interactables": [
                {{ "position": [0.5, 0.0, 0.0], "duration": 2.0 }}
            ],
            "script": [
                {{ "at": 1.0, "action": {{ "type": "damage_player", "amount": 100.0 }} }}
            ],
            "max_duration_secs": 20,
            "output_path": {:?}
        }}"#,
        log_path.display().to_string()
    );
    let result = run(&json);

    assert_eq!(result.outcome, ScenarioOutcome::Completed);
    assert_eq!(result.player_state, "Normal");
    // Revived around t=6, then the retried 2 second pickup.
    assert!(
        result.elapsed > 7.5 && result.elapsed < 9.5,
        "elapsed was {}",
        result.elapsed
    );

    let saved = std::fs::read_to_string(&log_path).expect("log file must exist");
    let _ = std::fs::remove_file(&log_path);
    assert!(
        Regex::new(r"ended Interact \(cancelled\)").unwrap().is_match(&saved),
        "going down must cancel the running pickup"
    );
    assert!(
        Regex::new(r"completed weapon pickup").unwrap().is_match(&saved),
        "the object must be usable again after revival"
    );
}

#[test]
fn test_snapshot_reports_registered_actions() {
    let result = run(
        r#"{
            "name": "registration",
            "player": {
                "stats": { "max_physical": 100.0, "max_mental": 60.0, "slot_value": 30.0 },
                "actions": ["Recover", "Interact"]
            },
            "max_duration_secs": 5
        }"#,
    );
    assert_eq!(result.outcome, ScenarioOutcome::Completed);
    assert_eq!(result.player.actions.len(), 2);
}
