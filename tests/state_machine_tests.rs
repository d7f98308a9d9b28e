//! Integration tests for the player and enemy state graphs
//!
//! These tests verify transition validation, terminal states, the revival
//! round trip, and sub-mode handling through the public machine API.

use coresim::combat::enemy::{EnemyMode, EnemyState};
use coresim::combat::player::PlayerState;
use coresim::combat::state_machine::{MachineState, StateMachine};

#[test]
fn test_player_aiming_round_trip() {
    let mut machine = StateMachine::new(PlayerState::Normal);
    assert!(machine.change_state(PlayerState::Aiming));
    assert!(machine.is_in(PlayerState::Aiming));
    assert_eq!(machine.previous(), PlayerState::Normal);
    assert!(machine.change_state(PlayerState::Normal));
}

#[test]
fn test_player_invalid_edges_are_rejected_without_change() {
    let mut machine = StateMachine::new(PlayerState::Aiming);
    // Aiming cannot jump straight into an interaction.
    assert!(!machine.change_state(PlayerState::Interacting));
    assert!(machine.is_in(PlayerState::Aiming));
    // Self-transition is always rejected.
    assert!(!machine.change_state(PlayerState::Aiming));
}

#[test]
fn test_player_revival_round_trip() {
    let mut machine = StateMachine::new(PlayerState::Normal);
    assert!(machine.change_state(PlayerState::Downed));
    assert!(machine.change_state(PlayerState::Normal));
    assert!(machine.is_in(PlayerState::Normal));
}

#[test]
fn test_true_death_is_terminal() {
    let mut machine = StateMachine::new(PlayerState::Downed);
    assert!(machine.change_state(PlayerState::TrueDeath));
    for next in [
        PlayerState::Normal,
        PlayerState::Aiming,
        PlayerState::Interacting,
        PlayerState::Downed,
    ] {
        assert!(!machine.change_state(next), "TrueDeath -> {:?} must fail", next);
    }
    assert!(machine.is_in(PlayerState::TrueDeath));
}

#[test]
fn test_true_death_reachable_from_every_living_state() {
    for start in [
        PlayerState::Normal,
        PlayerState::Aiming,
        PlayerState::Interacting,
        PlayerState::Downed,
    ] {
        assert!(
            PlayerState::can_transition(start, PlayerState::TrueDeath),
            "{:?} -> TrueDeath must exist",
            start
        );
    }
}

#[test]
fn test_enemy_outer_graph() {
    let mut machine = StateMachine::new(EnemyState::Normal(EnemyMode::Patrol));
    assert!(machine.change_state(EnemyState::Reviving));
    assert!(machine.change_state(EnemyState::Normal(EnemyMode::Patrol)));
    assert!(machine.change_state(EnemyState::TrueDeath));
    assert!(!machine.change_state(EnemyState::Reviving));
}

#[test]
fn test_enemy_sub_mode_changes_without_transition() {
    let mut machine = StateMachine::new(EnemyState::Normal(EnemyMode::Patrol));
    assert!(machine.set_sub_state(EnemyState::Normal(EnemyMode::Chase)));
    assert_eq!(machine.current().mode(), Some(EnemyMode::Chase));
    // The machine never saw a transition.
    assert!(machine.is_in(EnemyState::Normal(EnemyMode::Patrol)));

    // Sub-state replacement cannot smuggle in a variant change.
    assert!(!machine.set_sub_state(EnemyState::Reviving));
    assert_eq!(machine.current().mode(), Some(EnemyMode::Chase));
}

#[test]
fn test_time_in_state_and_just_entered() {
    let mut machine = StateMachine::new(PlayerState::Normal);
    assert!(machine.just_entered());
    machine.update(0.5);
    machine.update(0.5);
    assert!(!machine.just_entered());
    assert_eq!(machine.time_in_state(), 1.0);

    machine.change_state(PlayerState::Aiming);
    assert!(machine.just_entered());
    assert_eq!(machine.time_in_state(), 0.0);
}

#[test]
fn test_state_names_round_trip() {
    for state in [
        PlayerState::Normal,
        PlayerState::Aiming,
        PlayerState::Interacting,
        PlayerState::Downed,
        PlayerState::TrueDeath,
    ] {
        assert_eq!(PlayerState::from_name(state.name()), Some(state));
    }
    assert_eq!(PlayerState::from_name("Dancing"), None);

    // The enemy sub-mode is not part of the persisted name.
    assert_eq!(
        EnemyState::from_name(EnemyState::Normal(EnemyMode::Combat).name()),
        Some(EnemyState::Normal(EnemyMode::Patrol))
    );
}
