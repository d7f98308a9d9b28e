//! Encounter logging
//!
//! Records all outbound combat notifications for post-run analysis. The log
//! is the single consumer of the event queues: one recording pass per tick,
//! in the resolution phase, after every gameplay system has written its
//! events.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::events::{
    ActionEndedEvent, ActionStartedEvent, DeathEvent, DeathKind, HealthAxis, HealthChangedEvent,
    InteractionCompletedEvent, StateChangedEvent, TierChangedEvent,
};

/// A single entry in the encounter log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp in encounter time (seconds since run start)
    pub timestamp: f32,
    /// The type of event
    pub event_type: LogEventType,
    /// Human-readable description of the event
    pub message: String,
}

/// Types of log events for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogEventType {
    /// Damage dealt or health restored
    HealthChange,
    /// A health tier boundary was crossed
    TierChange,
    /// A state machine transitioned
    StateChange,
    /// An action started or ended
    Action,
    /// An interaction ran to completion
    Interaction,
    /// Physical or true death
    Death,
    /// Run event (start, end, etc.)
    RunEvent,
}

/// Metadata written alongside the entries when saving a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub scenario_name: String,
    pub seed: Option<u64>,
    pub duration_secs: f32,
    pub outcome: String,
}

#[derive(Serialize)]
struct SavedLog<'a> {
    metadata: &'a RunMetadata,
    entries: &'a [LogEntry],
}

/// The encounter log resource storing all events
#[derive(Resource, Default)]
pub struct EncounterLog {
    /// All log entries in chronological order
    pub entries: Vec<LogEntry>,
    /// Current encounter time
    pub run_time: f32,
}

impl EncounterLog {
    /// Clear the log for a new run
    pub fn clear(&mut self) {
        self.entries.clear();
        self.run_time = 0.0;
    }

    /// Add a new entry to the log
    pub fn log(&mut self, event_type: LogEventType, message: String) {
        self.entries.push(LogEntry {
            timestamp: self.run_time,
            event_type,
            message,
        });
    }

    /// Get entries filtered by event type
    pub fn filter_by_type(&self, event_type: LogEventType) -> Vec<&LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Get the last N entries
    pub fn recent(&self, count: usize) -> Vec<&LogEntry> {
        self.entries.iter().rev().take(count).rev().collect()
    }

    /// Save the log as JSON. Defaults to `encounter_log.json` in the working
    /// directory when no path is given.
    pub fn save_to_file(
        &self,
        metadata: &RunMetadata,
        path: Option<&Path>,
    ) -> Result<PathBuf, String> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("encounter_log.json"));
        let saved = SavedLog {
            metadata,
            entries: &self.entries,
        };
        let json = serde_json::to_string_pretty(&saved)
            .map_err(|e| format!("failed to serialize log: {}", e))?;
        std::fs::write(&path, json)
            .map_err(|e| format!("failed to write {}: {}", path.display(), e))?;
        Ok(path)
    }
}

/// Advance the log clock once per tick.
pub fn advance_log_clock(time: Res<Time>, mut log: ResMut<EncounterLog>) {
    log.run_time += time.delta_secs();
}

/// Drain every outbound queue into the log (resolution phase).
#[allow(clippy::too_many_arguments)]
pub fn record_events(
    mut log: ResMut<EncounterLog>,
    mut health_events: EventReader<HealthChangedEvent>,
    mut tier_events: EventReader<TierChangedEvent>,
    mut state_events: EventReader<StateChangedEvent>,
    mut started_events: EventReader<ActionStartedEvent>,
    mut ended_events: EventReader<ActionEndedEvent>,
    mut interaction_events: EventReader<InteractionCompletedEvent>,
    mut death_events: EventReader<DeathEvent>,
) {
    for event in health_events.read() {
        let axis = match event.axis {
            HealthAxis::Physical => "physical",
            HealthAxis::Mental => "mental",
        };
        let verb = if event.delta < 0.0 { "lost" } else { "restored" };
        log.log(
            LogEventType::HealthChange,
            format!(
                "{:?} {} {:.1} {} health ({:.1}/{:.1})",
                event.entity,
                verb,
                event.delta.abs(),
                axis,
                event.current,
                event.max
            ),
        );
    }
    for event in tier_events.read() {
        let axis = match event.change.axis() {
            HealthAxis::Physical => "physical",
            HealthAxis::Mental => "mental",
        };
        log.log(
            LogEventType::TierChange,
            format!(
                "{:?} {} tier now {}",
                event.entity,
                axis,
                event.change.tier_name()
            ),
        );
    }
    for event in state_events.read() {
        log.log(
            LogEventType::StateChange,
            format!("{:?} state {} -> {}", event.entity, event.from, event.to),
        );
    }
    for event in started_events.read() {
        log.log(
            LogEventType::Action,
            format!("{:?} started {}", event.entity, event.action.name()),
        );
    }
    for event in ended_events.read() {
        log.log(
            LogEventType::Action,
            format!(
                "{:?} ended {} ({})",
                event.entity,
                event.action.name(),
                event.reason.name()
            ),
        );
    }
    for event in interaction_events.read() {
        log.log(
            LogEventType::Interaction,
            format!(
                "{:?} completed {} on {:?}",
                event.entity,
                event.effect.name(),
                event.target
            ),
        );
    }
    for event in death_events.read() {
        let kind = match event.kind {
            DeathKind::Physical => "physical death",
            DeathKind::True => "true death",
        };
        log.log(
            LogEventType::Death,
            format!("{:?} suffered {}", event.entity, kind),
        );
    }
}
