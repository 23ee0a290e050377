//! Core domain types for Custom Coach.
//!
//! This module defines the authored program model and the derived timeline:
//! - Exercises, phases and programs (persisted by the program store)
//! - Workout steps (flattened timeline, ephemeral per session)
//! - Workout records (appended to the workout log)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generate a fresh identifier for a program, phase or exercise
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// ============================================================================
// Program Model
// ============================================================================

/// How an exercise is measured
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    /// Runs for `duration_seconds`, advanced by the clock
    Timed,
    /// Runs until the user marks `reps` as done
    Reps,
}

/// Role of a phase inside a program
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Warmup,
    Main,
    Core,
    Cooldown,
}

impl PhaseKind {
    /// Default display name for a phase of this kind
    pub fn default_name(&self) -> &'static str {
        match self {
            PhaseKind::Warmup => "Warm-up",
            PhaseKind::Main => "Main block",
            PhaseKind::Core => "Core / Posture",
            PhaseKind::Cooldown => "Stretching / Cool-down",
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PhaseKind::Warmup => "warmup",
            PhaseKind::Main => "main",
            PhaseKind::Core => "core",
            PhaseKind::Cooldown => "cooldown",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for PhaseKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "warmup" | "warm-up" | "warm_up" => Ok(PhaseKind::Warmup),
            "main" => Ok(PhaseKind::Main),
            "core" => Ok(PhaseKind::Core),
            "cooldown" | "cool-down" | "cool_down" => Ok(PhaseKind::Cooldown),
            other => Err(crate::Error::Other(format!("Unknown phase kind: {}", other))),
        }
    }
}

/// A single exercise inside a phase
///
/// Only one of `duration_seconds` / `reps` is meaningful, selected by `kind`.
/// The inactive one is kept so switching kinds in the editor is lossless.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub kind: ExerciseKind,
    pub duration_seconds: u32,
    pub reps: u32,
    pub rest_after_seconds: u32,
}

impl Exercise {
    /// Timed exercise with a fresh id
    pub fn timed(name: impl Into<String>, duration_seconds: u32, rest_after_seconds: u32) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            kind: ExerciseKind::Timed,
            duration_seconds,
            reps: 0,
            rest_after_seconds,
        }
    }

    /// Reps-based exercise with a fresh id
    pub fn reps(name: impl Into<String>, reps: u32, rest_after_seconds: u32) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            kind: ExerciseKind::Reps,
            duration_seconds: 0,
            reps,
            rest_after_seconds,
        }
    }
}

/// A named block of a program, repeated `cycles` times
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Phase {
    pub id: String,
    pub kind: PhaseKind,
    pub name: String,
    pub exercises: Vec<Exercise>,
    pub cycles: u32,
    pub rest_between_cycles_seconds: u32,
}

impl Phase {
    /// Empty phase of the given kind using its default name
    pub fn new(kind: PhaseKind) -> Self {
        Self {
            id: new_id(),
            kind,
            name: kind.default_name().to_string(),
            exercises: Vec::new(),
            cycles: 1,
            rest_between_cycles_seconds: 0,
        }
    }
}

/// An authored workout program
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Program {
    pub id: String,
    pub name: String,
    pub phases: Vec<Phase>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Program {
    /// Empty program with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            name: name.into(),
            phases: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Total number of exercises across all phases (one cycle each)
    pub fn exercise_count(&self) -> usize {
        self.phases.iter().map(|p| p.exercises.len()).sum()
    }

    /// Refresh `updated_at`
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ============================================================================
// Flattened Timeline
// ============================================================================

/// Kind of a timeline step
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Exercise,
    Rest,
    CycleRest,
}

/// One atomic unit of the flattened session timeline
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkoutStep {
    pub id: String,
    pub kind: StepKind,
    pub label: String,
    pub phase_id: String,
    pub phase_name: String,
    pub phase_kind: PhaseKind,
    pub exercise_kind: ExerciseKind,
    /// `None` for reps-based exercise steps
    pub duration_seconds: Option<u32>,
    pub reps: Option<u32>,
    pub current_cycle: u32,
    pub total_cycles: u32,
    /// Index of the source exercise; `None` for cycle rests
    pub exercise_index: Option<usize>,
    pub total_exercises_in_phase: usize,
}

impl WorkoutStep {
    /// Whether the clock advances this step
    pub fn is_timed(&self) -> bool {
        self.duration_seconds.is_some()
    }

    /// Duration loaded into the countdown when entering this step
    pub fn initial_seconds(&self) -> u32 {
        self.duration_seconds.unwrap_or(0)
    }

    pub fn is_rest(&self) -> bool {
        matches!(self.kind, StepKind::Rest | StepKind::CycleRest)
    }
}

// ============================================================================
// Workout Log
// ============================================================================

/// A played session, appended to the workout log when the player exits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub id: Uuid,
    pub program_id: String,
    pub program_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_elapsed_seconds: u32,
    pub steps_total: usize,
    pub steps_reached: usize,
    /// True when the session reached Finished, false when stopped early
    pub completed: bool,
}
