//! Timeline sequencer.
//!
//! Expands a program into the ordered list of steps the player walks through:
//! - One exercise step per exercise per cycle
//! - A rest step after each exercise with `rest_after_seconds > 0`,
//!   except after the last exercise of the last cycle
//! - A cycle-rest step between cycles, never after the last one

use crate::{ExerciseKind, Phase, Program, StepKind, WorkoutStep};

/// Label used for post-exercise rest steps
pub const REST_LABEL: &str = "Rest";

/// Label used for inter-cycle rest steps
pub const CYCLE_REST_LABEL: &str = "Rest between cycles";

/// Estimated duration of one reps-based set when sizing a program
pub const REPS_SET_ESTIMATE_SECONDS: u32 = 30;

/// Flatten a program into its session timeline
///
/// Pure: equal programs produce equal timelines, including step ids,
/// which are numbered `step-0`, `step-1`, ... within this call.
pub fn flatten(program: &Program) -> Vec<WorkoutStep> {
    let mut steps = Vec::new();
    let mut counter = 0usize;
    let mut next_id = || {
        let id = format!("step-{}", counter);
        counter += 1;
        id
    };

    for phase in &program.phases {
        let total_exercises = phase.exercises.len();

        for cycle in 1..=phase.cycles {
            for (idx, exercise) in phase.exercises.iter().enumerate() {
                let (duration_seconds, reps) = match exercise.kind {
                    ExerciseKind::Timed => (Some(exercise.duration_seconds), None),
                    ExerciseKind::Reps => (None, Some(exercise.reps)),
                };

                steps.push(WorkoutStep {
                    id: next_id(),
                    kind: StepKind::Exercise,
                    label: exercise.name.clone(),
                    duration_seconds,
                    reps,
                    exercise_kind: exercise.kind,
                    exercise_index: Some(idx),
                    ..phase_step(phase, cycle)
                });

                let last_of_phase = idx + 1 == total_exercises && cycle == phase.cycles;
                if exercise.rest_after_seconds > 0 && !last_of_phase {
                    steps.push(WorkoutStep {
                        id: next_id(),
                        kind: StepKind::Rest,
                        label: REST_LABEL.to_string(),
                        duration_seconds: Some(exercise.rest_after_seconds),
                        exercise_index: Some(idx),
                        ..phase_step(phase, cycle)
                    });
                }
            }

            // An empty phase contributes nothing, cycle rests included
            if cycle < phase.cycles
                && phase.rest_between_cycles_seconds > 0
                && total_exercises > 0
            {
                steps.push(WorkoutStep {
                    id: next_id(),
                    kind: StepKind::CycleRest,
                    label: CYCLE_REST_LABEL.to_string(),
                    duration_seconds: Some(phase.rest_between_cycles_seconds),
                    ..phase_step(phase, cycle)
                });
            }
        }
    }

    tracing::debug!(
        "Flattened program '{}' into {} steps",
        program.name,
        steps.len()
    );
    steps
}

/// Step skeleton carrying the phase metadata shared by every step of a cycle
fn phase_step(phase: &Phase, cycle: u32) -> WorkoutStep {
    WorkoutStep {
        id: String::new(),
        kind: StepKind::Rest,
        label: String::new(),
        phase_id: phase.id.clone(),
        phase_name: phase.name.clone(),
        phase_kind: phase.kind,
        exercise_kind: ExerciseKind::Timed,
        duration_seconds: None,
        reps: None,
        current_cycle: cycle,
        total_cycles: phase.cycles,
        exercise_index: None,
        total_exercises_in_phase: phase.exercises.len(),
    }
}

/// Estimate the total duration of a program in seconds
///
/// Reps-based sets count as `REPS_SET_ESTIMATE_SECONDS` each. Rests follow
/// the same suppression rules as `flatten`. Saturates at `u32::MAX`.
pub fn estimate_duration(program: &Program) -> u32 {
    flatten(program)
        .iter()
        .map(|step| step.duration_seconds.unwrap_or(REPS_SET_ESTIMATE_SECONDS))
        .fold(0u32, u32::saturating_add)
}

/// Format seconds as `m:ss`
pub fn format_time(total_seconds: u32) -> String {
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}
