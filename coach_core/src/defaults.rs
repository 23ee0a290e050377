//! Default templates for new programs and exercises.
//!
//! Every call generates fresh ids, so templates can be instantiated any
//! number of times into the same store.

use crate::types::*;

/// Name used when a program is created without one
pub const DEFAULT_PROGRAM_NAME: &str = "My program";

/// New exercise as added from the editor
///
/// Timed exercises default to 30 seconds, reps-based ones to 10 reps.
/// Both get a 15 second rest afterwards.
pub fn default_exercise(name: impl Into<String>, timed: bool) -> Exercise {
    if timed {
        Exercise::timed(name, 30, 15)
    } else {
        Exercise::reps(name, 10, 15)
    }
}

/// The four-phase starter program: warm-up, main block, core, cool-down
pub fn default_phases() -> Vec<Phase> {
    vec![
        Phase {
            exercises: vec![
                Exercise::timed("Shoulder circles", 30, 0),
                Exercise::timed("Hip rotations", 30, 0),
                Exercise::timed("High knees", 60, 0),
                Exercise::timed("Slow squats", 60, 0),
                Exercise::timed("Wall push-ups", 60, 0),
                Exercise::timed("Deep breathing", 30, 0),
            ],
            ..Phase::new(PhaseKind::Warmup)
        },
        Phase {
            cycles: 3,
            rest_between_cycles_seconds: 90,
            exercises: vec![
                Exercise::reps("Squats", 12, 30),
                Exercise::reps("Push-ups", 10, 30),
                Exercise::reps("Home rows", 12, 30),
                Exercise::timed("Plank", 30, 30),
            ],
            ..Phase::new(PhaseKind::Main)
        },
        Phase {
            exercises: vec![
                Exercise::timed("Left side plank", 20, 10),
                Exercise::timed("Right side plank", 20, 10),
                Exercise::reps("Superman", 10, 0),
            ],
            ..Phase::new(PhaseKind::Core)
        },
        Phase {
            exercises: vec![
                Exercise::timed("Chest stretch", 60, 0),
                Exercise::timed("Back stretch", 60, 0),
            ],
            ..Phase::new(PhaseKind::Cooldown)
        },
    ]
}

/// A new program populated with `default_phases`
pub fn default_program(name: impl Into<String>) -> Program {
    Program {
        phases: default_phases(),
        ..Program::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::flatten;
    use std::collections::HashSet;

    #[test]
    fn test_default_phases_shape() {
        let phases = default_phases();

        let kinds: Vec<_> = phases.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PhaseKind::Warmup,
                PhaseKind::Main,
                PhaseKind::Core,
                PhaseKind::Cooldown
            ]
        );
        assert_eq!(phases[1].cycles, 3);
        assert_eq!(phases[1].rest_between_cycles_seconds, 90);
        assert!(phases.iter().all(|p| p.cycles >= 1));
    }

    #[test]
    fn test_default_ids_are_unique() {
        let a = default_program("A");
        let b = default_program("B");

        let mut ids = HashSet::new();
        for program in [&a, &b] {
            assert!(ids.insert(program.id.clone()));
            for phase in &program.phases {
                assert!(ids.insert(phase.id.clone()));
                for exercise in &phase.exercises {
                    assert!(ids.insert(exercise.id.clone()));
                }
            }
        }
    }

    #[test]
    fn test_default_program_timeline() {
        let steps = flatten(&default_program("Default"));

        // Warm-up 6, main 3x(4 exercises + 4 rests) - trailing rest + 2 cycle
        // rests, core 3 + 2 rests, cool-down 2
        assert_eq!(steps.len(), 6 + (3 * 8 - 1 + 2) + 5 + 2);
    }

    #[test]
    fn test_default_exercise() {
        let timed = default_exercise("Lunges", true);
        assert_eq!(timed.kind, ExerciseKind::Timed);
        assert_eq!(timed.duration_seconds, 30);

        let reps = default_exercise("Dips", false);
        assert_eq!(reps.kind, ExerciseKind::Reps);
        assert_eq!(reps.reps, 10);
        assert_eq!(reps.rest_after_seconds, 15);
    }
}
