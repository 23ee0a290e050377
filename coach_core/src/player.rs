//! Session state machine for the guided player.
//!
//! A `Session` owns the flattened timeline of one workout and advances
//! through it one tick (second) at a time.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Playing <-> Paused
//! Playing -> Finished
//! * -> Idle (stop)
//! ```
//!
//! Every operation is safe to call in any state: calls whose precondition
//! does not hold are no-ops and return `false`. Observers registered with
//! `subscribe` are notified after each call that changed the state.

use crate::WorkoutStep;
use serde::{Deserialize, Serialize};

/// Player status
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Playing,
    Paused,
    /// Terminal: only `stop` leaves this state
    Finished,
}

/// Mutable session fields
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct SessionState {
    status: SessionStatus,
    steps: Vec<WorkoutStep>,
    current_step_index: usize,
    seconds_remaining: u32,
    total_elapsed_seconds: u32,
}

impl SessionState {
    fn current_step(&self) -> Option<&WorkoutStep> {
        self.steps.get(self.current_step_index)
    }

    fn is_active(&self) -> bool {
        matches!(self.status, SessionStatus::Playing | SessionStatus::Paused)
    }

    /// Move to the next step, or finish when none is left
    fn advance(&mut self) {
        let next = self.current_step_index + 1;
        match self.steps.get(next) {
            Some(step) => {
                self.current_step_index = next;
                self.seconds_remaining = step.initial_seconds();
            }
            None => {
                self.status = SessionStatus::Finished;
                self.seconds_remaining = 0;
            }
        }
    }
}

/// Read-only view of the session handed to observers and renderers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub current_step_index: usize,
    pub seconds_remaining: u32,
    pub total_elapsed_seconds: u32,
    pub steps_len: usize,
    pub current_step: Option<WorkoutStep>,
}

/// State before and after a state-changing call
#[derive(Clone, Debug)]
pub struct Transition {
    pub before: SessionSnapshot,
    pub after: SessionSnapshot,
}

impl Transition {
    /// True when the call moved the session onto a different step,
    /// including the initial move onto step 0 at start
    pub fn entered_step(&self) -> bool {
        let after_live = matches!(
            self.after.status,
            SessionStatus::Playing | SessionStatus::Paused
        );
        if !after_live {
            return false;
        }
        self.before.status == SessionStatus::Idle
            || self.before.current_step_index != self.after.current_step_index
    }

    pub fn finished(&self) -> bool {
        self.before.status != SessionStatus::Finished
            && self.after.status == SessionStatus::Finished
    }
}

/// Receives every state change of a session
pub trait SessionObserver {
    fn on_transition(&mut self, transition: &Transition);
}

impl<F> SessionObserver for F
where
    F: FnMut(&Transition),
{
    fn on_transition(&mut self, transition: &Transition) {
        self(transition)
    }
}

/// Handle returned by `Session::subscribe`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// The playback state machine
#[derive(Default)]
pub struct Session {
    state: SessionState,
    observers: Vec<(SubscriptionId, Box<dyn SessionObserver>)>,
    next_subscription: u64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Observers ────────────────────────────────────────────────────

    pub fn subscribe(&mut self, observer: impl SessionObserver + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns false when the id was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> SessionStatus {
        self.state.status
    }

    pub fn steps(&self) -> &[WorkoutStep] {
        &self.state.steps
    }

    pub fn current_step_index(&self) -> usize {
        self.state.current_step_index
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.state.seconds_remaining
    }

    pub fn total_elapsed_seconds(&self) -> u32 {
        self.state.total_elapsed_seconds
    }

    pub fn current_step(&self) -> Option<&WorkoutStep> {
        self.state.current_step()
    }

    pub fn next_step(&self) -> Option<&WorkoutStep> {
        self.state.steps.get(self.state.current_step_index + 1)
    }

    /// Playing or Paused
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// 0.0 .. 100.0, share of steps already passed
    pub fn progress(&self) -> f64 {
        if self.state.steps.is_empty() {
            return 0.0;
        }
        self.state.current_step_index as f64 / self.state.steps.len() as f64 * 100.0
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.state.status,
            current_step_index: self.state.current_step_index,
            seconds_remaining: self.state.seconds_remaining,
            total_elapsed_seconds: self.state.total_elapsed_seconds,
            steps_len: self.state.steps.len(),
            current_step: self.state.current_step().cloned(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a session over `steps`. An empty timeline is rejected.
    pub fn start(&mut self, steps: Vec<WorkoutStep>) -> bool {
        self.apply(move |state| {
            let Some(first) = steps.first() else {
                tracing::warn!("Refusing to start a session with no steps");
                return false;
            };
            let seconds_remaining = first.initial_seconds();
            tracing::info!("Session started with {} steps", steps.len());
            *state = SessionState {
                status: SessionStatus::Playing,
                steps,
                current_step_index: 0,
                seconds_remaining,
                total_elapsed_seconds: 0,
            };
            true
        })
    }

    /// Advance session time by one second
    pub fn tick(&mut self) -> bool {
        self.apply(|state| {
            if state.status != SessionStatus::Playing {
                return false;
            }
            let Some(timed) = state.current_step().map(WorkoutStep::is_timed) else {
                return false;
            };

            state.total_elapsed_seconds = state.total_elapsed_seconds.saturating_add(1);

            // Reps-based steps only accumulate elapsed time
            if timed {
                if state.seconds_remaining <= 1 {
                    state.advance();
                    if state.status == SessionStatus::Finished {
                        tracing::info!(
                            "Session finished after {}s",
                            state.total_elapsed_seconds
                        );
                    }
                } else {
                    state.seconds_remaining -= 1;
                }
            }
            true
        })
    }

    pub fn pause(&mut self) -> bool {
        self.apply(|state| {
            if state.status != SessionStatus::Playing {
                return false;
            }
            state.status = SessionStatus::Paused;
            tracing::debug!("Session paused at step {}", state.current_step_index);
            true
        })
    }

    pub fn resume(&mut self) -> bool {
        self.apply(|state| {
            if state.status != SessionStatus::Paused {
                return false;
            }
            state.status = SessionStatus::Playing;
            tracing::debug!("Session resumed at step {}", state.current_step_index);
            true
        })
    }

    /// Move to the next step regardless of time left
    pub fn skip_step(&mut self) -> bool {
        self.apply(|state| {
            if !state.is_active() {
                return false;
            }
            tracing::debug!("Skipping step {}", state.current_step_index);
            state.advance();
            true
        })
    }

    /// Complete a reps-based step. Same mechanics as `skip_step`.
    pub fn mark_reps_done(&mut self) -> bool {
        self.skip_step()
    }

    /// Reload the current step's full duration
    pub fn restart_step(&mut self) -> bool {
        self.apply(|state| {
            if !state.is_active() {
                return false;
            }
            let Some(initial) = state.current_step().map(WorkoutStep::initial_seconds) else {
                return false;
            };
            if state.seconds_remaining == initial {
                return false;
            }
            state.seconds_remaining = initial;
            true
        })
    }

    /// Reset to Idle from any state
    pub fn stop(&mut self) -> bool {
        self.apply(|state| {
            if *state == SessionState::default() {
                return false;
            }
            tracing::info!(
                "Session stopped at step {} after {}s",
                state.current_step_index,
                state.total_elapsed_seconds
            );
            *state = SessionState::default();
            true
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Run `op` and notify observers if it reported a change
    fn apply<F>(&mut self, op: F) -> bool
    where
        F: FnOnce(&mut SessionState) -> bool,
    {
        let before = self.snapshot();
        if !op(&mut self.state) {
            return false;
        }
        if !self.observers.is_empty() {
            let transition = Transition {
                before,
                after: self.snapshot(),
            };
            for (_, observer) in self.observers.iter_mut() {
                observer.on_transition(&transition);
            }
        }
        true
    }
}
