//! Audio cue derivation.
//!
//! The announcer observes session transitions and emits the cues the audio
//! layer plays. It never feeds back into the session.
//!
//! - Entering an exercise step: speak its name, then the "go" tone
//! - Entering a rest or cycle-rest step: the double rest tone
//! - Last 3 seconds of any timed step: spoken countdown with rising tones
//! - Reaching Finished: the finish cue

use crate::player::{SessionObserver, SessionStatus, Transition};
use crate::StepKind;
use std::sync::mpsc::Sender;

/// Tone played after an exercise name is announced
pub const GO_TONE_HZ: u32 = 1320;

/// Tone played (twice) when a rest begins
pub const REST_TONE_HZ: u32 = 440;

/// Highest countdown value announced
pub const COUNTDOWN_FROM: u32 = 3;

/// Tone for a countdown value, if it is announced
pub fn countdown_tone_hz(seconds_left: u32) -> Option<u32> {
    match seconds_left {
        3 => Some(660),
        2 => Some(880),
        1 => Some(1100),
        _ => None,
    }
}

/// A cue for the audio layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Announcement {
    ExerciseName(String),
    Go,
    RestTone,
    Countdown(u32),
    Finished,
}

/// Destination for announcements
pub trait AnnouncementSink {
    fn announce(&mut self, announcement: Announcement);
}

impl AnnouncementSink for Sender<Announcement> {
    fn announce(&mut self, announcement: Announcement) {
        // Receiver gone means nobody is listening anymore
        let _ = self.send(announcement);
    }
}

impl AnnouncementSink for Vec<Announcement> {
    fn announce(&mut self, announcement: Announcement) {
        self.push(announcement);
    }
}

/// Session observer translating transitions into announcements
///
/// Step entries are keyed on the step index last announced, so a step
/// reached while paused is announced once playback resumes.
pub struct Announcer<S: AnnouncementSink> {
    sink: S,
    announced_step: Option<usize>,
    /// Last countdown value announced for the current step
    last_countdown: Option<u32>,
}

impl<S: AnnouncementSink> Announcer<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            announced_step: None,
            last_countdown: None,
        }
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn reset(&mut self) {
        self.announced_step = None;
        self.last_countdown = None;
    }
}

impl<S: AnnouncementSink> SessionObserver for Announcer<S> {
    fn on_transition(&mut self, transition: &Transition) {
        if transition.finished() {
            self.reset();
            self.sink.announce(Announcement::Finished);
            return;
        }

        let before = &transition.before;
        let after = &transition.after;
        if before.status != SessionStatus::Idle
            && before.current_step_index == after.current_step_index
            && after.seconds_remaining > before.seconds_remaining
        {
            // Restarted step, possibly while paused: its countdown may play again
            self.last_countdown = None;
        }

        match after.status {
            SessionStatus::Playing => {}
            SessionStatus::Idle => {
                self.reset();
                return;
            }
            SessionStatus::Paused | SessionStatus::Finished => return,
        }
        if before.status == SessionStatus::Idle {
            self.reset();
        }
        let Some(step) = after.current_step.as_ref() else {
            return;
        };

        let entered = self.announced_step != Some(after.current_step_index);
        if entered {
            self.announced_step = Some(after.current_step_index);
            self.last_countdown = None;
            match step.kind {
                StepKind::Exercise => {
                    self.sink
                        .announce(Announcement::ExerciseName(step.label.clone()));
                    self.sink.announce(Announcement::Go);
                }
                StepKind::Rest | StepKind::CycleRest => {
                    self.sink.announce(Announcement::RestTone);
                }
            }
        }

        if !step.is_timed() {
            return;
        }
        let remaining = after.seconds_remaining;
        if (1..=COUNTDOWN_FROM).contains(&remaining) && self.last_countdown != Some(remaining) {
            self.last_countdown = Some(remaining);
            self.sink.announce(Announcement::Countdown(remaining));
        }
    }
}
