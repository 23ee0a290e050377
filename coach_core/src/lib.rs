#![forbid(unsafe_code)]

//! Core domain model and playback engine for the Custom Coach workout timer.
//!
//! This crate provides:
//! - Domain types (exercises, phases, programs, timeline steps)
//! - Timeline sequencer
//! - Session state machine and its clock driver
//! - Audio cue derivation
//! - Persistence (program store, workout history)

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod defaults;
pub mod sequencer;
pub mod player;
pub mod clock;
pub mod announce;
pub mod store;
pub mod history;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use sequencer::{estimate_duration, flatten, format_time};
pub use player::{Session, SessionObserver, SessionSnapshot, SessionStatus, Transition};
pub use clock::{ClockDriver, ManualClock, SystemClock, TimeSource};
pub use announce::{Announcement, AnnouncementSink, Announcer};
pub use store::ProgramStore;
pub use history::{JsonlSink, WorkoutSink};
