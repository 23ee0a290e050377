use chrono::Utc;
use clap::{Parser, Subcommand};
use coach_core::config::DataConfig;
use coach_core::history::{self, JsonlSink, WorkoutSink};
use coach_core::*;
use std::io::{self, BufRead, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "coach")]
#[command(about = "Personal workout timer with a guided player", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List programs (default)
    List,

    /// Create a program
    New {
        #[arg(long)]
        name: Option<String>,

        /// Start from the four-phase starter template
        #[arg(long)]
        template: bool,
    },

    /// Show a program's phases and flattened timeline
    Show { program: String },

    /// Rename a program
    Rename { program: String, name: String },

    /// Duplicate a program with fresh ids
    Duplicate { program: String },

    /// Delete a program
    Delete { program: String },

    /// Append a phase to a program
    AddPhase {
        program: String,

        /// warmup, main, core or cooldown
        #[arg(long, default_value = "main")]
        kind: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        cycles: u32,

        /// Rest between cycles, in seconds
        #[arg(long, default_value_t = 0)]
        cycle_rest: u32,
    },

    /// Append an exercise to a phase (phases are numbered from 1)
    AddExercise {
        program: String,
        phase: usize,
        name: String,

        /// Timed exercise of this many seconds
        #[arg(long, conflicts_with = "reps", required_unless_present = "reps")]
        seconds: Option<u32>,

        /// Reps-based exercise
        #[arg(long)]
        reps: Option<u32>,

        /// Rest after the exercise, in seconds
        #[arg(long, default_value_t = 0)]
        rest: u32,
    },

    /// Run a program through the guided player
    Play {
        program: String,

        /// Run on a simulated clock without waiting, auto-completing reps
        #[arg(long)]
        simulate: bool,
    },

    /// Show recently played workouts
    History {
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
}

fn main() -> Result<()> {
    // Keep the player display clean; RUST_LOG still overrides
    coach_core::logging::init_with_level("warn");

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let programs_path = DataConfig::programs_path(&data_dir);
    tracing::debug!("Using data directory {:?}", data_dir);

    match cli.command.unwrap_or(Commands::List) {
        Commands::List => cmd_list(&programs_path),
        Commands::New { name, template } => {
            let id = ProgramStore::update(&programs_path, |store| {
                Ok(if template {
                    store.add_program_from_template(name.as_deref())
                } else {
                    store.add_program(name.as_deref())
                })
            })?;
            println!("✓ Created program {}", id);
            Ok(())
        }
        Commands::Show { program } => cmd_show(&programs_path, &program),
        Commands::Rename { program, name } => {
            ProgramStore::update(&programs_path, |store| {
                let id = store.find(&program)?.id.clone();
                store.rename_program(&id, &name)
            })?;
            println!("✓ Renamed to '{}'", name);
            Ok(())
        }
        Commands::Duplicate { program } => {
            let copy_id = ProgramStore::update(&programs_path, |store| {
                let id = store.find(&program)?.id.clone();
                store
                    .duplicate_program(&id)
                    .ok_or_else(|| Error::NotFound(format!("program '{}'", program)))
            })?;
            println!("✓ Duplicated into {}", copy_id);
            Ok(())
        }
        Commands::Delete { program } => {
            let removed = ProgramStore::update(&programs_path, |store| {
                let id = store.find(&program)?.id.clone();
                store.delete_program(&id)
            })?;
            println!("✓ Deleted '{}'", removed.name);
            Ok(())
        }
        Commands::AddPhase {
            program,
            kind,
            name,
            cycles,
            cycle_rest,
        } => {
            let kind: PhaseKind = kind.parse()?;
            let mut phase = Phase::new(kind);
            if let Some(name) = name {
                phase.name = name;
            }
            phase.cycles = cycles;
            phase.rest_between_cycles_seconds = cycle_rest;
            let phase_name = phase.name.clone();

            ProgramStore::update(&programs_path, |store| {
                let id = store.find(&program)?.id.clone();
                store.add_phase(&id, phase)
            })?;
            println!("✓ Added phase '{}'", phase_name);
            Ok(())
        }
        Commands::AddExercise {
            program,
            phase,
            name,
            seconds,
            reps,
            rest,
        } => {
            let exercise = match (seconds, reps) {
                (Some(seconds), _) => Exercise::timed(name, seconds, rest),
                (None, Some(reps)) => Exercise::reps(name, reps, rest),
                (None, None) => defaults::default_exercise(name, true),
            };
            let exercise_name = exercise.name.clone();

            ProgramStore::update(&programs_path, |store| {
                let found = store.find(&program)?;
                let id = found.id.clone();
                let phase_id = phase
                    .checked_sub(1)
                    .and_then(|idx| found.phases.get(idx))
                    .map(|ph| ph.id.clone())
                    .ok_or_else(|| Error::NotFound(format!("phase #{}", phase)))?;
                store.add_exercise(&id, &phase_id, exercise)
            })?;
            println!("✓ Added exercise '{}'", exercise_name);
            Ok(())
        }
        Commands::Play { program, simulate } => {
            cmd_play(&data_dir, &programs_path, &program, simulate, &config)
        }
        Commands::History { days } => cmd_history(&data_dir, days),
    }
}

fn cmd_list(programs_path: &Path) -> Result<()> {
    let store = ProgramStore::load(programs_path)?;

    if store.programs().is_empty() {
        println!("No programs yet. Create one with `coach new --template`.");
        return Ok(());
    }

    for program in store.programs() {
        let exercises = program.exercise_count();
        let duration = if exercises > 0 {
            estimate_duration(program)
        } else {
            0
        };
        println!(
            "  {}  {:<28} {:>3} exercises  ~{}",
            short_id(&program.id),
            program.name,
            exercises,
            format_time(duration)
        );
    }
    Ok(())
}

fn cmd_show(programs_path: &Path, key: &str) -> Result<()> {
    let store = ProgramStore::load(programs_path)?;
    let program = store.find(key)?;

    println!("\n{}  ({})", program.name, program.id);
    println!(
        "  {} exercises · ~{}",
        program.exercise_count(),
        format_time(estimate_duration(program))
    );

    for (i, phase) in program.phases.iter().enumerate() {
        println!();
        println!(
            "  {}. {} [{}] · {} cycle(s) · {}s between cycles",
            i + 1,
            phase.name,
            phase.kind,
            phase.cycles,
            phase.rest_between_cycles_seconds
        );
        for exercise in &phase.exercises {
            let amount = match exercise.kind {
                ExerciseKind::Timed => format_time(exercise.duration_seconds),
                ExerciseKind::Reps => format!("{} reps", exercise.reps),
            };
            println!(
                "     - {:<28} {:>8}  rest {}s",
                exercise.name, amount, exercise.rest_after_seconds
            );
        }
    }

    let steps = flatten(program);
    println!("\n  Timeline: {} steps", steps.len());
    for (i, step) in steps.iter().enumerate() {
        println!("    {:>3}  {}", i + 1, describe_step(step));
    }
    println!();
    Ok(())
}

fn cmd_play(
    data_dir: &Path,
    programs_path: &Path,
    key: &str,
    simulate: bool,
    config: &Config,
) -> Result<()> {
    let store = ProgramStore::load(programs_path)?;
    let program = store.find(key)?.clone();

    let steps = flatten(&program);
    if steps.is_empty() {
        return Err(Error::EmptyProgram(program.name));
    }
    let steps_total = steps.len();

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", program.name);
    println!("╰─────────────────────────────────────────╯");
    println!(
        "  {} steps · ~{}",
        steps_total,
        format_time(estimate_duration(&program))
    );
    if !simulate {
        println!("  Enter: reps done · p: pause/resume · s: skip · r: restart step · q: stop");
    }
    println!();

    let mut session = Session::new();
    let live = !simulate;
    session.subscribe(move |t: &Transition| render_transition(t, live));

    let announcements = if config.player.announcements {
        let (tx, rx) = mpsc::channel();
        session.subscribe(Announcer::new(tx));
        Some(rx)
    } else {
        None
    };

    let poll_interval = Duration::from_millis(config.player.poll_interval_ms);
    let started_at = Utc::now();

    let outcome = if simulate {
        let mut driver = ClockDriver::with_limits(
            ManualClock::new(),
            poll_interval,
            config.player.max_catch_up_ticks,
        );
        run_player(&mut driver, &mut session, steps, config, announcements, |s| {
            // Reps steps have no clock; complete them straight away
            if s.current_step().is_some_and(|step| !step.is_timed()) {
                s.mark_reps_done();
            }
            ControlFlow::Continue(())
        })
    } else {
        let commands = spawn_command_reader();
        let mut driver = ClockDriver::with_limits(
            SystemClock::new(),
            poll_interval,
            config.player.max_catch_up_ticks,
        );
        run_player(&mut driver, &mut session, steps, config, announcements, |s| {
            while let Ok(command) = commands.try_recv() {
                if apply_command(s, command).is_break() {
                    return ControlFlow::Break(());
                }
            }
            ControlFlow::Continue(())
        })
    };

    let completed = outcome.status == SessionStatus::Finished;
    if completed {
        println!(
            "\n✓ Workout finished! Total time {}",
            format_time(outcome.total_elapsed_seconds)
        );
    } else {
        println!(
            "\n■ Workout stopped after {}",
            format_time(outcome.total_elapsed_seconds)
        );
    }
    session.stop();

    if outcome.total_elapsed_seconds > 0 || completed {
        let record = WorkoutRecord {
            id: uuid::Uuid::new_v4(),
            program_id: program.id.clone(),
            program_name: program.name.clone(),
            started_at,
            finished_at: Utc::now(),
            total_elapsed_seconds: outcome.total_elapsed_seconds,
            steps_total,
            steps_reached: outcome.steps_reached,
            completed,
        };
        let mut sink = JsonlSink::new(DataConfig::history_path(data_dir));
        sink.append(&record)?;
    }

    Ok(())
}

/// What the player loop ended with, read before the session is reset
struct PlayOutcome {
    status: SessionStatus,
    total_elapsed_seconds: u32,
    steps_reached: usize,
}

fn run_player<T, F>(
    driver: &mut ClockDriver<T>,
    session: &mut Session,
    steps: Vec<WorkoutStep>,
    config: &Config,
    announcements: Option<Receiver<Announcement>>,
    mut between_polls: F,
) -> PlayOutcome
where
    T: TimeSource,
    F: FnMut(&mut Session) -> ControlFlow<()>,
{
    for n in (1..=config.player.countdown_seconds).rev() {
        println!("  Get ready... {}", n);
        driver.clock().sleep(Duration::from_secs(1));
    }

    session.start(steps);
    driver.arm();
    print_announcements(announcements.as_ref());

    driver.run(session, |s| {
        let flow = between_polls(s);
        print_announcements(announcements.as_ref());
        flow
    });
    print_announcements(announcements.as_ref());

    PlayOutcome {
        status: session.status(),
        total_elapsed_seconds: session.total_elapsed_seconds(),
        steps_reached: session.current_step_index() + 1,
    }
}

#[derive(Debug, Clone, Copy)]
enum PlayerCommand {
    Done,
    TogglePause,
    Skip,
    Restart,
    Quit,
}

fn parse_command(input: &str) -> Option<PlayerCommand> {
    match input.trim().to_lowercase().as_str() {
        "" | "d" => Some(PlayerCommand::Done),
        "p" => Some(PlayerCommand::TogglePause),
        "s" => Some(PlayerCommand::Skip),
        "r" => Some(PlayerCommand::Restart),
        "q" => Some(PlayerCommand::Quit),
        _ => None,
    }
}

/// Forward stdin lines as commands; the player loop drains them between polls
fn spawn_command_reader() -> Receiver<PlayerCommand> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                None => eprintln!("Unknown command: {:?}", line.trim()),
            }
        }
    });
    rx
}

fn apply_command(session: &mut Session, command: PlayerCommand) -> ControlFlow<()> {
    match command {
        PlayerCommand::Done => {
            if session.current_step().is_some_and(|step| !step.is_timed()) {
                session.mark_reps_done();
            } else {
                println!("  (timed step: use 's' to skip)");
            }
        }
        PlayerCommand::TogglePause => {
            if session.status() == SessionStatus::Paused {
                session.resume();
                println!("  ▶ Resumed");
            } else if session.pause() {
                println!("  ❚❚ Paused");
            }
        }
        PlayerCommand::Skip => {
            session.skip_step();
        }
        PlayerCommand::Restart => {
            session.restart_step();
        }
        PlayerCommand::Quit => return ControlFlow::Break(()),
    }
    ControlFlow::Continue(())
}

fn render_transition(transition: &Transition, live: bool) {
    let after = &transition.after;
    if transition.entered_step() {
        if let Some(step) = after.current_step.as_ref() {
            if live {
                println!();
            }
            println!(
                "[{}/{}] {} · cycle {}/{} · {}",
                after.current_step_index + 1,
                after.steps_len,
                step.phase_name,
                step.current_cycle,
                step.total_cycles,
                describe_step(step)
            );
        }
    } else if live && after.status == SessionStatus::Playing {
        let remaining = match after.current_step.as_ref() {
            Some(step) if step.is_timed() => format_time(after.seconds_remaining),
            _ => "--:--".to_string(),
        };
        print!(
            "\r  {} left · total {}   ",
            remaining,
            format_time(after.total_elapsed_seconds)
        );
        let _ = io::stdout().flush();
    }
}

fn print_announcements(announcements: Option<&Receiver<Announcement>>) {
    let Some(rx) = announcements else { return };
    for announcement in rx.try_iter() {
        match announcement {
            Announcement::ExerciseName(name) => println!("  » {}", name),
            Announcement::Go => println!("  » Go!"),
            Announcement::RestTone => println!("  » Rest"),
            Announcement::Countdown(n) => println!("  » {}", n),
            Announcement::Finished => println!("  » Done"),
        }
    }
}

fn describe_step(step: &WorkoutStep) -> String {
    let amount = match (step.duration_seconds, step.reps) {
        (Some(seconds), _) => format_time(seconds),
        (None, Some(reps)) => format!("{} reps", reps),
        (None, None) => String::new(),
    };
    if step.is_rest() {
        format!("{} ({})", step.label, amount)
    } else {
        format!("{} · {}", step.label, amount)
    }
}

fn cmd_history(data_dir: &Path, days: i64) -> Result<()> {
    let records = history::load_recent(&DataConfig::history_path(data_dir), days)?;

    if records.is_empty() {
        println!("No workouts in the last {} days.", days);
        return Ok(());
    }

    for record in records {
        println!(
            "  {}  {:<28} {:>6}  {}/{} steps{}",
            record.finished_at.format("%Y-%m-%d %H:%M"),
            record.program_name,
            format_time(record.total_elapsed_seconds),
            record.steps_reached,
            record.steps_total,
            if record.completed { "" } else { "  (stopped)" }
        );
    }
    Ok(())
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
