//! Workout history.
//!
//! Each played session ends as one `WorkoutRecord` line in `history.jsonl`.
//! The file is only ever appended to, under an exclusive `fs2` lock, so two
//! `coach play` processes finishing together both land intact. Readers take
//! a shared lock and drop lines they cannot decode: a crash mid-append leaves
//! at worst one truncated trailing line, which costs that one workout only.

use crate::{Error, Result, WorkoutRecord};
use chrono::{TimeDelta, Utc};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Destination for finished or stopped workouts
pub trait WorkoutSink {
    fn append(&mut self, record: &WorkoutRecord) -> Result<()>;
}

/// Append-only JSON Lines history file
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl WorkoutSink for JsonlSink {
    fn append(&mut self, record: &WorkoutRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;

        // One write per record keeps the line whole under O_APPEND
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let written = (&file).write_all(line.as_bytes());
        file.unlock()?;
        written?;

        tracing::debug!(
            "Logged workout '{}' ({}s, {}/{} steps)",
            record.program_name,
            record.total_elapsed_seconds,
            record.steps_reached,
            record.steps_total
        );
        Ok(())
    }
}

/// Every workout in the history file, oldest first
///
/// Lines that are not valid UTF-8 or not a `WorkoutRecord` are skipped with
/// a warning. A missing file is an empty history.
pub fn read_records(path: &Path) -> Result<Vec<WorkoutRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let mut records = Vec::new();
    for (line_num, line) in BufReader::new(&file).lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                tracing::warn!("Skipping undecodable history line {}: {}", line_num + 1, e);
                continue;
            }
            Err(e) => {
                let _ = file.unlock();
                return Err(e.into());
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<WorkoutRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!("Skipping malformed history line {}: {}", line_num + 1, e),
        }
    }

    file.unlock()?;
    Ok(records)
}

/// Workouts finished within the last `days` days, newest first
pub fn load_recent(path: &Path, days: i64) -> Result<Vec<WorkoutRecord>> {
    let cutoff = TimeDelta::try_days(days)
        .and_then(|window| Utc::now().checked_sub_signed(window))
        .ok_or_else(|| Error::Other(format!("history window of {} days is out of range", days)))?;

    let mut records: Vec<_> = read_records(path)?
        .into_iter()
        .filter(|r| r.finished_at >= cutoff)
        .collect();
    records.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn create_test_record(days_ago: i64) -> WorkoutRecord {
        let finished_at = Utc::now() - Duration::days(days_ago);
        WorkoutRecord {
            id: Uuid::new_v4(),
            program_id: "program".into(),
            program_name: "Full body".into(),
            started_at: finished_at - Duration::minutes(30),
            finished_at,
            total_elapsed_seconds: 1800,
            steps_total: 38,
            steps_reached: 38,
            completed: true,
        }
    }

    #[test]
    fn test_append_and_read_single_record() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("history.jsonl");

        let record = create_test_record(0);
        let record_id = record.id;

        let mut sink = JsonlSink::new(&path);
        sink.append(&record).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, record_id);
    }

    #[test]
    fn test_read_missing_history() {
        let temp_dir = tempfile::tempdir().unwrap();
        let records = read_records(&temp_dir.path().join("nonexistent.jsonl")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("history.jsonl");

        let mut sink = JsonlSink::new(&path);
        sink.append(&create_test_record(0)).unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, "{{ truncated").unwrap();
        }
        sink.append(&create_test_record(0)).unwrap();

        assert_eq!(read_records(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("history.jsonl");

        let mut sink = JsonlSink::new(&path);
        sink.append(&create_test_record(0)).unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&[0xff, 0xfe, 0xfd, b'\n']).unwrap();
        }
        sink.append(&create_test_record(1)).unwrap();

        assert_eq!(read_records(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_load_recent_filters_and_sorts() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("history.jsonl");

        let mut sink = JsonlSink::new(&path);
        for days_ago in [3, 30, 1] {
            sink.append(&create_test_record(days_ago)).unwrap();
        }

        let recent = load_recent(&path, 7).unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].finished_at > recent[1].finished_at);
    }

    #[test]
    fn test_load_recent_rejects_unrepresentable_window() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("history.jsonl");

        assert!(matches!(load_recent(&path, i64::MAX), Err(Error::Other(_))));
    }
}
