//! Program store with file locking.
//!
//! Holds the user's programs and applies authoring edits. Persistence uses
//! a shared lock for reads and an atomic temp-file replace for writes, so
//! concurrent `coach` processes never observe a half-written file.

use crate::{defaults, new_id, Error, Exercise, Phase, Program, Result};
use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Collection of authored programs, in creation order
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProgramStore {
    #[serde(default)]
    programs: Vec<Program>,
}

impl ProgramStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Persistence ──────────────────────────────────────────────────

    /// Load the store from a file with shared locking
    ///
    /// Returns an empty store if the file doesn't exist.
    /// If the file is corrupted, logs a warning and returns an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No program file found at {:?}, starting empty", path);
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open program file {:?}: {}. Starting empty.", path, e);
                return Ok(Self::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock program file {:?}: {}. Starting empty.", path, e);
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!("Failed to read program file {:?}: {}. Starting empty.", path, e);
            return Ok(Self::default());
        }

        file.unlock()?;

        match serde_json::from_str::<ProgramStore>(&contents) {
            Ok(store) => {
                tracing::debug!("Loaded {} programs from {:?}", store.programs.len(), path);
                Ok(store)
            }
            Err(e) => {
                tracing::warn!("Failed to parse program file {:?}: {}. Starting empty.", path, e);
                Ok(Self::default())
            }
        }
    }

    /// Save the store atomically: temp file, fsync, rename over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Other(format!("Program path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved {} programs to {:?}", self.programs.len(), path);
        Ok(())
    }

    /// Load, modify and save back in one call
    pub fn update<F, T>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce(&mut ProgramStore) -> Result<T>,
    {
        let mut store = Self::load(path)?;
        let out = f(&mut store)?;
        store.save(path)?;
        Ok(out)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    pub fn get(&self, id: &str) -> Option<&Program> {
        self.programs.iter().find(|p| p.id == id)
    }

    /// Resolve a program by exact id, unique id prefix, or exact name
    pub fn find(&self, key: &str) -> Result<&Program> {
        if let Some(program) = self.get(key) {
            return Ok(program);
        }
        let matches: Vec<_> = self
            .programs
            .iter()
            .filter(|p| p.id.starts_with(key) || p.name == key)
            .collect();
        match matches.as_slice() {
            [program] => Ok(*program),
            [] => Err(Error::NotFound(format!("program '{}'", key))),
            _ => Err(Error::Other(format!(
                "'{}' matches {} programs, use a longer id",
                key,
                matches.len()
            ))),
        }
    }

    // ── Program edits ────────────────────────────────────────────────

    /// Create an empty program, returning its id
    pub fn add_program(&mut self, name: Option<&str>) -> String {
        let program = Program::new(name.unwrap_or(defaults::DEFAULT_PROGRAM_NAME));
        let id = program.id.clone();
        tracing::info!("Created program '{}' ({})", program.name, id);
        self.programs.push(program);
        id
    }

    /// Create a program populated with the default four-phase template
    pub fn add_program_from_template(&mut self, name: Option<&str>) -> String {
        let program = defaults::default_program(name.unwrap_or(defaults::DEFAULT_PROGRAM_NAME));
        let id = program.id.clone();
        tracing::info!("Created program '{}' ({}) from template", program.name, id);
        self.programs.push(program);
        id
    }

    pub fn rename_program(&mut self, id: &str, name: &str) -> Result<()> {
        let program = self.program_mut(id)?;
        program.name = name.to_string();
        program.touch();
        Ok(())
    }

    pub fn delete_program(&mut self, id: &str) -> Result<Program> {
        let idx = self
            .programs
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(format!("program '{}'", id)))?;
        let removed = self.programs.remove(idx);
        tracing::info!("Deleted program '{}' ({})", removed.name, removed.id);
        Ok(removed)
    }

    /// Deep copy with fresh ids for the program and everything in it
    ///
    /// Returns the new id, or `None` when `id` is unknown.
    pub fn duplicate_program(&mut self, id: &str) -> Option<String> {
        let source = self.get(id)?;
        let now = Utc::now();

        let mut copy = source.clone();
        copy.id = new_id();
        copy.name = format!("{} (copy)", source.name);
        copy.created_at = now;
        copy.updated_at = now;
        for phase in &mut copy.phases {
            phase.id = new_id();
            for exercise in &mut phase.exercises {
                exercise.id = new_id();
            }
        }

        let copy_id = copy.id.clone();
        tracing::info!("Duplicated program {} into {}", id, copy_id);
        self.programs.push(copy);
        Some(copy_id)
    }

    // ── Phase edits ──────────────────────────────────────────────────

    pub fn add_phase(&mut self, program_id: &str, phase: Phase) -> Result<()> {
        let program = self.program_mut(program_id)?;
        program.phases.push(phase);
        program.touch();
        Ok(())
    }

    pub fn update_phase<F>(&mut self, program_id: &str, phase_id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Phase),
    {
        let program = self.program_mut(program_id)?;
        let phase = program
            .phases
            .iter_mut()
            .find(|ph| ph.id == phase_id)
            .ok_or_else(|| Error::NotFound(format!("phase '{}'", phase_id)))?;
        f(phase);
        program.touch();
        Ok(())
    }

    pub fn remove_phase(&mut self, program_id: &str, phase_id: &str) -> Result<()> {
        let program = self.program_mut(program_id)?;
        let before = program.phases.len();
        program.phases.retain(|ph| ph.id != phase_id);
        if program.phases.len() == before {
            return Err(Error::NotFound(format!("phase '{}'", phase_id)));
        }
        program.touch();
        Ok(())
    }

    pub fn move_phase(&mut self, program_id: &str, from: usize, to: usize) -> Result<()> {
        let program = self.program_mut(program_id)?;
        move_item(&mut program.phases, from, to)?;
        program.touch();
        Ok(())
    }

    // ── Exercise edits ───────────────────────────────────────────────

    pub fn add_exercise(&mut self, program_id: &str, phase_id: &str, exercise: Exercise) -> Result<()> {
        self.update_phase(program_id, phase_id, |phase| phase.exercises.push(exercise))
    }

    pub fn update_exercise<F>(
        &mut self,
        program_id: &str,
        phase_id: &str,
        exercise_id: &str,
        f: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut Exercise),
    {
        let program = self.program_mut(program_id)?;
        let exercise = phase_mut(program, phase_id)?
            .exercises
            .iter_mut()
            .find(|ex| ex.id == exercise_id)
            .ok_or_else(|| Error::NotFound(format!("exercise '{}'", exercise_id)))?;
        f(exercise);
        program.touch();
        Ok(())
    }

    pub fn remove_exercise(&mut self, program_id: &str, phase_id: &str, exercise_id: &str) -> Result<()> {
        let program = self.program_mut(program_id)?;
        let phase = phase_mut(program, phase_id)?;
        let before = phase.exercises.len();
        phase.exercises.retain(|ex| ex.id != exercise_id);
        if phase.exercises.len() == before {
            return Err(Error::NotFound(format!("exercise '{}'", exercise_id)));
        }
        program.touch();
        Ok(())
    }

    pub fn move_exercise(&mut self, program_id: &str, phase_id: &str, from: usize, to: usize) -> Result<()> {
        let program = self.program_mut(program_id)?;
        move_item(&mut phase_mut(program, phase_id)?.exercises, from, to)?;
        program.touch();
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn program_mut(&mut self, id: &str) -> Result<&mut Program> {
        self.programs
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(format!("program '{}'", id)))
    }
}

fn phase_mut<'a>(program: &'a mut Program, phase_id: &str) -> Result<&'a mut Phase> {
    program
        .phases
        .iter_mut()
        .find(|ph| ph.id == phase_id)
        .ok_or_else(|| Error::NotFound(format!("phase '{}'", phase_id)))
}

/// Remove the item at `from` and reinsert it at `to`
fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<()> {
    let len = items.len();
    if from >= len || to >= len {
        return Err(Error::InvalidMove { from, to, len });
    }
    let item = items.remove(from);
    items.insert(to, item);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PhaseKind;

    fn store_with_template() -> (ProgramStore, String) {
        let mut store = ProgramStore::new();
        let id = store.add_program_from_template(Some("Full body"));
        (store, id)
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("programs.json");

        let (mut store, first) = store_with_template();
        let second = store.add_program(None);
        store.save(&path).unwrap();

        let loaded = ProgramStore::load(&path).unwrap();
        let ids: Vec<_> = loaded.programs().iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec![first.clone(), second]);
        assert_eq!(loaded.get(&first), store.get(&first));
    }

    #[test]
    fn test_load_nonexistent_returns_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ProgramStore::load(&temp_dir.path().join("missing.json")).unwrap();
        assert!(store.programs().is_empty());
    }

    #[test]
    fn test_corrupted_file_returns_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("programs.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = ProgramStore::load(&path).unwrap();
        assert!(store.programs().is_empty());
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("programs.json");

        store_with_template().0.save(&path).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "programs.json")
            .collect();
        assert!(extras.is_empty(), "unexpected files: {:?}", extras);
    }

    #[test]
    fn test_update_pattern() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("programs.json");

        let id = ProgramStore::update(&path, |store| Ok(store.add_program(Some("Legs")))).unwrap();

        let loaded = ProgramStore::load(&path).unwrap();
        assert_eq!(loaded.get(&id).map(|p| p.name.as_str()), Some("Legs"));
    }

    #[test]
    fn test_add_program_defaults() {
        let mut store = ProgramStore::new();
        let id = store.add_program(None);

        let program = store.get(&id).unwrap();
        assert_eq!(program.name, defaults::DEFAULT_PROGRAM_NAME);
        assert!(program.phases.is_empty());
        assert_eq!(program.created_at, program.updated_at);
    }

    #[test]
    fn test_duplicate_regenerates_every_id() {
        let (mut store, id) = store_with_template();

        let copy_id = store.duplicate_program(&id).unwrap();
        let original = store.get(&id).unwrap();
        let copy = store.get(&copy_id).unwrap();

        assert_ne!(copy.id, original.id);
        assert_eq!(copy.name, "Full body (copy)");
        assert_eq!(copy.phases.len(), original.phases.len());
        for (a, b) in original.phases.iter().zip(&copy.phases) {
            assert_ne!(a.id, b.id);
            assert_eq!(a.name, b.name);
            for (x, y) in a.exercises.iter().zip(&b.exercises) {
                assert_ne!(x.id, y.id);
                assert_eq!(x.name, y.name);
                assert_eq!(x.duration_seconds, y.duration_seconds);
            }
        }

        assert!(store.duplicate_program("nope").is_none());
    }

    #[test]
    fn test_delete_program() {
        let (mut store, id) = store_with_template();

        let removed = store.delete_program(&id).unwrap();
        assert_eq!(removed.id, id);
        assert!(store.programs().is_empty());
        assert!(matches!(store.delete_program(&id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_phase_edits_touch_program() {
        let mut store = ProgramStore::new();
        let id = store.add_program(Some("Edits"));
        let created = store.get(&id).unwrap().updated_at;

        let phase = Phase::new(PhaseKind::Core);
        let phase_id = phase.id.clone();
        store.add_phase(&id, phase).unwrap();
        store
            .update_phase(&id, &phase_id, |ph| {
                ph.cycles = 2;
                ph.rest_between_cycles_seconds = 45;
            })
            .unwrap();

        let program = store.get(&id).unwrap();
        assert!(program.updated_at >= created);
        assert_eq!(program.phases[0].cycles, 2);

        store.remove_phase(&id, &phase_id).unwrap();
        assert!(store.get(&id).unwrap().phases.is_empty());
        assert!(matches!(
            store.remove_phase(&id, &phase_id),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_move_phase() {
        let (mut store, id) = store_with_template();

        store.move_phase(&id, 0, 3).unwrap();

        let kinds: Vec<_> = store.get(&id).unwrap().phases.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PhaseKind::Main,
                PhaseKind::Core,
                PhaseKind::Cooldown,
                PhaseKind::Warmup
            ]
        );
        assert!(matches!(
            store.move_phase(&id, 0, 4),
            Err(Error::InvalidMove { len: 4, .. })
        ));
    }

    #[test]
    fn test_exercise_edits() {
        let (mut store, id) = store_with_template();
        let phase_id = store.get(&id).unwrap().phases[3].id.clone();

        let exercise = defaults::default_exercise("Hamstring stretch", true);
        let exercise_id = exercise.id.clone();
        store.add_exercise(&id, &phase_id, exercise).unwrap();
        store
            .update_exercise(&id, &phase_id, &exercise_id, |ex| ex.duration_seconds = 45)
            .unwrap();
        store.move_exercise(&id, &phase_id, 2, 0).unwrap();

        let phase = &store.get(&id).unwrap().phases[3];
        assert_eq!(phase.exercises[0].id, exercise_id);
        assert_eq!(phase.exercises[0].duration_seconds, 45);
        assert_eq!(phase.exercises.len(), 3);

        store.remove_exercise(&id, &phase_id, &exercise_id).unwrap();
        assert_eq!(store.get(&id).unwrap().phases[3].exercises.len(), 2);
        assert!(matches!(
            store.update_exercise(&id, &phase_id, &exercise_id, |_| {}),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_find_by_prefix_or_name() {
        let (mut store, id) = store_with_template();
        store.add_program(Some("Legs"));

        assert_eq!(store.find(&id[..8]).unwrap().id, id);
        assert_eq!(store.find("Legs").unwrap().name, "Legs");
        assert!(matches!(store.find("zzz"), Err(Error::NotFound(_))));
    }
}
