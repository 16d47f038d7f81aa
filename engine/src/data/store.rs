// Owns the application dataset: the imported roster plus the per-action
// justification inputs. Results are derived on demand and never stored.
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use shared::models::{ActionStatus, JustificationInput, TrainingAction};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DatasetStore {
    actions: Vec<TrainingAction>,
    inputs: HashMap<String, JustificationInput>,
}

impl DatasetStore {
    pub fn new() -> Self {
        DatasetStore::default()
    }

    /// Replaces the roster with a fresh import. Saved inputs survive; the
    /// returned count says how many of them still match an action.
    pub fn load_actions(&mut self, actions: Vec<TrainingAction>) -> usize {
        self.actions = actions;
        let preserved = self
            .actions
            .iter()
            .filter(|a| self.inputs.contains_key(&a.id))
            .count();
        tracing::info!(
            actions = self.actions.len(),
            preserved_inputs = preserved,
            "Roster loaded into dataset"
        );
        preserved
    }

    /// Restores a backup: replaces the roster and merges the recovered
    /// inputs over any existing ones.
    pub fn restore(
        &mut self,
        actions: Vec<TrainingAction>,
        inputs: HashMap<String, JustificationInput>,
    ) {
        self.actions = actions;
        self.inputs.extend(inputs);
        tracing::info!(
            actions = self.actions.len(),
            inputs = self.inputs.len(),
            "Backup restored into dataset"
        );
    }

    /// Saves a justification input, fully replacing any previous one for the
    /// same action. A non-executable action always stores zero finished
    /// students.
    pub fn save_input(&mut self, mut input: JustificationInput) {
        if input.status == ActionStatus::NotExecutable {
            input.finished_students = 0;
        }
        self.inputs.insert(input.action_id.clone(), input);
    }

    pub fn actions(&self) -> &[TrainingAction] {
        &self.actions
    }

    pub fn inputs(&self) -> &HashMap<String, JustificationInput> {
        &self.inputs
    }

    pub fn action(&self, id: &str) -> Option<&TrainingAction> {
        self.actions.iter().find(|a| a.id == id)
    }

    pub fn input(&self, id: &str) -> Option<&JustificationInput> {
        self.inputs.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Full dataset reset: the only way actions are destroyed.
    pub fn reset(&mut self) {
        self.actions.clear();
        self.inputs.clear();
    }

    /// Loads the dataset file; a missing file is just a first run.
    pub fn load_from(path: &Path) -> Result<Self, EngineError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No dataset file yet, starting empty");
            return Ok(DatasetStore::new());
        }
        let reader = BufReader::new(File::open(path)?);
        let store: DatasetStore = serde_json::from_reader(reader)?;
        tracing::info!(
            path = %path.display(),
            actions = store.actions.len(),
            inputs = store.inputs.len(),
            "Dataset loaded"
        );
        Ok(store)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), EngineError> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        tracing::info!(path = %path.display(), "Dataset saved");
        Ok(())
    }
}
