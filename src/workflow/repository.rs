//! Typed access to stored runs.

use std::sync::Arc;

use super::error::{WorkflowError, WorkflowResult};
use super::run::WorkflowRun;
use crate::core::{SnapshotStore, StoreError};

/// [`WorkflowRun`] snapshots on top of a [`SnapshotStore`].
///
/// Usable without an executor, so stored runs can be listed, shown and
/// exported offline.
#[derive(Clone)]
pub struct RunRepository {
    store: Arc<dyn SnapshotStore>,
}

impl RunRepository {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store }
    }

    /// Persist the current state of `run` under its id.
    pub fn save(&self, run: &WorkflowRun) -> WorkflowResult<()> {
        let snapshot = serde_json::to_value(run).map_err(StoreError::from)?;
        self.store.put(&run.id, &snapshot)?;
        Ok(())
    }

    /// Load and validate a stored run.
    pub fn load(&self, run_id: &str) -> WorkflowResult<WorkflowRun> {
        let snapshot = self
            .store
            .get(run_id)?
            .ok_or_else(|| WorkflowError::RunNotFound(run_id.to_string()))?;

        let run: WorkflowRun =
            serde_json::from_value(snapshot).map_err(|e| WorkflowError::InvalidSnapshot {
                id: run_id.to_string(),
                reason: e.to_string(),
            })?;

        run.validate()
            .map_err(|reason| WorkflowError::InvalidSnapshot { id: run_id.to_string(), reason })?;

        Ok(run)
    }

    /// Every readable stored run, newest first. Unreadable snapshots are skipped.
    pub fn list(&self) -> WorkflowResult<Vec<WorkflowRun>> {
        let mut runs = Vec::new();

        for key in self.store.keys()? {
            match self.load(&key) {
                Ok(run) => runs.push(run),
                Err(e) => tracing::warn!(run_id = %key, error = %e, "Skipping unreadable run"),
            }
        }

        runs.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(runs)
    }

    /// Remove a stored run.
    pub fn delete(&self, run_id: &str) -> WorkflowResult<()> {
        if self.store.remove(run_id)? {
            tracing::info!(run_id, "Run deleted");
            Ok(())
        } else {
            Err(WorkflowError::RunNotFound(run_id.to_string()))
        }
    }
}

impl std::fmt::Debug for RunRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunRepository").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;
    use crate::agents::BlogInputs;
    use crate::core::MemoryStore;

    fn repository() -> (RunRepository, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (RunRepository::new(store.clone()), store)
    }

    #[test]
    fn test_save_and_load() {
        let (runs, store) = repository();
        let run = WorkflowRun::new(BlogInputs::new("T", "a", "c"));

        runs.save(&run).unwrap();
        assert_eq!(store.write_count(), 1);
        assert_eq!(runs.load(&run.id).unwrap(), run);
    }

    #[test]
    fn test_missing_and_malformed_runs() {
        let (runs, store) = repository();
        assert!(matches!(runs.load("nope"), Err(WorkflowError::RunNotFound(_))));

        store.put("broken", &json!({ "id": "broken" })).unwrap();
        assert!(matches!(runs.load("broken"), Err(WorkflowError::InvalidSnapshot { .. })));
    }

    #[test]
    fn test_list_newest_first_skipping_broken() {
        let (runs, store) = repository();
        let older = WorkflowRun::new(BlogInputs::new("Older", "a", "c"));
        let mut newer = WorkflowRun::new(BlogInputs::new("Newer", "a", "c"));
        newer.start_time = older.start_time + Duration::seconds(5);

        runs.save(&older).unwrap();
        runs.save(&newer).unwrap();
        store.put("broken", &json!([])).unwrap();

        let titles: Vec<String> =
            runs.list().unwrap().into_iter().map(|r| r.inputs.title).collect();
        assert_eq!(titles, vec!["Newer", "Older"]);
    }

    #[test]
    fn test_delete() {
        let (runs, _) = repository();
        let run = WorkflowRun::new(BlogInputs::new("T", "a", "c"));
        runs.save(&run).unwrap();

        runs.delete(&run.id).unwrap();
        assert!(matches!(runs.delete(&run.id), Err(WorkflowError::RunNotFound(_))));
    }
}
