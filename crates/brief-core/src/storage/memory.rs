use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use crate::error::{BriefError, Result};
use crate::storage::traits::BriefingStore;
use crate::types::{BriefingPatch, BriefingState, Project, ProjectId, StoredTurn};

#[derive(Default)]
struct Inner {
    projects: HashMap<ProjectId, Project>,
    briefings: HashMap<ProjectId, BriefingState>,
    turns: HashMap<ProjectId, Vec<StoredTurn>>,
}

/// Process-local store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Inner {
    fn touch(&mut self, id: ProjectId) -> Result<()> {
        let project = self
            .projects
            .get_mut(&id)
            .ok_or(BriefError::ProjectNotFound(id))?;
        project.updated_at = Utc::now();
        Ok(())
    }
}

impl BriefingStore for MemoryStore {
    fn create_project(&self, project: &Project) -> Result<()> {
        let mut inner = self.write();
        if inner.projects.contains_key(&project.id) {
            return Err(BriefError::Validation(format!(
                "Project {} already exists",
                project.id
            )));
        }
        inner.projects.insert(project.id, project.clone());
        inner.briefings.insert(project.id, BriefingState::default());
        Ok(())
    }

    fn get_project(&self, id: ProjectId) -> Result<Option<Project>> {
        Ok(self.read().projects.get(&id).cloned())
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        let mut projects: Vec<Project> = self.read().projects.values().cloned().collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    fn delete_project(&self, id: ProjectId) -> Result<()> {
        let mut inner = self.write();
        inner
            .projects
            .remove(&id)
            .ok_or(BriefError::ProjectNotFound(id))?;
        inner.briefings.remove(&id);
        inner.turns.remove(&id);
        Ok(())
    }

    fn load(&self, id: ProjectId) -> Result<Option<BriefingState>> {
        Ok(self.read().briefings.get(&id).cloned())
    }

    fn save(&self, id: ProjectId, state: &BriefingState) -> Result<()> {
        let mut inner = self.write();
        inner.touch(id)?;
        inner.briefings.insert(id, state.clone());
        Ok(())
    }

    fn patch(&self, id: ProjectId, patch: BriefingPatch) -> Result<BriefingState> {
        let mut inner = self.write();
        inner.touch(id)?;
        let current = inner.briefings.remove(&id).unwrap_or_default();
        let patched = patch.apply(current);
        inner.briefings.insert(id, patched.clone());
        Ok(patched)
    }

    fn append_turn(&self, turn: &StoredTurn) -> Result<()> {
        let mut inner = self.write();
        if !inner.projects.contains_key(&turn.project_id) {
            return Err(BriefError::ProjectNotFound(turn.project_id));
        }
        inner
            .turns
            .entry(turn.project_id)
            .or_default()
            .push(turn.clone());
        Ok(())
    }

    fn recent_turns(&self, id: ProjectId, limit: usize) -> Result<Vec<StoredTurn>> {
        let inner = self.read();
        let turns = inner.turns.get(&id).map(Vec::as_slice).unwrap_or_default();
        Ok(turns[turns.len().saturating_sub(limit)..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConversationTurn;

    #[test]
    fn test_memory_store_lifecycle() {
        let store = MemoryStore::new();
        let project = Project::new("Bloom", None);
        store.create_project(&project).unwrap();
        assert_eq!(store.load(project.id).unwrap(), Some(BriefingState::default()));

        let state = BriefingState {
            utp: Some("Same-day flower delivery".into()),
            ..Default::default()
        }
        .refreshed();
        store.save(project.id, &state).unwrap();
        assert_eq!(store.load(project.id).unwrap(), Some(state));

        for i in 0..4 {
            store
                .append_turn(&StoredTurn::new(project.id, ConversationTurn::user(i.to_string())))
                .unwrap();
        }
        let recent: Vec<String> = store
            .recent_turns(project.id, 2)
            .unwrap()
            .into_iter()
            .map(|t| t.content)
            .collect();
        assert_eq!(recent, vec!["2", "3"]);

        store.delete_project(project.id).unwrap();
        assert!(store.load(project.id).unwrap().is_none());
        assert!(store.recent_turns(project.id, 10).unwrap().is_empty());
    }

    #[test]
    fn test_memory_store_unknown_project() {
        let store = MemoryStore::new();
        let id = uuid::Uuid::now_v7();
        assert!(matches!(
            store.save(id, &BriefingState::default()),
            Err(BriefError::ProjectNotFound(_))
        ));
        assert!(matches!(
            store.patch(id, BriefingPatch::default()),
            Err(BriefError::ProjectNotFound(_))
        ));
        assert!(store.load(id).unwrap().is_none());
    }
}
