use crate::error::Result;
use crate::types::{BriefingPatch, BriefingState, Project, ProjectId, StoredTurn};

/// Persistence for projects, their briefings and their conversations.
pub trait BriefingStore: Send + Sync {
    // === Projects ===

    /// Insert a project together with its empty briefing.
    fn create_project(&self, project: &Project) -> Result<()>;

    fn get_project(&self, id: ProjectId) -> Result<Option<Project>>;

    /// All projects, newest first.
    fn list_projects(&self) -> Result<Vec<Project>>;

    /// Remove a project, its briefing and its conversation.
    fn delete_project(&self, id: ProjectId) -> Result<()>;

    // === Briefing ===

    /// The project's briefing, or `None` if the project does not exist.
    fn load(&self, id: ProjectId) -> Result<Option<BriefingState>>;

    /// Replace the briefing as a whole. Either the complete state is stored
    /// or nothing is.
    fn save(&self, id: ProjectId, state: &BriefingState) -> Result<()>;

    /// Overwrite only the keys present in `patch`, re-derive score and
    /// summary, and return the stored result.
    fn patch(&self, id: ProjectId, patch: BriefingPatch) -> Result<BriefingState>;

    // === Conversation ===

    fn append_turn(&self, turn: &StoredTurn) -> Result<()>;

    /// The last `limit` turns of a project, oldest first.
    fn recent_turns(&self, id: ProjectId, limit: usize) -> Result<Vec<StoredTurn>>;
}
