use crate::error::{BriefError, Result};
use crate::storage::traits::BriefingStore;
use crate::types::{BriefingPatch, BriefingState, Project, ProjectId, StoredTurn};
use chrono::Utc;
use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Table definitions
const PROJECTS: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new("projects");
const BRIEFINGS: TableDefinition<&[u8; 16], &[u8]> = TableDefinition::new("briefings");

// Conversation turns keyed by project id followed by a big-endian sequence
// number, so one project's turns are a contiguous, ordered range.
const TURNS: TableDefinition<&[u8; 24], &[u8]> = TableDefinition::new("turns");

// Metadata table
const META: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;
const SCHEMA_VERSION_KEY: &str = "schema_version";

type TurnKey = [u8; 24];

/// Redb-based store
pub struct RedbStore {
    db: Arc<Database>,
    path: PathBuf,
}

impl RedbStore {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                BriefError::Validation(format!("Failed to create directory: {}", e))
            })?;
        }

        let is_new = !path.exists();
        let db = Database::create(&path)?;

        if !is_new {
            Self::check_schema_version(&db)?;
        }

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PROJECTS)?;
            let _ = write_txn.open_table(BRIEFINGS)?;
            let _ = write_txn.open_table(TURNS)?;
            let mut meta = write_txn.open_table(META)?;
            if is_new {
                meta.insert(SCHEMA_VERSION_KEY, CURRENT_SCHEMA_VERSION.to_string().as_bytes())?;
            }
        }
        write_txn.commit()?;

        log::debug!("opened briefing store at {}", path.display());
        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    /// Check schema version. Returns error if the file was written by a
    /// different layout.
    fn check_schema_version(db: &Database) -> Result<()> {
        let read_txn = db.begin_read()?;
        let version = {
            let table = read_txn.open_table(META).ok();
            table
                .and_then(|t| {
                    t.get(SCHEMA_VERSION_KEY).ok().flatten().and_then(|v| {
                        std::str::from_utf8(v.value())
                            .ok()
                            .and_then(|s| s.parse::<u32>().ok())
                    })
                })
                .unwrap_or(CURRENT_SCHEMA_VERSION)
        };

        match version.cmp(&CURRENT_SCHEMA_VERSION) {
            std::cmp::Ordering::Equal => Ok(()),
            std::cmp::Ordering::Less => Err(BriefError::Validation(format!(
                "Database schema v{} is older than current v{}.",
                version, CURRENT_SCHEMA_VERSION
            ))),
            std::cmp::Ordering::Greater => Err(BriefError::Validation(format!(
                "Database schema v{} is newer than this binary v{}. Upgrade brief.",
                version, CURRENT_SCHEMA_VERSION
            ))),
        }
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn uuid_to_bytes(id: &uuid::Uuid) -> [u8; 16] {
        *id.as_bytes()
    }

    fn turn_key(project: &ProjectId, seq: u64) -> TurnKey {
        let mut key = [0u8; 24];
        key[..16].copy_from_slice(project.as_bytes());
        key[16..].copy_from_slice(&seq.to_be_bytes());
        key
    }

    fn turn_seq(key: &TurnKey) -> u64 {
        let mut seq = [0u8; 8];
        seq.copy_from_slice(&key[16..]);
        u64::from_be_bytes(seq)
    }

    /// Inclusive key bounds covering every turn of `project`.
    fn turn_bounds(project: &ProjectId) -> (TurnKey, TurnKey) {
        (Self::turn_key(project, 0), Self::turn_key(project, u64::MAX))
    }

    fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        bincode::serialize(value).map_err(BriefError::from)
    }

    fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).map_err(BriefError::from)
    }

    /// Bump `updated_at` on the project row inside `txn`.
    fn touch_project(txn: &WriteTransaction, id: ProjectId) -> Result<()> {
        let key = Self::uuid_to_bytes(&id);
        let mut projects = txn.open_table(PROJECTS)?;
        let existing = projects.get(&key)?.map(|guard| guard.value().to_vec());
        let mut project: Project = match existing {
            Some(bytes) => Self::decode(&bytes)?,
            None => return Err(BriefError::ProjectNotFound(id)),
        };
        project.updated_at = Utc::now();
        projects.insert(&key, Self::encode(&project)?.as_slice())?;
        Ok(())
    }
}

impl BriefingStore for RedbStore {
    fn create_project(&self, project: &Project) -> Result<()> {
        let key = Self::uuid_to_bytes(&project.id);
        let project_bytes = Self::encode(project)?;
        let briefing_bytes = Self::encode(&BriefingState::default())?;

        let write_txn = self.db.begin_write()?;
        {
            let mut projects = write_txn.open_table(PROJECTS)?;
            if projects.get(&key)?.is_some() {
                return Err(BriefError::Validation(format!(
                    "Project {} already exists",
                    project.id
                )));
            }
            projects.insert(&key, project_bytes.as_slice())?;

            let mut briefings = write_txn.open_table(BRIEFINGS)?;
            briefings.insert(&key, briefing_bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_project(&self, id: ProjectId) -> Result<Option<Project>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROJECTS)?;

        if let Some(bytes) = table.get(&Self::uuid_to_bytes(&id))? {
            Ok(Some(Self::decode(bytes.value())?))
        } else {
            Ok(None)
        }
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROJECTS)?;

        let mut projects = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            projects.push(Self::decode::<Project>(value.value())?);
        }

        // Newest first
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    fn delete_project(&self, id: ProjectId) -> Result<()> {
        let key = Self::uuid_to_bytes(&id);
        let (lo, hi) = Self::turn_bounds(&id);

        let write_txn = self.db.begin_write()?;
        {
            let mut projects = write_txn.open_table(PROJECTS)?;
            if projects.remove(&key)?.is_none() {
                return Err(BriefError::ProjectNotFound(id));
            }

            let mut briefings = write_txn.open_table(BRIEFINGS)?;
            briefings.remove(&key)?;

            let mut turns = write_txn.open_table(TURNS)?;
            let keys: Vec<TurnKey> = turns
                .range::<&TurnKey>(&lo..=&hi)?
                .map(|entry| entry.map(|(k, _)| *k.value()))
                .collect::<std::result::Result<_, _>>()?;
            for turn_key in &keys {
                turns.remove(turn_key)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn load(&self, id: ProjectId) -> Result<Option<BriefingState>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BRIEFINGS)?;

        if let Some(bytes) = table.get(&Self::uuid_to_bytes(&id))? {
            Ok(Some(Self::decode(bytes.value())?))
        } else {
            Ok(None)
        }
    }

    fn save(&self, id: ProjectId, state: &BriefingState) -> Result<()> {
        let key = Self::uuid_to_bytes(&id);
        let bytes = Self::encode(state)?;

        // Single write transaction: the project check, the timestamp and the
        // briefing commit together or not at all.
        let write_txn = self.db.begin_write()?;
        Self::touch_project(&write_txn, id)?;
        {
            let mut briefings = write_txn.open_table(BRIEFINGS)?;
            briefings.insert(&key, bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn patch(&self, id: ProjectId, patch: BriefingPatch) -> Result<BriefingState> {
        let key = Self::uuid_to_bytes(&id);

        let write_txn = self.db.begin_write()?;
        Self::touch_project(&write_txn, id)?;
        let patched = {
            let mut briefings = write_txn.open_table(BRIEFINGS)?;
            let existing = briefings.get(&key)?.map(|guard| guard.value().to_vec());
            let current: BriefingState = match existing {
                Some(bytes) => Self::decode(&bytes)?,
                None => BriefingState::default(),
            };
            let patched = patch.apply(current);
            briefings.insert(&key, Self::encode(&patched)?.as_slice())?;
            patched
        };
        write_txn.commit()?;
        Ok(patched)
    }

    fn append_turn(&self, turn: &StoredTurn) -> Result<()> {
        let project_key = Self::uuid_to_bytes(&turn.project_id);
        let (lo, hi) = Self::turn_bounds(&turn.project_id);
        let bytes = Self::encode(turn)?;

        let write_txn = self.db.begin_write()?;
        {
            let projects = write_txn.open_table(PROJECTS)?;
            if projects.get(&project_key)?.is_none() {
                return Err(BriefError::ProjectNotFound(turn.project_id));
            }

            let mut turns = write_txn.open_table(TURNS)?;
            let next_seq = match turns.range::<&TurnKey>(&lo..=&hi)?.next_back() {
                Some(entry) => {
                    let (key, _) = entry?;
                    Self::turn_seq(key.value()) + 1
                }
                None => 0,
            };
            turns.insert(&Self::turn_key(&turn.project_id, next_seq), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn recent_turns(&self, id: ProjectId, limit: usize) -> Result<Vec<StoredTurn>> {
        let (lo, hi) = Self::turn_bounds(&id);
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TURNS)?;

        let mut turns = Vec::new();
        for item in table.range::<&TurnKey>(&lo..=&hi)?.rev().take(limit) {
            let (_, value) = item?;
            turns.push(Self::decode::<StoredTurn>(value.value())?);
        }
        turns.reverse();
        Ok(turns)
    }
}
