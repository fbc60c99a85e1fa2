//! Local JSON-file mirror of the backend entities
//!
//! One file holds every locally-persisted entity under synthetic string
//! keys embedding the entity id (`roadmap:{user}:{id}`,
//! `course:{roadmap_id}`), plus the append-only history list. Writes go
//! through an atomic temp-file + rename so a crash mid-write never
//! corrupts the file. A tokio Mutex serializes writers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use roadmap::{DetailedCourse, Roadmap};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// One locally-recorded completion event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub user: String,
    pub roadmap_id: String,
    pub subject: String,
    pub chapter_flags: Vec<bool>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LocalState {
    #[serde(default)]
    roadmaps: HashMap<String, serde_json::Value>,
    #[serde(default)]
    courses: HashMap<String, serde_json::Value>,
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

/// File-backed fallback store.
pub struct LocalStore {
    path: PathBuf,
    state: Mutex<LocalState>,
}

fn roadmap_key(user: &str, roadmap_id: &str) -> String {
    format!("roadmap:{user}:{roadmap_id}")
}

fn course_key(roadmap_id: &str) -> String {
    format!("course:{roadmap_id}")
}

impl LocalStore {
    /// Open the store file, creating it empty if absent.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading local store: {e}")))?;
            let state: LocalState = serde_json::from_str(&contents)?;
            info!(
                path = %path.display(),
                roadmaps = state.roadmaps.len(),
                "loaded local store"
            );
            state
        } else {
            info!(path = %path.display(), "local store not found, starting empty");
            let state = LocalState::default();
            write_atomic(&path, &state).await?;
            state
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Insert a roadmap for a user. An existing `(user, roadmap id)`
    /// key is a duplicate rejection, mirroring the backend constraint.
    pub async fn insert_roadmap(&self, user: &str, roadmap: &Roadmap) -> Result<()> {
        let key = roadmap_key(user, &roadmap.id);
        let mut state = self.state.lock().await;
        if state.roadmaps.contains_key(&key) {
            return Err(Error::Duplicate(format!("{user}/{}", roadmap.id)));
        }
        state.roadmaps.insert(key, serde_json::to_value(roadmap)?);
        debug!(user, roadmap_id = %roadmap.id, "roadmap stored locally");
        write_atomic(&self.path, &state).await
    }

    /// Overwrite an existing roadmap (chapter completion updates).
    pub async fn update_roadmap(&self, user: &str, roadmap: &Roadmap) -> Result<()> {
        let key = roadmap_key(user, &roadmap.id);
        let mut state = self.state.lock().await;
        if !state.roadmaps.contains_key(&key) {
            return Err(Error::NotFound(format!("roadmap {}", roadmap.id)));
        }
        state.roadmaps.insert(key, serde_json::to_value(roadmap)?);
        write_atomic(&self.path, &state).await
    }

    pub async fn get_roadmap(&self, user: &str, roadmap_id: &str) -> Result<Option<Roadmap>> {
        let state = self.state.lock().await;
        match state.roadmaps.get(&roadmap_key(user, roadmap_id)) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Insert or replace the detailed course for a roadmap.
    pub async fn put_course(&self, course: &DetailedCourse) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .courses
            .insert(course_key(&course.roadmap_id), serde_json::to_value(course)?);
        debug!(roadmap_id = %course.roadmap_id, "course stored locally");
        write_atomic(&self.path, &state).await
    }

    pub async fn get_course(&self, roadmap_id: &str) -> Result<Option<DetailedCourse>> {
        let state = self.state.lock().await;
        match state.courses.get(&course_key(roadmap_id)) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Append a completion event. History is never rewritten.
    pub async fn append_history(&self, entry: HistoryEntry) -> Result<()> {
        let mut state = self.state.lock().await;
        state.history.push(entry);
        write_atomic(&self.path, &state).await
    }

    /// Completion events for one user, newest first.
    pub async fn history_for(&self, user: &str) -> Vec<HistoryEntry> {
        let state = self.state.lock().await;
        let mut entries: Vec<HistoryEntry> = state
            .history
            .iter()
            .filter(|e| e.user == user)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        entries
    }
}

/// Atomic write: temp file in the same directory, then rename.
async fn write_atomic(path: &Path, state: &LocalState) -> Result<()> {
    let json = serde_json::to_string_pretty(state)?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("local store path has no parent directory".into()))?;
    let tmp_path = dir.join(format!(".localstore.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp store file: {e}")))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp store file: {e}")))?;

    debug!(path = %path.display(), "persisted local store");
    Ok(())
}
