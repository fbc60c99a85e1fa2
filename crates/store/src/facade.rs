//! Storage facade over the Postgres backend and the local mirror
//!
//! Every operation tries the backend first when one is configured and
//! falls back to the local file on infrastructure failures only. Data
//! answers (duplicates, lookup misses, corrupt payloads) propagate to
//! the caller unchanged; a duplicate roadmap must never be "rescued"
//! into the local store.

use chrono::Utc;
use roadmap::{DetailedCourse, Roadmap};
use sqlx::PgPool;
use tracing::warn;

use crate::backend::{CourseRepo, HistoryRepo, RoadmapRepo, UserRepo};
use crate::error::{Error, Result};
use crate::local::{HistoryEntry, LocalStore};

/// Persistence entry point for the service.
pub struct Storage {
    backend: Option<PgPool>,
    local: LocalStore,
}

impl Storage {
    pub fn new(backend: Option<PgPool>, local: LocalStore) -> Self {
        if backend.is_none() {
            warn!("no database configured, running on local store only");
        }
        Self { backend, local }
    }

    /// Persist a freshly generated roadmap for a user.
    pub async fn save_roadmap(&self, user: &str, roadmap: &Roadmap) -> Result<()> {
        if let Some(pool) = &self.backend {
            match Self::backend_save_roadmap(pool, user, roadmap).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_infrastructure() => {
                    warn!(error = %e, user, "backend unavailable, saving roadmap locally");
                }
                Err(e) => return Err(e),
            }
        }
        self.local.insert_roadmap(user, roadmap).await
    }

    async fn backend_save_roadmap(pool: &PgPool, user: &str, roadmap: &Roadmap) -> Result<()> {
        let user_row = UserRepo::ensure(pool, user).await?;
        RoadmapRepo::insert(pool, user_row.id, roadmap).await?;
        Ok(())
    }

    /// Fetch a stored roadmap, `None` when the user has no such roadmap.
    pub async fn load_roadmap(&self, user: &str, roadmap_id: &str) -> Result<Option<Roadmap>> {
        if let Some(pool) = &self.backend {
            match Self::backend_load_roadmap(pool, user, roadmap_id).await {
                Ok(found) => return Ok(found),
                Err(e) if e.is_infrastructure() => {
                    warn!(error = %e, user, "backend unavailable, reading roadmap locally");
                }
                Err(e) => return Err(e),
            }
        }
        self.local.get_roadmap(user, roadmap_id).await
    }

    async fn backend_load_roadmap(
        pool: &PgPool,
        user: &str,
        roadmap_id: &str,
    ) -> Result<Option<Roadmap>> {
        let user_row = UserRepo::ensure(pool, user).await?;
        match RoadmapRepo::fetch(pool, user_row.id, roadmap_id).await? {
            Some(row) => Ok(Some(row.into_roadmap()?)),
            None => Ok(None),
        }
    }

    /// Mark one chapter of a user's roadmap complete, persist the
    /// updated roadmap, and append a history event capturing the
    /// completion flags at that moment. Returns the updated roadmap.
    pub async fn mark_chapter_complete(
        &self,
        user: &str,
        roadmap_id: &str,
        chapter_id: &str,
    ) -> Result<Roadmap> {
        let mut roadmap = self
            .load_roadmap(user, roadmap_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("roadmap {roadmap_id}")))?;

        if !roadmap.mark_complete(chapter_id) {
            return Err(Error::NotFound(format!(
                "chapter {chapter_id} in roadmap {roadmap_id}"
            )));
        }

        self.persist_update(user, &roadmap).await?;

        let entry = HistoryEntry {
            user: user.to_string(),
            roadmap_id: roadmap_id.to_string(),
            subject: roadmap.subject.clone(),
            chapter_flags: roadmap.completion_flags(),
            recorded_at: Utc::now(),
        };
        self.append_history(entry).await?;

        Ok(roadmap)
    }

    async fn persist_update(&self, user: &str, roadmap: &Roadmap) -> Result<()> {
        if let Some(pool) = &self.backend {
            match Self::backend_update(pool, user, roadmap).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_infrastructure() => {
                    warn!(error = %e, user, "backend unavailable, updating roadmap locally");
                }
                Err(e) => return Err(e),
            }
        }
        self.local.update_roadmap(user, roadmap).await
    }

    async fn backend_update(pool: &PgPool, user: &str, roadmap: &Roadmap) -> Result<()> {
        let user_row = UserRepo::ensure(pool, user).await?;
        RoadmapRepo::update_payload(pool, user_row.id, roadmap).await
    }

    async fn append_history(&self, entry: HistoryEntry) -> Result<()> {
        if let Some(pool) = &self.backend {
            match Self::backend_append_history(pool, &entry).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_infrastructure() => {
                    warn!(error = %e, "backend unavailable, recording history locally");
                }
                Err(e) => return Err(e),
            }
        }
        self.local.append_history(entry).await
    }

    async fn backend_append_history(pool: &PgPool, entry: &HistoryEntry) -> Result<()> {
        let user_row = UserRepo::ensure(pool, &entry.user).await?;
        HistoryRepo::append(
            pool,
            user_row.id,
            &entry.roadmap_id,
            &entry.subject,
            &entry.chapter_flags,
        )
        .await?;
        Ok(())
    }

    /// Persist (or replace) the detailed course for a roadmap.
    pub async fn save_course(&self, course: &DetailedCourse) -> Result<()> {
        if let Some(pool) = &self.backend {
            match CourseRepo::upsert(pool, course).await {
                Ok(_) => return Ok(()),
                Err(e) if e.is_infrastructure() => {
                    warn!(error = %e, "backend unavailable, saving course locally");
                }
                Err(e) => return Err(e),
            }
        }
        self.local.put_course(course).await
    }

    pub async fn load_course(&self, roadmap_id: &str) -> Result<Option<DetailedCourse>> {
        if let Some(pool) = &self.backend {
            match CourseRepo::fetch(pool, roadmap_id).await {
                Ok(Some(row)) => return Ok(Some(row.into_course()?)),
                Ok(None) => return Ok(None),
                Err(e) if e.is_infrastructure() => {
                    warn!(error = %e, "backend unavailable, reading course locally");
                }
                Err(e) => return Err(e),
            }
        }
        self.local.get_course(roadmap_id).await
    }

    /// Completion history for a user, newest first.
    pub async fn history(&self, user: &str) -> Result<Vec<HistoryEntry>> {
        if let Some(pool) = &self.backend {
            match Self::backend_history(pool, user).await {
                Ok(entries) => return Ok(entries),
                Err(e) if e.is_infrastructure() => {
                    warn!(error = %e, user, "backend unavailable, reading history locally");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(self.local.history_for(user).await)
    }

    async fn backend_history(pool: &PgPool, user: &str) -> Result<Vec<HistoryEntry>> {
        let user_row = UserRepo::ensure(pool, user).await?;
        let rows = HistoryRepo::list_for_user(pool, user_row.id).await?;
        rows.into_iter()
            .map(|row| {
                let chapter_flags: Vec<bool> = serde_json::from_value(row.chapter_flags)?;
                Ok(HistoryEntry {
                    user: user.to_string(),
                    roadmap_id: row.roadmap_id,
                    subject: row.subject,
                    chapter_flags,
                    recorded_at: row.recorded_at,
                })
            })
            .collect()
    }
}
