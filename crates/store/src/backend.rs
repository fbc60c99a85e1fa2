//! Postgres repositories
//!
//! Runtime-checked sqlx queries against the schema in
//! `migrations/0001_init.sql`. Unique-constraint violations on roadmap
//! insert are mapped to `Error::Duplicate` so callers can tell a
//! rejection from an outage.

use roadmap::{DetailedCourse, Roadmap};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{CourseRow, HistoryRow, RoadmapRow, UserRow};

/// Column list for roadmap queries.
const ROADMAP_COLUMNS: &str =
    "id, user_id, roadmap_id, subject, difficulty, payload, created_at";

/// Column list for course queries.
const COURSE_COLUMNS: &str = "id, roadmap_id, payload, created_at";

/// Column list for history queries.
const HISTORY_COLUMNS: &str = "id, user_id, roadmap_id, subject, chapter_flags, recorded_at";

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run pending migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
    Ok(())
}

/// Users keyed by external identity id.
pub struct UserRepo;

impl UserRepo {
    /// Create-or-fetch a user by external identity id.
    ///
    /// The no-op `DO UPDATE` makes `RETURNING` yield the existing row
    /// on conflict, so this is one round trip either way.
    pub async fn ensure(pool: &PgPool, external_id: &str) -> Result<UserRow> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (external_id) VALUES ($1)
             ON CONFLICT (external_id) DO UPDATE SET external_id = EXCLUDED.external_id
             RETURNING id, external_id, created_at",
        )
        .bind(external_id)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }
}

/// Roadmap rows, unique per `(user_id, roadmap_id)`.
pub struct RoadmapRepo;

impl RoadmapRepo {
    /// Insert a roadmap. A unique-constraint violation becomes
    /// `Error::Duplicate`.
    pub async fn insert(pool: &PgPool, user_id: Uuid, roadmap: &Roadmap) -> Result<RoadmapRow> {
        let payload = serde_json::to_value(roadmap)?;
        let query = format!(
            "INSERT INTO roadmaps (user_id, roadmap_id, subject, difficulty, payload)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {ROADMAP_COLUMNS}"
        );
        sqlx::query_as::<_, RoadmapRow>(&query)
            .bind(user_id)
            .bind(&roadmap.id)
            .bind(&roadmap.subject)
            .bind(roadmap.difficulty.as_str())
            .bind(payload)
            .fetch_one(pool)
            .await
            .map_err(|e| map_unique_violation(e, user_id, &roadmap.id))
    }

    /// Fetch one roadmap row for a user.
    pub async fn fetch(
        pool: &PgPool,
        user_id: Uuid,
        roadmap_id: &str,
    ) -> Result<Option<RoadmapRow>> {
        let query = format!(
            "SELECT {ROADMAP_COLUMNS} FROM roadmaps
             WHERE user_id = $1 AND roadmap_id = $2"
        );
        let row = sqlx::query_as::<_, RoadmapRow>(&query)
            .bind(user_id)
            .bind(roadmap_id)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }

    /// Overwrite a stored roadmap's payload (chapter completion is the
    /// only mutation after generation).
    pub async fn update_payload(
        pool: &PgPool,
        user_id: Uuid,
        roadmap: &Roadmap,
    ) -> Result<()> {
        let payload = serde_json::to_value(roadmap)?;
        let result = sqlx::query(
            "UPDATE roadmaps SET payload = $3
             WHERE user_id = $1 AND roadmap_id = $2",
        )
        .bind(user_id)
        .bind(&roadmap.id)
        .bind(payload)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("roadmap {}", roadmap.id)));
        }
        Ok(())
    }
}

/// Detailed course rows, one per roadmap.
pub struct CourseRepo;

impl CourseRepo {
    /// Insert or replace the course for a roadmap. Re-expansion
    /// overwrites; the course has no independent identity.
    pub async fn upsert(pool: &PgPool, course: &DetailedCourse) -> Result<CourseRow> {
        let payload = serde_json::to_value(course)?;
        let query = format!(
            "INSERT INTO courses (roadmap_id, payload) VALUES ($1, $2)
             ON CONFLICT (roadmap_id) DO UPDATE SET payload = EXCLUDED.payload
             RETURNING {COURSE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CourseRow>(&query)
            .bind(&course.roadmap_id)
            .bind(payload)
            .fetch_one(pool)
            .await?;
        Ok(row)
    }

    pub async fn fetch(pool: &PgPool, roadmap_id: &str) -> Result<Option<CourseRow>> {
        let query = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE roadmap_id = $1");
        let row = sqlx::query_as::<_, CourseRow>(&query)
            .bind(roadmap_id)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }
}

/// Append-only learning history.
pub struct HistoryRepo;

impl HistoryRepo {
    pub async fn append(
        pool: &PgPool,
        user_id: Uuid,
        roadmap_id: &str,
        subject: &str,
        chapter_flags: &[bool],
    ) -> Result<HistoryRow> {
        let query = format!(
            "INSERT INTO learning_history (user_id, roadmap_id, subject, chapter_flags)
             VALUES ($1, $2, $3, $4)
             RETURNING {HISTORY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, HistoryRow>(&query)
            .bind(user_id)
            .bind(roadmap_id)
            .bind(subject)
            .bind(serde_json::to_value(chapter_flags)?)
            .fetch_one(pool)
            .await?;
        Ok(row)
    }

    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<HistoryRow>> {
        let query = format!(
            "SELECT {HISTORY_COLUMNS} FROM learning_history
             WHERE user_id = $1
             ORDER BY recorded_at DESC"
        );
        let rows = sqlx::query_as::<_, HistoryRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }
}

/// Map a unique-constraint violation to `Duplicate`; pass every other
/// database error through.
fn map_unique_violation(e: sqlx::Error, user_id: Uuid, roadmap_id: &str) -> Error {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::Duplicate(format!("{user_id}/{roadmap_id}"))
        }
        _ => Error::Database(e),
    }
}
