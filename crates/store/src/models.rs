//! Row types for the Postgres backend

use chrono::{DateTime, Utc};
use roadmap::{DetailedCourse, Roadmap};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::Result;

/// A user row, created on first sight of an external identity id.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub external_id: String,
    pub created_at: DateTime<Utc>,
}

/// A stored roadmap. The full domain object lives in `payload`; the
/// subject/difficulty columns exist for listing without deserializing.
#[derive(Debug, Clone, FromRow)]
pub struct RoadmapRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub roadmap_id: String,
    pub subject: String,
    pub difficulty: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl RoadmapRow {
    /// Deserialize the stored payload back into the domain type.
    pub fn into_roadmap(self) -> Result<Roadmap> {
        Ok(serde_json::from_value(self.payload)?)
    }
}

/// A stored detailed course, linked to its roadmap by id.
#[derive(Debug, Clone, FromRow)]
pub struct CourseRow {
    pub id: Uuid,
    pub roadmap_id: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl CourseRow {
    pub fn into_course(self) -> Result<DetailedCourse> {
        Ok(serde_json::from_value(self.payload)?)
    }
}

/// An append-only learning-history row with the embedded per-chapter
/// completion list at the time of the event.
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub roadmap_id: String,
    pub subject: String,
    pub chapter_flags: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadmap::{Chapter, Difficulty};

    #[test]
    fn roadmap_row_payload_roundtrip() {
        let roadmap = Roadmap {
            id: "rm-1".into(),
            subject: "Python".into(),
            difficulty: Difficulty::Beginner,
            description: String::new(),
            total_duration: String::new(),
            weekly_hours: String::new(),
            prerequisites: vec![],
            outcomes: vec![],
            chapters: vec![Chapter {
                id: "ch-1".into(),
                title: "Basics".into(),
                description: String::new(),
                duration: String::new(),
                difficulty: "beginner".into(),
                position: 0,
                completed: false,
                key_topics: vec![],
                skills: vec![],
                projects: vec![],
                resource_count: 0,
            }],
        };

        let row = RoadmapRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            roadmap_id: roadmap.id.clone(),
            subject: roadmap.subject.clone(),
            difficulty: roadmap.difficulty.as_str().into(),
            payload: serde_json::to_value(&roadmap).unwrap(),
            created_at: Utc::now(),
        };

        let back = row.into_roadmap().unwrap();
        assert_eq!(back.id, "rm-1");
        assert_eq!(back.chapters.len(), 1);
    }

    #[test]
    fn corrupt_payload_is_an_error() {
        let row = CourseRow {
            id: Uuid::new_v4(),
            roadmap_id: "rm-1".into(),
            payload: serde_json::json!("not an object"),
            created_at: Utc::now(),
        };
        assert!(row.into_course().is_err());
    }
}
