//! Domain types for roadmaps and detailed courses

use serde::{Deserialize, Serialize};

/// Requested depth of a roadmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

/// One chapter of a roadmap.
///
/// Immutable once generated, except for `completed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Free-form duration estimate ("2 weeks").
    #[serde(default)]
    pub duration: String,
    /// Per-chapter difficulty tag from the model, not validated.
    #[serde(default)]
    pub difficulty: String,
    /// Ordering hint; chapters render sorted by this.
    pub position: u32,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub key_topics: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub resource_count: u32,
}

/// A generated curriculum skeleton.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roadmap {
    pub id: String,
    pub subject: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub total_duration: String,
    #[serde(default)]
    pub weekly_hours: String,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub outcomes: Vec<String>,
    pub chapters: Vec<Chapter>,
}

impl Roadmap {
    /// Flip one chapter's completion flag. Returns false when the
    /// chapter id is unknown; no other chapter is touched either way.
    pub fn mark_complete(&mut self, chapter_id: &str) -> bool {
        match self.chapters.iter_mut().find(|c| c.id == chapter_id) {
            Some(chapter) => {
                chapter.completed = true;
                true
            }
            None => false,
        }
    }

    /// Completion flags in chapter order, as embedded in history rows.
    pub fn completion_flags(&self) -> Vec<bool> {
        self.chapters.iter().map(|c| c.completed).collect()
    }
}

/// A titled block of long-form lesson text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSample {
    #[serde(default)]
    pub language: String,
    pub code: String,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub title: String,
    #[serde(default)]
    pub url: String,
}

/// Long-form content generated for one chapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterBody {
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub code_samples: Vec<CodeSample>,
    #[serde(default)]
    pub exercises: Vec<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// Per-chapter slot of a detailed course. `content` is `None` when the
/// content call failed or its payload did not parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterContent {
    pub chapter_id: String,
    pub title: String,
    pub content: Option<ChapterBody>,
}

/// The expanded course derived from a roadmap, linked by roadmap id and
/// persisted independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedCourse {
    pub roadmap_id: String,
    pub chapters: Vec<ChapterContent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_roadmap() -> Roadmap {
        Roadmap {
            id: "rm-1".into(),
            subject: "Python".into(),
            difficulty: Difficulty::Beginner,
            description: "From zero to scripts".into(),
            total_duration: "8 weeks".into(),
            weekly_hours: "5".into(),
            prerequisites: vec![],
            outcomes: vec!["write small programs".into()],
            chapters: vec![
                Chapter {
                    id: "ch-1".into(),
                    title: "Basics".into(),
                    description: String::new(),
                    duration: "1 week".into(),
                    difficulty: "beginner".into(),
                    position: 0,
                    completed: false,
                    key_topics: vec!["variables".into()],
                    skills: vec![],
                    projects: vec![],
                    resource_count: 3,
                },
                Chapter {
                    id: "ch-2".into(),
                    title: "Control flow".into(),
                    description: String::new(),
                    duration: "1 week".into(),
                    difficulty: "beginner".into(),
                    position: 1,
                    completed: false,
                    key_topics: vec![],
                    skills: vec![],
                    projects: vec![],
                    resource_count: 2,
                },
            ],
        }
    }

    #[test]
    fn mark_complete_touches_only_the_named_chapter() {
        let mut roadmap = sample_roadmap();
        assert!(roadmap.mark_complete("ch-2"));
        assert_eq!(roadmap.completion_flags(), vec![false, true]);
    }

    #[test]
    fn mark_complete_unknown_chapter_is_false() {
        let mut roadmap = sample_roadmap();
        assert!(!roadmap.mark_complete("ch-99"));
        assert_eq!(roadmap.completion_flags(), vec![false, false]);
    }

    #[test]
    fn difficulty_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Difficulty::Intermediate).unwrap(),
            r#""intermediate""#
        );
        let parsed: Difficulty = serde_json::from_str(r#""advanced""#).unwrap();
        assert_eq!(parsed, Difficulty::Advanced);
    }

    #[test]
    fn roadmap_roundtrips_through_json() {
        let roadmap = sample_roadmap();
        let json = serde_json::to_string(&roadmap).unwrap();
        let back: Roadmap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.chapters.len(), 2);
        assert_eq!(back.chapters[0].key_topics, vec!["variables"]);
    }
}
