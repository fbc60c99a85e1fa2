//! Two-phase generation pipeline
//!
//! Phase 1 runs a single structure call and strict-parses the cleaned
//! response into a roadmap skeleton; any parse problem is fatal to the
//! whole operation. Phase 2 fans one content call per chapter through
//! the batch orchestrator; a chapter whose call fails or whose payload
//! does not parse is kept with `None` content.

use std::sync::Arc;

use gemini::clean_json_block;
use keypool::KeyPool;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::batch::{BatchOptions, run_batches};
use crate::error::{Error, Result};
use crate::model::{
    Chapter, ChapterBody, ChapterContent, DetailedCourse, Difficulty, Roadmap,
};
use crate::prompt;
use crate::runner::{GeminiRunner, TaskRunner};

/// Skeleton shape as the model emits it: no ids, no completion flags.
/// Everything except the chapter list is optional; the model gets the
/// benefit of the doubt on missing estimates.
#[derive(Debug, Deserialize)]
struct SkeletonDraft {
    #[serde(default)]
    description: String,
    #[serde(default)]
    total_duration: String,
    #[serde(default)]
    weekly_hours: String,
    #[serde(default)]
    prerequisites: Vec<String>,
    #[serde(default)]
    outcomes: Vec<String>,
    #[serde(default)]
    chapters: Vec<ChapterDraft>,
}

#[derive(Debug, Deserialize)]
struct ChapterDraft {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    duration: String,
    #[serde(default)]
    difficulty: String,
    #[serde(default)]
    key_topics: Vec<String>,
    #[serde(default)]
    skills: Vec<String>,
    #[serde(default)]
    projects: Vec<String>,
    #[serde(default)]
    resource_count: u32,
}

/// Roadmap and course generator.
///
/// Holds its pool and runner explicitly; independent generators (tests,
/// parallel pipelines) never share hidden state.
pub struct Generator {
    pool: Arc<KeyPool>,
    runner: Arc<dyn TaskRunner>,
    opts: BatchOptions,
}

impl Generator {
    pub fn new(pool: Arc<KeyPool>, runner: Arc<dyn TaskRunner>, opts: BatchOptions) -> Self {
        Self { pool, runner, opts }
    }

    /// Production wiring: the pool plus the HTTP generation client.
    pub fn gemini(pool: Arc<KeyPool>, client: gemini::Client, opts: BatchOptions) -> Self {
        let runner = Arc::new(GeminiRunner::new(pool.clone(), client));
        Self::new(pool, runner, opts)
    }

    /// Phase 1: generate the roadmap skeleton.
    ///
    /// One structure call; the cleaned response must parse as the
    /// skeleton object and carry at least one chapter.
    pub async fn generate_roadmap(
        &self,
        subject: &str,
        difficulty: Difficulty,
    ) -> Result<Roadmap> {
        let task = prompt::roadmap_skeleton(subject, difficulty);
        let mut results = run_batches(
            &self.pool,
            self.runner.as_ref(),
            std::slice::from_ref(&task),
            &self.opts,
        )
        .await;

        let text = match results.pop() {
            Some(result) => result?,
            None => return Err(Error::Internal("skeleton batch produced no result".into())),
        };

        let cleaned = clean_json_block(&text);
        let draft: SkeletonDraft =
            serde_json::from_str(&cleaned).map_err(|e| Error::SkeletonParse(e.to_string()))?;
        if draft.chapters.is_empty() {
            return Err(Error::SkeletonParse("skeleton contained no chapters".into()));
        }

        let roadmap_id = Uuid::new_v4().to_string();
        let chapters = draft
            .chapters
            .into_iter()
            .enumerate()
            .map(|(i, c)| Chapter {
                id: format!("ch-{}", i + 1),
                title: c.title,
                description: c.description,
                duration: c.duration,
                difficulty: c.difficulty,
                position: i as u32,
                completed: false,
                key_topics: c.key_topics,
                skills: c.skills,
                projects: c.projects,
                resource_count: c.resource_count,
            })
            .collect::<Vec<_>>();

        info!(
            roadmap_id = %roadmap_id,
            subject,
            chapters = chapters.len(),
            "roadmap skeleton generated"
        );

        Ok(Roadmap {
            id: roadmap_id,
            subject: subject.to_string(),
            difficulty,
            description: draft.description,
            total_duration: draft.total_duration,
            weekly_hours: draft.weekly_hours,
            prerequisites: draft.prerequisites,
            outcomes: draft.outcomes,
            chapters,
        })
    }

    /// Phase 2: expand every chapter into long-form content.
    ///
    /// Always yields one `ChapterContent` per chapter; failures are
    /// isolated to their chapter.
    pub async fn expand_course(&self, roadmap: &Roadmap) -> DetailedCourse {
        let tasks: Vec<String> = roadmap
            .chapters
            .iter()
            .map(|c| prompt::chapter_content(roadmap, c))
            .collect();

        let results = run_batches(&self.pool, self.runner.as_ref(), &tasks, &self.opts).await;

        let chapters = roadmap
            .chapters
            .iter()
            .zip(results)
            .map(|(chapter, result)| {
                let content = match result {
                    Ok(text) => {
                        let cleaned = clean_json_block(&text);
                        match serde_json::from_str::<ChapterBody>(&cleaned) {
                            Ok(body) => Some(body),
                            Err(e) => {
                                warn!(
                                    chapter = %chapter.id,
                                    error = %e,
                                    "chapter content did not parse, keeping empty"
                                );
                                None
                            }
                        }
                    }
                    Err(e) => {
                        warn!(chapter = %chapter.id, error = %e, "chapter generation failed, keeping empty");
                        None
                    }
                };
                ChapterContent {
                    chapter_id: chapter.id.clone(),
                    title: chapter.title.clone(),
                    content,
                }
            })
            .collect::<Vec<_>>();

        let generated = chapters.iter().filter(|c| c.content.is_some()).count();
        info!(
            roadmap_id = %roadmap.id,
            chapters = chapters.len(),
            generated,
            "course expansion finished"
        );

        DetailedCourse {
            roadmap_id: roadmap.id.clone(),
            chapters,
        }
    }
}
