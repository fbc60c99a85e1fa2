//! Prompt construction for the two generation phases
//!
//! Both prompts demand a bare JSON object; the cleaning step in
//! `gemini::extract` still handles the fences models add anyway.

use crate::model::{Chapter, Difficulty, Roadmap};

/// Prompt for the single structure-generation call (phase 1).
pub fn roadmap_skeleton(subject: &str, difficulty: Difficulty) -> String {
    format!(
        r#"Create a learning roadmap for "{subject}" at {difficulty} level.

Respond with ONLY a JSON object, no prose and no markdown fences, with exactly these fields:
{{
  "description": "one-paragraph overview of the roadmap",
  "total_duration": "overall estimate, e.g. '10 weeks'",
  "weekly_hours": "suggested hours per week, e.g. '6'",
  "prerequisites": ["..."],
  "outcomes": ["what the learner can do afterwards"],
  "chapters": [
    {{
      "title": "...",
      "description": "...",
      "duration": "...",
      "difficulty": "beginner|intermediate|advanced",
      "key_topics": ["..."],
      "skills": ["..."],
      "projects": ["..."],
      "resource_count": 3
    }}
  ]
}}

Produce between 6 and 12 chapters ordered from fundamentals to advanced material."#,
        difficulty = difficulty.as_str(),
    )
}

/// Prompt for one chapter's content-generation call (phase 2).
pub fn chapter_content(roadmap: &Roadmap, chapter: &Chapter) -> String {
    format!(
        r#"You are writing chapter {number} ("{title}") of a {difficulty}-level course on "{subject}".
Chapter summary: {summary}
Key topics: {topics}

Respond with ONLY a JSON object, no prose and no markdown fences, with exactly these fields:
{{
  "overview": "two-paragraph introduction to the chapter",
  "sections": [{{"heading": "...", "body": "several paragraphs of lesson text"}}],
  "code_samples": [{{"language": "...", "code": "...", "explanation": "..."}}],
  "exercises": ["..."],
  "resources": [{{"title": "...", "url": "..."}}]
}}

Write at least three sections and two exercises."#,
        number = chapter.position + 1,
        title = chapter.title,
        difficulty = roadmap.difficulty.as_str(),
        subject = roadmap.subject,
        summary = chapter.description,
        topics = chapter.key_topics.join(", "),
    )
}
