//! Per-session state for the quiz wizard.

mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;
use crate::quiz::QuizBatch;

pub use store::{PruneResult, PruningConfig, SessionHandle, SessionStore};

/// The three wizard views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Upload,
    GenerateQuiz,
    TakeQuiz,
}

impl View {
    pub const ALL: [View; 3] = [View::Upload, View::GenerateQuiz, View::TakeQuiz];

    /// Heading shown in the sidebar and page title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Upload => "PDF Upload",
            Self::GenerateQuiz => "Generate Quiz",
            Self::TakeQuiz => "Take Quiz",
        }
    }

    /// Path segment used in `/view/{slug}`.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::GenerateQuiz => "generate",
            Self::TakeQuiz => "quiz",
        }
    }

    pub fn from_slug(slug: &str) -> Result<Self, SessionError> {
        Self::ALL
            .into_iter()
            .find(|v| v.slug() == slug)
            .ok_or_else(|| SessionError::UnknownView {
                name: slug.to_string(),
            })
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// Text extracted from one uploaded PDF.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: Uuid,
    pub file_name: String,
    pub text: String,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    pub fn new(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            text: text.into(),
            uploaded_at: Utc::now(),
        }
    }
}

/// One browser session's wizard state.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub view: View,
    pub document: Option<Document>,
    pub quiz: Option<QuizBatch>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            view: View::default(),
            document: None,
            quiz: None,
            created_at: now,
            last_seen: now,
        }
    }

    /// Store a newly uploaded document.
    ///
    /// Any quiz belongs to the previous document and is discarded.
    pub fn set_document(&mut self, document: Document) {
        if self.quiz.take().is_some() {
            tracing::debug!(session = %self.id, "Discarding quiz for replaced document");
        }
        self.document = Some(document);
    }

    /// Replace the quiz wholesale. `None` records a failed generation.
    pub fn set_quiz(&mut self, quiz: Option<QuizBatch>) {
        self.quiz = quiz;
    }

    /// The quiz, if it exists, is non-empty and matches the current document.
    pub fn current_quiz(&self) -> Option<&QuizBatch> {
        let doc_id = self.document.as_ref().map(|d| d.id)?;
        self.quiz
            .as_ref()
            .filter(|q| !q.is_empty() && q.document_id == doc_id)
    }

    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
