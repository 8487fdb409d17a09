//! The three-view quiz wizard.
//!
//! [`Controller::handle`] applies one user [`Action`] to a [`Session`] and
//! returns the [`Page`] to render. Navigation is never refused: a view whose
//! prerequisite is missing renders a warning instead.

mod page;

use std::sync::Arc;

use crate::error::Error;
use crate::llm::ModelClient;
use crate::media::TextExtractor;
use crate::quiz::{QuizGenerator, RemediationGenerator, score_answers};
use crate::session::{Document, Session, View};

pub use page::{Notice, NoticeLevel, Page, PageBody, QuizResult};

/// Question count offered by the generate form.
pub const DEFAULT_QUESTION_COUNT: u32 = 5;
pub const MIN_QUESTION_COUNT: i64 = 1;
pub const MAX_QUESTION_COUNT: i64 = 10;

pub const MSG_UPLOADED: &str = "PDF uploaded and processed successfully!";
pub const MSG_NO_PDF: &str =
    "No PDF uploaded yet. Please upload a PDF in the PDF Upload section first.";
pub const MSG_PDF_LOADED: &str = "PDF content loaded. You can now generate a quiz.";
pub const MSG_QUIZ_READY: &str = "Quiz generated successfully! Go to 'Take Quiz' to start.";
pub const MSG_QUIZ_FAILED: &str = "Failed to generate quiz. Please try again.";
pub const MSG_NO_QUIZ: &str = "No quiz available. Please generate a quiz first.";
pub const MSG_BAD_COUNT: &str = "Number of questions must be between 1 and 10.";
pub const MSG_REMEDIATION_FAILED: &str =
    "Failed to generate simplified content. Please try again.";

/// A single user interaction.
#[derive(Debug, Clone)]
pub enum Action {
    /// Switch to a view via the sidebar or a "Go to" button.
    Show(View),
    Upload { file_name: String, bytes: Vec<u8> },
    Generate { count: i64 },
    /// Selected option text per question, in quiz order.
    Submit { selections: Vec<Option<String>> },
}

pub struct Controller {
    extractor: Arc<dyn TextExtractor>,
    quiz: QuizGenerator,
    remediation: RemediationGenerator,
}

impl Controller {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        client: Arc<dyn ModelClient>,
        model_id: impl Into<String>,
    ) -> Self {
        let model_id = model_id.into();
        Self {
            extractor,
            quiz: QuizGenerator::new(Arc::clone(&client), model_id.clone()),
            remediation: RemediationGenerator::new(client, model_id),
        }
    }

    /// Apply `action` to `session`.
    ///
    /// Only extraction failures are returned as errors; everything else
    /// ends up as a notice on the page.
    pub async fn handle(&self, session: &mut Session, action: Action) -> Result<Page, Error> {
        session.touch();
        match action {
            Action::Show(view) => {
                session.view = view;
                Ok(self.show(session))
            }
            Action::Upload { file_name, bytes } => {
                session.view = View::Upload;
                self.upload(session, file_name, bytes).await
            }
            Action::Generate { count } => {
                session.view = View::GenerateQuiz;
                Ok(self.generate(session, count).await)
            }
            Action::Submit { selections } => {
                session.view = View::TakeQuiz;
                Ok(self.submit(session, selections).await)
            }
        }
    }

    /// Render the session's current view without changing anything.
    pub fn show(&self, session: &Session) -> Page {
        match session.view {
            View::Upload => Page::new(
                View::Upload,
                PageBody::Upload {
                    current_file: session.document.as_ref().map(|d| d.file_name.clone()),
                },
            ),
            View::GenerateQuiz => match &session.document {
                Some(doc) => generate_form(doc, DEFAULT_QUESTION_COUNT),
                None => Page::blocked(View::GenerateQuiz, MSG_NO_PDF),
            },
            View::TakeQuiz => match session.current_quiz() {
                Some(quiz) => Page::new(
                    View::TakeQuiz,
                    PageBody::TakeQuiz {
                        selections: quiz
                            .items
                            .iter()
                            .map(|item| Some(item.options[0].clone()))
                            .collect(),
                        items: quiz.items.clone(),
                        result: None,
                    },
                ),
                None => Page::blocked(View::TakeQuiz, MSG_NO_QUIZ),
            },
        }
    }

    async fn upload(
        &self,
        session: &mut Session,
        file_name: String,
        bytes: Vec<u8>,
    ) -> Result<Page, Error> {
        let size = bytes.len();
        let text = self.extractor.extract_text(bytes).await?;
        tracing::info!(
            session = %session.id,
            file = %file_name,
            bytes = size,
            chars = text.chars().count(),
            "PDF processed"
        );

        session.set_document(Document::new(file_name.clone(), text));
        Ok(Page::new(
            View::Upload,
            PageBody::Upload {
                current_file: Some(file_name),
            },
        )
        .with_notice(Notice::success(MSG_UPLOADED))
        .with_next(View::GenerateQuiz))
    }

    async fn generate(&self, session: &mut Session, count: i64) -> Page {
        let Some(doc) = &session.document else {
            return Page::blocked(View::GenerateQuiz, MSG_NO_PDF);
        };

        let Some(count) = valid_count(count) else {
            return generate_form(doc, DEFAULT_QUESTION_COUNT)
                .with_notice(Notice::warning(MSG_BAD_COUNT));
        };

        let page = generate_form(doc, count);
        match self.quiz.generate(doc.id, &doc.text, count).await {
            Ok(batch) => {
                session.set_quiz(Some(batch));
                page.with_notice(Notice::success(MSG_QUIZ_READY))
                    .with_next(View::TakeQuiz)
            }
            Err(e) => {
                tracing::warn!(session = %session.id, error = %e, "Quiz generation failed");
                session.set_quiz(None);
                page.with_notice(Notice::error(MSG_QUIZ_FAILED))
            }
        }
    }

    async fn submit(&self, session: &mut Session, selections: Vec<Option<String>>) -> Page {
        let Some(quiz) = session.current_quiz() else {
            return Page::blocked(View::TakeQuiz, MSG_NO_QUIZ);
        };
        let Some(doc) = &session.document else {
            return Page::blocked(View::TakeQuiz, MSG_NO_QUIZ);
        };

        let report = score_answers(&quiz.items, &selections);
        tracing::info!(
            session = %session.id,
            score = report.score,
            total = report.total,
            "Quiz submitted"
        );

        let mut notices = Vec::new();
        let incorrect = report.incorrect_questions();
        let remediation = if incorrect.is_empty() {
            None
        } else {
            match self.remediation.explain(&doc.text, &incorrect).await {
                Ok(output) => Some(output.to_string()),
                Err(e) => {
                    tracing::warn!(session = %session.id, error = %e, "Remediation failed");
                    notices.push(Notice::error(MSG_REMEDIATION_FAILED));
                    None
                }
            }
        };

        let mut page = Page::new(
            View::TakeQuiz,
            PageBody::TakeQuiz {
                items: quiz.items.clone(),
                selections,
                result: Some(QuizResult {
                    report,
                    remediation,
                }),
            },
        )
        .with_next(View::Upload);
        page.notices = notices;
        page
    }
}

fn generate_form(doc: &Document, count: u32) -> Page {
    Page::new(
        View::GenerateQuiz,
        PageBody::GenerateQuiz {
            file_name: doc.file_name.clone(),
            count,
        },
    )
    .with_notice(Notice::success(MSG_PDF_LOADED))
}

fn valid_count(count: i64) -> Option<u32> {
    if (MIN_QUESTION_COUNT..=MAX_QUESTION_COUNT).contains(&count) {
        u32::try_from(count).ok()
    } else {
        None
    }
}

/// Format the score line shown after a submission.
pub fn score_message(score: usize, total: usize) -> String {
    format!("You scored {} out of {}!", score, total)
}
