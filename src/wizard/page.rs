//! View model produced by the controller and consumed by the renderer.

use serde::Serialize;

use crate::quiz::{QuizItem, ScoreReport};
use crate::session::View;

/// Severity of a notice banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Outcome of a quiz submission.
#[derive(Debug, Clone, Serialize)]
pub struct QuizResult {
    pub report: ScoreReport,
    /// Simplified explanation, present when some answers were wrong and the
    /// model call succeeded.
    pub remediation: Option<String>,
}

/// View-specific content.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageBody {
    /// A prerequisite is missing; only the notices are shown.
    Blocked,
    Upload {
        /// File name of the document already held by the session.
        current_file: Option<String>,
    },
    GenerateQuiz {
        file_name: String,
        count: u32,
    },
    TakeQuiz {
        items: Vec<QuizItem>,
        /// Selected option text per item, used to pre-check radio buttons.
        selections: Vec<Option<String>>,
        result: Option<QuizResult>,
    },
}

/// Everything needed to render one response.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub view: View,
    pub notices: Vec<Notice>,
    pub body: PageBody,
    /// Target of the navigation button shown under the content.
    pub next: Option<View>,
}

impl Page {
    pub fn new(view: View, body: PageBody) -> Self {
        Self {
            view,
            notices: Vec::new(),
            body,
            next: None,
        }
    }

    pub fn blocked(view: View, warning: &str) -> Self {
        Self::new(view, PageBody::Blocked).with_notice(Notice::warning(warning))
    }

    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notices.push(notice);
        self
    }

    pub fn with_next(mut self, view: View) -> Self {
        self.next = Some(view);
        self
    }

    pub fn has_notice(&self, level: NoticeLevel) -> bool {
        self.notices.iter().any(|n| n.level == level)
    }
}
