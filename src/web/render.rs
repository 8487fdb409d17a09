//! HTML rendering for wizard pages.
//!
//! Output is assembled by hand; every piece of user or model text goes
//! through [`html_escape`].

use std::fmt::Write;

use crate::quiz::QuizItem;
use crate::session::View;
use crate::wizard::{Notice, Page, PageBody, QuizResult, score_message};

pub const APP_TITLE: &str = "PDF Learning Assistant";
pub const REMEDIATION_HEADING: &str = "Simplified Content for Incorrectly Answered Questions";

const STYLE: &str = "\
body{margin:0;font-family:sans-serif;display:flex;min-height:100vh}\
nav{width:14rem;padding:1rem;background:#f0f2f6}\
nav ul{list-style:none;padding:0}\
nav a{display:block;padding:.4rem 0;color:#262730;text-decoration:none}\
nav a.active{font-weight:bold}\
main{flex:1;padding:1rem 2rem;max-width:48rem}\
.notice{padding:.75rem 1rem;margin:.5rem 0;border-radius:.4rem}\
.notice-success{background:#dff5e3}\
.notice-warning{background:#fff6d6}\
.notice-error{background:#fde2e2}\
fieldset{margin:1rem 0;border:1px solid #ddd}\
.remediation{white-space:pre-wrap}";

/// Render a full page.
pub fn page(page: &Page) -> String {
    let mut content = String::new();
    let _ = write!(content, "<h2>{}</h2>", html_escape(header(page.view)));

    // After a submission, notices belong under the score.
    let notices_after_score = matches!(
        &page.body,
        PageBody::TakeQuiz {
            result: Some(_),
            ..
        }
    );
    if !notices_after_score {
        render_notices(&mut content, &page.notices);
    }

    match &page.body {
        PageBody::Blocked => {}
        PageBody::Upload { current_file } => render_upload(&mut content, current_file.as_deref()),
        PageBody::GenerateQuiz { file_name, count } => {
            render_generate(&mut content, file_name, *count)
        }
        PageBody::TakeQuiz {
            items,
            selections,
            result,
        } => {
            render_quiz(&mut content, items, selections);
            if let Some(result) = result {
                render_result(&mut content, result, &page.notices);
            }
        }
    }

    if let Some(next) = page.next {
        let label = match next {
            View::Upload => "Upload Another PDF".to_string(),
            other => format!("Go to {}", other.title()),
        };
        let _ = write!(
            content,
            r#"<form method="get" action="/view/{}"><button type="submit">{}</button></form>"#,
            next.slug(),
            html_escape(&label)
        );
    }

    layout(page.view, &content)
}

/// Render an error for a failed request, keeping the sidebar usable.
pub fn error_page(view: View, message: &str) -> String {
    let mut content = String::new();
    let _ = write!(content, "<h2>{}</h2>", html_escape(header(view)));
    render_notices(&mut content, &[Notice::error(message)]);
    layout(view, &content)
}

fn header(view: View) -> &'static str {
    match view {
        View::Upload => "PDF Upload",
        View::GenerateQuiz => "Generate Quiz from PDF Content",
        View::TakeQuiz => "Take Quiz",
    }
}

fn layout(active: View, content: &str) -> String {
    let mut nav = String::new();
    for view in View::ALL {
        let class = if view == active { r#" class="active""# } else { "" };
        let _ = write!(
            nav,
            r#"<li><a href="/view/{}"{}>{}</a></li>"#,
            view.slug(),
            class,
            html_escape(view.title())
        );
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>{title}</title><style>{STYLE}</style></head>\
         <body><nav><h3>Choose a feature</h3><ul>{nav}</ul></nav>\
         <main><h1>{title}</h1>{content}</main></body></html>\n",
        title = APP_TITLE,
    )
}

fn render_notices(out: &mut String, notices: &[Notice]) {
    for notice in notices {
        let _ = write!(
            out,
            r#"<div class="notice notice-{}">{}</div>"#,
            notice.level.as_str(),
            html_escape(&notice.message)
        );
    }
}

fn render_upload(out: &mut String, current_file: Option<&str>) {
    if let Some(name) = current_file {
        let _ = write!(out, "<p>Current document: {}</p>", html_escape(name));
    }
    out.push_str(
        r#"<form method="post" action="/upload" enctype="multipart/form-data">"#,
    );
    out.push_str(
        r#"<label>Upload a PDF <input type="file" name="pdf" accept="application/pdf" required></label> "#,
    );
    out.push_str(r#"<button type="submit">Upload</button></form>"#);
}

fn render_generate(out: &mut String, file_name: &str, count: u32) {
    let _ = write!(out, "<p>Document: {}</p>", html_escape(file_name));
    let _ = write!(
        out,
        r#"<form method="post" action="/generate"><label>Number of questions <input type="number" name="count" min="1" max="10" value="{}"></label> <button type="submit">Generate Quiz</button></form>"#,
        count
    );
}

fn render_quiz(out: &mut String, items: &[QuizItem], selections: &[Option<String>]) {
    out.push_str(r#"<form method="post" action="/quiz">"#);
    for (idx, item) in items.iter().enumerate() {
        let selected = selections.get(idx).and_then(|s| s.as_deref());
        let _ = write!(
            out,
            "<fieldset><legend>Question {}: {}</legend><p>Choose an answer:</p>",
            idx + 1,
            html_escape(&item.question)
        );
        for option in &item.options {
            let checked = if selected == Some(option.as_str()) {
                " checked"
            } else {
                ""
            };
            let _ = write!(
                out,
                r#"<label><input type="radio" name="q_{}" value="{}"{}> {}</label><br>"#,
                idx,
                html_escape(option),
                checked,
                html_escape(option)
            );
        }
        out.push_str("</fieldset>");
    }
    out.push_str(r#"<button type="submit">Submit Answers</button></form>"#);
}

fn render_result(out: &mut String, result: &QuizResult, notices: &[Notice]) {
    let report = &result.report;
    let _ = write!(
        out,
        r#"<section class="result"><p><strong>{}</strong></p>"#,
        html_escape(&score_message(report.score, report.total))
    );
    for record in &report.records {
        let _ = write!(
            out,
            "<p>Q: {}<br>Your answer: {}<br>Correct answer: {}</p><hr>",
            html_escape(&record.question),
            html_escape(&record.user_answer),
            html_escape(&record.correct_answer)
        );
    }
    render_notices(out, notices);
    if let Some(text) = &result.remediation {
        let _ = write!(
            out,
            r#"<h3>{}</h3><div class="remediation">{}</div>"#,
            REMEDIATION_HEADING,
            html_escape(text)
        );
    }
    out.push_str("</section>");
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
