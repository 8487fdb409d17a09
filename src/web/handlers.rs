//! Request handlers. Each one resolves the caller's session, applies a
//! single wizard action under the session lock and renders the result.

use std::collections::HashMap;

use axum::extract::{Form, Multipart, Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use uuid::Uuid;

use super::{AppState, render, session_cookie, session_id_from_headers};
use crate::error::{Error, MediaError};
use crate::session::{Session, SessionHandle, View};
use crate::wizard::{Action, Notice};

/// Multipart field carrying the PDF.
const UPLOAD_FIELD: &str = "pdf";
const MSG_NO_FILE: &str = "Please choose a PDF file to upload.";

/// Upper bound on question indices accepted from a submission.
const MAX_SUBMITTED_ANSWERS: usize = 64;

#[derive(Debug, Deserialize)]
pub(super) struct GenerateForm {
    #[serde(default)]
    count: String,
}

pub(super) async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (id, handle) = state.sessions.resolve(session_id_from_headers(&headers)).await;
    let mut session = handle.lock().await;
    session.touch();
    let page = state.controller.show(&session);
    respond(Some(id), StatusCode::OK, render::page(&page))
}

pub(super) async fn show_view(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Response {
    match View::from_slug(&slug) {
        Ok(view) => dispatch(&state, &headers, Action::Show(view)).await,
        Err(e) => reject(&state, &headers, Error::from(e)).await,
    }
}

pub(super) async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    match read_upload(multipart).await {
        Ok(Some((file_name, bytes))) => {
            dispatch(&state, &headers, Action::Upload { file_name, bytes }).await
        }
        Ok(None) => {
            let (id, page) = match existing_session(&state, &headers).await {
                Some((id, handle)) => {
                    let mut session = handle.lock().await;
                    session.view = View::Upload;
                    (Some(id), state.controller.show(&session))
                }
                None => (None, state.controller.show(&Session::new())),
            };
            let page = page.with_notice(Notice::warning(MSG_NO_FILE));
            respond(id, StatusCode::BAD_REQUEST, render::page(&page))
        }
        Err((status, message)) => {
            tracing::warn!(%status, "Rejected upload: {}", message);
            let id = existing_session(&state, &headers).await.map(|(id, _)| id);
            respond(id, status, render::error_page(View::Upload, &message))
        }
    }
}

pub(super) async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<GenerateForm>,
) -> Response {
    // Anything unparsable is out of range and gets the controller's warning.
    let count = form.count.trim().parse::<i64>().unwrap_or(0);
    dispatch(&state, &headers, Action::Generate { count }).await
}

pub(super) async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let selections = parse_selections(&fields);
    dispatch(&state, &headers, Action::Submit { selections }).await
}

pub(super) async fn health() -> &'static str {
    "ok"
}

async fn dispatch(state: &AppState, headers: &HeaderMap, action: Action) -> Response {
    let requested = session_id_from_headers(headers);
    let (id, handle) = state.sessions.resolve(requested).await;
    let created = requested != Some(id);
    let mut session = handle.lock().await;
    let view = session.view;

    match state.controller.handle(&mut session, action).await {
        Ok(page) => respond(Some(id), StatusCode::OK, render::page(&page)),
        Err(e) => {
            drop(session);
            // A failed first request leaves nothing behind.
            if created {
                state.sessions.remove(id).await;
            }
            log_rejection(Some(id), &e);
            let id = (!created).then_some(id);
            respond(id, error_status(&e), render::error_page(view, &e.to_string()))
        }
    }
}

/// Render an error page without creating a session for the caller.
async fn reject(state: &AppState, headers: &HeaderMap, err: Error) -> Response {
    let existing = existing_session(state, headers).await;
    let (id, view) = match &existing {
        Some((id, handle)) => (Some(*id), handle.lock().await.view),
        None => (None, View::Upload),
    };
    log_rejection(id, &err);
    respond(id, error_status(&err), render::error_page(view, &err.to_string()))
}

/// The session named by the request cookie, if it is still live.
async fn existing_session(state: &AppState, headers: &HeaderMap) -> Option<(Uuid, SessionHandle)> {
    let id = session_id_from_headers(headers)?;
    state.sessions.get(id).await.map(|handle| (id, handle))
}

fn log_rejection(id: Option<Uuid>, err: &Error) {
    let session = id.map(|id| id.to_string()).unwrap_or_default();
    if error_status(err).is_server_error() {
        tracing::error!(%session, error = %err, "Request failed");
    } else {
        tracing::warn!(%session, error = %err, "Request rejected");
    }
}

/// Pull the PDF part out of the form. `Ok(None)` means no file was chosen.
async fn read_upload(
    mut multipart: Multipart,
) -> Result<Option<(String, Vec<u8>)>, (StatusCode, String)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (e.status(), e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| (e.status(), e.body_text()))?;
        if file_name.is_empty() && bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some((file_name, bytes.to_vec())));
    }
    Ok(None)
}

/// Collect `q_<index>` fields into per-question selections.
fn parse_selections(fields: &HashMap<String, String>) -> Vec<Option<String>> {
    let mut selections: Vec<Option<String>> = Vec::new();
    for (name, value) in fields {
        let Some(idx) = name
            .strip_prefix("q_")
            .and_then(|i| i.parse::<usize>().ok())
        else {
            continue;
        };
        if idx >= MAX_SUBMITTED_ANSWERS {
            continue;
        }
        if selections.len() <= idx {
            selections.resize(idx + 1, None);
        }
        selections[idx] = Some(value.clone());
    }
    selections
}

fn error_status(err: &Error) -> StatusCode {
    match err {
        Error::Media(MediaError::UnsupportedType { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Media(MediaError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
        Error::Session(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Build the HTML response, refreshing the cookie when there is a session.
fn respond(id: Option<Uuid>, status: StatusCode, html: String) -> Response {
    let mut response = (status, Html(html)).into_response();
    if let Some(id) = id
        && let Ok(cookie) = HeaderValue::from_str(&session_cookie(id))
    {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}
