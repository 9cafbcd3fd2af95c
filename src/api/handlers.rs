use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{
        State,
        rejection::{FormRejection, JsonRejection},
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::page::{self, PageView};
use super::{AppState, ServiceInfo};
use crate::engine::{SolveOutcome, SolveRequest};
use crate::error::SolveError;
use crate::task::TaskType;

/// Body of `POST /api/solve`.
#[derive(Debug, Deserialize)]
pub struct ApiSolveRequest {
    pub task_type: String,
    #[serde(alias = "problem")]
    pub question: String,
    #[serde(default)]
    pub max_attempts: Option<usize>,
}

/// Body of a successful `POST /api/solve`.
#[derive(Debug, Serialize)]
pub struct SolveResponse {
    #[serde(flatten)]
    pub outcome: SolveOutcome,
    pub meta: ServiceInfo,
}

/// A [`SolveError`] rendered as a JSON error response.
#[derive(Debug)]
pub struct ApiError(pub SolveError);

impl From<SolveError> for ApiError {
    fn from(err: SolveError) -> Self {
        Self(err)
    }
}

fn status_for(err: &SolveError) -> StatusCode {
    match err {
        SolveError::UnsupportedTaskType(_) | SolveError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        SolveError::BackendUnavailable(_) | SolveError::BackendTimeout(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::warn!("solve failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SolveForm {
    task_type: String,
    #[serde(alias = "problem")]
    question: String,
}

pub(super) async fn index() -> Html<String> {
    Html(page::render(&PageView::default()))
}

pub(super) async fn solve_form(
    State(state): State<Arc<AppState>>,
    form: Result<Form<SolveForm>, FormRejection>,
) -> (StatusCode, Html<String>) {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            let view = PageView {
                error: Some(format!("invalid form: {}", rejection.body_text())),
                ..PageView::default()
            };
            return (StatusCode::BAD_REQUEST, Html(page::render(&view)));
        }
    };
    let result = match SolveRequest::from_parts(&form.task_type, form.question.clone()) {
        Ok(request) => state.engine.solve(&request).await,
        Err(e) => Err(e),
    };

    let mut view = PageView {
        task_type: form.task_type.parse().ok(),
        question: form.question,
        ..PageView::default()
    };
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => status_for(e),
    };
    match result {
        Ok(outcome) => view.outcome = Some(outcome),
        Err(e) => view.error = Some(e.to_string()),
    }

    (status, Html(page::render(&view)))
}

pub(super) async fn solve_json(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ApiSolveRequest>, JsonRejection>,
) -> Result<Json<SolveResponse>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        SolveError::InvalidRequest(format!("malformed body: {}", rejection.body_text()))
    })?;
    let mut request = SolveRequest::from_parts(&body.task_type, body.question)?;
    if let Some(n) = body.max_attempts {
        request = request.with_max_attempts(n);
    }

    let outcome = state.engine.solve(&request).await?;
    let meta = ServiceInfo {
        max_attempts: request.max_attempts.unwrap_or(state.info.max_attempts),
        ..state.info.clone()
    };
    Ok(Json(SolveResponse { outcome, meta }))
}

#[derive(Serialize)]
pub(super) struct TaskTypeInfo {
    name: TaskType,
    label: &'static str,
    fields: Vec<FieldInfo>,
    example: serde_json::Value,
}

#[derive(Serialize)]
struct FieldInfo {
    name: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
}

pub(super) async fn task_types() -> Json<Vec<TaskTypeInfo>> {
    let types = TaskType::ALL
        .into_iter()
        .map(|t| TaskTypeInfo {
            name: t,
            label: t.label(),
            fields: t
                .fields()
                .iter()
                .map(|&(name, kind)| FieldInfo { name, kind })
                .collect(),
            example: serde_json::from_str(t.example()).unwrap_or_default(),
        })
        .collect();
    Json(types)
}

pub(super) async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "model": state.info.model,
        "verifier_model": state.info.verifier_model,
        "max_attempts": state.info.max_attempts,
    }))
}
