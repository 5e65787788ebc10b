use std::sync::Arc;

use shuttle_axum::axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::analyze::ScoredRecord;
use crate::metrics::Metrics;
use crate::report::{render_html, ReportDocument};
use crate::view::{reduce, visible, FilterState, ViewAction};

/// The finished report, shared read-only by every request.
#[derive(Clone)]
pub struct AppState {
    doc: Arc<ReportDocument>,
    html: Arc<String>,
}

impl AppState {
    /// Renders the page once up front.
    pub fn new(doc: ReportDocument) -> anyhow::Result<Self> {
        let html = render_html(&doc)?;
        Ok(Self {
            doc: Arc::new(doc),
            html: Arc::new(html),
        })
    }

    pub fn document(&self) -> &ReportDocument {
        &self.doc
    }
}

/// Routes over a built report. `/metrics` is mounted when a recorder is given.
pub fn router(state: AppState, metrics: Option<&Metrics>) -> Router {
    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/report", get(report_html))
        .route("/report.json", get(report_json))
        .route("/report/global", get(report_global))
        .route("/view", post(view))
        .layer(CorsLayer::very_permissive())
        .with_state(state);
    match metrics {
        Some(m) => app.merge(m.router()),
        None => app,
    }
}

async fn report_html(State(state): State<AppState>) -> Html<String> {
    Html(state.html.as_ref().clone())
}

async fn report_json(State(state): State<AppState>) -> Json<ReportDocument> {
    Json(state.doc.as_ref().clone())
}

async fn report_global(State(state): State<AppState>) -> Json<Vec<ScoredRecord>> {
    Json(state.doc.global_ranking().into_iter().cloned().collect())
}

#[derive(Debug, serde::Deserialize)]
struct ViewReq {
    #[serde(default)]
    actions: Vec<ViewAction>,
}

#[derive(Debug, serde::Serialize)]
struct ViewResp {
    state: FilterState,
    records: Vec<ScoredRecord>,
}

/// Replays `actions` from the initial state and returns the visible list.
async fn view(
    State(state): State<AppState>,
    Json(body): Json<ViewReq>,
) -> Result<Json<ViewResp>, (StatusCode, String)> {
    if body.actions.len() > 1_000 {
        return Err((StatusCode::PAYLOAD_TOO_LARGE, "too many actions".into()));
    }
    let doc = state.doc.as_ref();
    let fs = body
        .actions
        .iter()
        .fold(FilterState::initial(doc), reduce);
    let records = visible(doc, &fs).into_iter().cloned().collect();
    tracing::debug!(actions = body.actions.len(), category = ?fs.active_category, "view computed");
    Ok(Json(ViewResp { state: fs, records }))
}
