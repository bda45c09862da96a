//! Data source selection endpoints

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    services::Notice,
    session::DataSource,
};

use super::SessionId;

#[derive(Serialize, ToSchema)]
pub struct DataSourceStatus {
    /// Backend currently serving this session
    pub current: DataSource,
    /// Backend the session could switch to
    pub alternate: DataSource,
    /// Whether the document backend is enabled in this deployment
    pub document_backend_available: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct SwitchSourceRequest {
    /// Requested backend: "sql" or "mongo"
    pub source: String,
}

#[derive(Serialize, ToSchema)]
pub struct SwitchSourceResponse {
    pub current: DataSource,
    pub notices: Vec<Notice>,
}

/// Report the session's active data source
#[utoipa::path(
    get,
    path = "/data-source",
    tag = "sources",
    responses(
        (status = 200, description = "Active data source for this session", body = DataSourceStatus)
    )
)]
pub async fn get_data_source(
    State(state): State<crate::AppState>,
    SessionId(session_id): SessionId,
) -> Json<DataSourceStatus> {
    let current = state.services.library.active_source(&session_id);
    Json(DataSourceStatus {
        current,
        alternate: current.other(),
        document_backend_available: state.services.library.document_backend_available(),
    })
}

/// Switch the session's active data source
#[utoipa::path(
    post,
    path = "/data-source",
    tag = "sources",
    request_body = SwitchSourceRequest,
    responses(
        (status = 200, description = "Source switched (or refusal notice)", body = SwitchSourceResponse),
        (status = 400, description = "Unrecognized source value")
    )
)]
pub async fn switch_data_source(
    State(state): State<crate::AppState>,
    SessionId(session_id): SessionId,
    Json(request): Json<SwitchSourceRequest>,
) -> AppResult<Json<SwitchSourceResponse>> {
    let requested = DataSource::parse(&request.source).ok_or_else(|| {
        AppError::Validation(format!("Fuente de datos desconocida: '{}'.", request.source))
    })?;
    let outcome = state.services.library.switch_source(&session_id, requested);
    Ok(Json(SwitchSourceResponse {
        current: outcome.data,
        notices: outcome.notices,
    }))
}
