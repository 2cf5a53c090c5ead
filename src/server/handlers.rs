use crate::error::ApiError;
use crate::scanner::{ClientMessage, ClientSink, ScanSession};
use crate::server::{ws, AppState};
use crate::types::TargetRecord;
use axum::{
    body::Bytes,
    extract::{ws::WebSocket, State, WebSocketUpgrade},
    response::{Json, Response},
};
use serde::Deserialize;
use serde_json::{json, Value};

/// Body of `POST /parse`.
#[derive(Debug, Deserialize)]
pub struct TargetBatch {
    pub targets: Vec<String>,
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Hello World!" }))
}

/// Expand and store a batch, answering with every stored target.
pub async fn parse_targets(
    State(app_state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<TargetRecord>>, ApiError> {
    let batch: TargetBatch =
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidJson(e.to_string()))?;
    let targets = app_state.pipeline.process(&batch.targets).await?;
    Ok(Json(targets))
}

pub async fn ws_scan(State(app_state): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
    upgrade.on_upgrade(move |socket| run_scan(socket, app_state))
}

/// Stream a scan of the current target list over an upgraded socket.
async fn run_scan(socket: WebSocket, app_state: AppState) {
    let (mut sink, events) = ws::split(socket);

    let targets = match app_state.store.list_all().await {
        Ok(targets) => targets,
        Err(e) => {
            tracing::error!(error = %e, "failed to load targets for scan");
            if let Err(e) = sink
                .send(ClientMessage::Error("Failed to retrieve targets from database".into()))
                .await
            {
                tracing::debug!(error = %e, "could not report load failure");
            }
            sink.close().await;
            return;
        }
    };

    let session = ScanSession::from_settings(&app_state.settings);
    tracing::info!(session = %session.id(), targets = targets.len(), "starting scan session");
    session.run(targets, sink, events).await;
}
