use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use audiovault_core::health::HealthReport;
use audiovault_core::ingest::{CreateRequest, IngestError, ValidationError};

use crate::AppState;

/// Sent with every 200 from `/create`. The wording is deliberate: the audio
/// has been accepted, not yet stored.
pub const ACCEPTED_MESSAGE: &str = "Audio accepted for storage";

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateResponse {
    pub message: String,
    pub id: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub health: HealthReport,
}

pub async fn create(State(state): State<AppState>, body: Bytes) -> Response {
    info!("/create endpoint hit");

    let request: CreateRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "Error in /create");
            state
                .coordinator
                .pipeline()
                .report_unexpected_failure(None)
                .await;
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Failed to store audio")),
            )
                .into_response();
        }
    };

    match state.coordinator.submit(request).await {
        Ok(accepted) => (
            StatusCode::OK,
            Json(CreateResponse {
                message: ACCEPTED_MESSAGE.to_string(),
                id: accepted.id,
            }),
        )
            .into_response(),
        Err(IngestError::Validation(ValidationError::MissingFields(missing))) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                missing: Some(missing.into_iter().map(String::from).collect()),
                ..ErrorResponse::new("Missing required fields")
            }),
        )
            .into_response(),
        Err(IngestError::Validation(ValidationError::InvalidPayload(details))) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                details: Some(details),
                ..ErrorResponse::new("Invalid audioBase64 payload")
            }),
        )
            .into_response(),
        Err(IngestError::Rejected(e)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new(e.to_string())),
        )
            .into_response(),
    }
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let health = state.prober.probe().await;
    Json(HealthResponse {
        status: "okay".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        health,
    })
}
