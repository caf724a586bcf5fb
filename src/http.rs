//! HTTP surface over [`LedgerService`]
//!
//! Handlers parse the body, hand the call to the blocking pool and map
//! [`LedgerError`] onto a status code with a `{"detail": ...}` body.
use crate::error::LedgerError;
use crate::service::LedgerService;
use crate::types::{Claim, Policy, Policyholder};
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    ledger: Arc<LedgerService>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PolicyholderBody {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PolicyBody {
    pub coverage: f64,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimBody {
    pub amount: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimStatusBody {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        if !err.is_client_error() {
            tracing::error!(error = %err, "ledger operation failed");
            return Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail: err.to_string(),
            };
        }
        let status = match &err {
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                detail: self.detail,
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn router(ledger: Arc<LedgerService>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/policyholders", post(create_policyholder))
        .route("/policyholders/", post(create_policyholder))
        .route(
            "/policyholders/{policyholder_id}",
            get(get_policyholder)
                .put(update_policyholder)
                .delete(delete_policyholder),
        )
        .route(
            "/policyholders/{policyholder_id}/policies",
            get(list_policies).post(create_policy),
        )
        .route(
            "/policyholders/{policyholder_id}/policies/",
            get(list_policies).post(create_policy),
        )
        .route(
            "/policyholders/{policyholder_id}/policies/{policy_id}",
            get(get_policy).put(update_policy).delete(delete_policy),
        )
        .route(
            "/policyholders/{policyholder_id}/claims/{policy_id}",
            get(list_claims).post(create_claim),
        )
        .route(
            "/policyholders/{policyholder_id}/claims/{policy_id}/{claim_id}",
            get(get_claim).put(update_claim_status).delete(delete_claim),
        )
        .with_state(AppState { ledger })
}

// Store calls block on disk I/O, so they run off the async workers.
async fn run<T, F>(state: AppState, op: F) -> ApiResult<T>
where
    F: FnOnce(&LedgerService) -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let ledger = state.ledger;
    let outcome = tokio::task::spawn_blocking(move || op(&*ledger))
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "ledger task did not complete");
            ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail: "ledger task did not complete".to_string(),
            }
        })?;
    outcome.map(Json).map_err(ApiError::from)
}

fn message(text: String) -> MessageBody {
    MessageBody { message: text }
}

async fn root() -> Json<MessageBody> {
    Json(message("Service is running".to_string()))
}

async fn create_policyholder(
    State(state): State<AppState>,
    payload: Result<Json<PolicyholderBody>, JsonRejection>,
) -> ApiResult<Policyholder> {
    let Json(body) = payload?;
    run(state, move |ledger| {
        ledger.create_policyholder(body.name, body.email)
    })
    .await
}

async fn get_policyholder(
    State(state): State<AppState>,
    path: Result<Path<u32>, PathRejection>,
) -> ApiResult<Policyholder> {
    let Path(policyholder_id) = path?;
    run(state, move |ledger| ledger.get_policyholder(policyholder_id)).await
}

async fn update_policyholder(
    State(state): State<AppState>,
    path: Result<Path<u32>, PathRejection>,
    payload: Result<Json<PolicyholderBody>, JsonRejection>,
) -> ApiResult<Policyholder> {
    let Path(policyholder_id) = path?;
    let Json(body) = payload?;
    run(state, move |ledger| {
        ledger.update_policyholder(policyholder_id, body.name, body.email)
    })
    .await
}

async fn delete_policyholder(
    State(state): State<AppState>,
    path: Result<Path<u32>, PathRejection>,
) -> ApiResult<MessageBody> {
    let Path(policyholder_id) = path?;
    run(state, move |ledger| {
        ledger.delete_policyholder(policyholder_id).map(message)
    })
    .await
}

async fn create_policy(
    State(state): State<AppState>,
    path: Result<Path<u32>, PathRejection>,
    payload: Result<Json<PolicyBody>, JsonRejection>,
) -> ApiResult<Policy> {
    let Path(policyholder_id) = path?;
    let Json(body) = payload?;
    run(state, move |ledger| {
        ledger.create_policy(policyholder_id, body.coverage, body.status)
    })
    .await
}

async fn list_policies(
    State(state): State<AppState>,
    path: Result<Path<u32>, PathRejection>,
) -> ApiResult<Vec<Policy>> {
    let Path(policyholder_id) = path?;
    run(state, move |ledger| ledger.list_policies(policyholder_id)).await
}

async fn get_policy(
    State(state): State<AppState>,
    path: Result<Path<(u32, u32)>, PathRejection>,
) -> ApiResult<Policy> {
    let Path((policyholder_id, policy_id)) = path?;
    run(state, move |ledger| ledger.get_policy(policyholder_id, policy_id)).await
}

async fn update_policy(
    State(state): State<AppState>,
    path: Result<Path<(u32, u32)>, PathRejection>,
    payload: Result<Json<PolicyBody>, JsonRejection>,
) -> ApiResult<Policy> {
    let Path((policyholder_id, policy_id)) = path?;
    let Json(body) = payload?;
    run(state, move |ledger| {
        ledger.update_policy(policyholder_id, policy_id, body.coverage, body.status)
    })
    .await
}

async fn delete_policy(
    State(state): State<AppState>,
    path: Result<Path<(u32, u32)>, PathRejection>,
) -> ApiResult<MessageBody> {
    let Path((policyholder_id, policy_id)) = path?;
    run(state, move |ledger| {
        ledger.delete_policy(policyholder_id, policy_id).map(message)
    })
    .await
}

async fn create_claim(
    State(state): State<AppState>,
    path: Result<Path<(u32, u32)>, PathRejection>,
    payload: Result<Json<ClaimBody>, JsonRejection>,
) -> ApiResult<Claim> {
    let Path((policyholder_id, policy_id)) = path?;
    let Json(body) = payload?;
    run(state, move |ledger| {
        ledger.create_claim(policyholder_id, policy_id, body.amount)
    })
    .await
}

async fn list_claims(
    State(state): State<AppState>,
    path: Result<Path<(u32, u32)>, PathRejection>,
) -> ApiResult<Vec<Claim>> {
    let Path((policyholder_id, policy_id)) = path?;
    run(state, move |ledger| ledger.list_claims(policyholder_id, policy_id)).await
}

async fn get_claim(
    State(state): State<AppState>,
    path: Result<Path<(u32, u32, u32)>, PathRejection>,
) -> ApiResult<Claim> {
    let Path((policyholder_id, policy_id, claim_id)) = path?;
    run(state, move |ledger| {
        ledger.get_claim(policyholder_id, policy_id, claim_id)
    })
    .await
}

async fn update_claim_status(
    State(state): State<AppState>,
    path: Result<Path<(u32, u32, u32)>, PathRejection>,
    payload: Result<Json<ClaimStatusBody>, JsonRejection>,
) -> ApiResult<Claim> {
    let Path((policyholder_id, policy_id, claim_id)) = path?;
    let Json(body) = payload?;
    run(state, move |ledger| {
        ledger.update_claim_status(policyholder_id, policy_id, claim_id, body.status)
    })
    .await
}

async fn delete_claim(
    State(state): State<AppState>,
    path: Result<Path<(u32, u32, u32)>, PathRejection>,
) -> ApiResult<MessageBody> {
    let Path((policyholder_id, policy_id, claim_id)) = path?;
    run(state, move |ledger| {
        ledger
            .delete_claim(policyholder_id, policy_id, claim_id)
            .map(message)
    })
    .await
}
