use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;
use vigil_domain::leaderboard::Period;
use vigil_domain::scope::{Caller, Role};
use vigil_service::users::UserListParams;
use vigil_service::{
    AnalyticsOverview, CommentView, CreateCommentRequest, CreateVulnerability,
    Error as ServiceError, LeaderboardResponse, ListParams, ListUsersResponse,
    ListVulnerabilitiesResponse, UpdateCommentRequest, UpdateVulnerability, UserProfile,
    UserStats, VulnerabilityDetail,
};

pub const USER_ID_HEADER: &str = "x-vigil-user-id";
pub const ROLE_HEADER: &str = "x-vigil-role";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/vulnerabilities", get(list_vulnerabilities).post(create_vulnerability))
        .route(
            "/v1/vulnerabilities/{id}",
            get(get_vulnerability).put(update_vulnerability).delete(delete_vulnerability),
        )
        .route("/v1/vulnerabilities/analytics/overview", get(analytics_overview))
        .route("/v1/comments/vulnerability/{id}", get(list_comments))
        .route("/v1/comments", post(create_comment))
        .route("/v1/comments/{id}", put(update_comment).delete(delete_comment))
        .route("/v1/users", get(list_users))
        .route("/v1/users/profile", get(user_profile))
        .route("/v1/users/stats", get(user_stats))
        .route("/v1/users/leaderboard", get(leaderboard))
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn list_vulnerabilities(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<ListVulnerabilitiesResponse>, ApiError> {
    let caller = caller_from(&headers)?;
    let response = state.service.list_vulnerabilities(&caller, &params).await?;
    Ok(Json(response))
}

async fn create_vulnerability(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateVulnerability>,
) -> Result<(StatusCode, Json<VulnerabilityDetail>), ApiError> {
    let caller = caller_from(&headers)?;
    let response = state.service.create_vulnerability(&caller, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn get_vulnerability(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<VulnerabilityDetail>, ApiError> {
    let caller = caller_from(&headers)?;
    let response = state.service.get_vulnerability(&caller, id).await?;
    Ok(Json(response))
}

async fn update_vulnerability(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVulnerability>,
) -> Result<Json<VulnerabilityDetail>, ApiError> {
    let caller = caller_from(&headers)?;
    let response = state.service.update_vulnerability(&caller, id, payload).await?;
    Ok(Json(response))
}

async fn delete_vulnerability(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let caller = caller_from(&headers)?;
    state.service.delete_vulnerability(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn analytics_overview(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AnalyticsOverview>, ApiError> {
    let caller = caller_from(&headers)?;
    let response = state.service.analytics_overview(&caller).await?;
    Ok(Json(response))
}

async fn list_comments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    let caller = caller_from(&headers)?;
    let response = state.service.list_comments(&caller, id).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCommentBody {
    vulnerability_id: Uuid,
    content: String,
}

async fn create_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateCommentBody>,
) -> Result<(StatusCode, Json<CommentView>), ApiError> {
    let caller = caller_from(&headers)?;
    let request = CreateCommentRequest { content: payload.content };
    let response = state.service.create_comment(&caller, payload.vulnerability_id, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn update_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<CommentView>, ApiError> {
    let caller = caller_from(&headers)?;
    let response = state.service.update_comment(&caller, id, payload).await?;
    Ok(Json(response))
}

async fn delete_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let caller = caller_from(&headers)?;
    state.service.delete_comment(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<UserListParams>,
) -> Result<Json<ListUsersResponse>, ApiError> {
    let caller = caller_from(&headers)?;
    let response = state.service.list_users(&caller, &params).await?;
    Ok(Json(response))
}

async fn user_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserProfile>, ApiError> {
    let caller = caller_from(&headers)?;
    let response = state.service.user_profile(&caller).await?;
    Ok(Json(response))
}

async fn user_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserStats>, ApiError> {
    let caller = caller_from(&headers)?;
    let response = state.service.user_stats(&caller).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct LeaderboardParams {
    period: Option<String>,
}

async fn leaderboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let caller = caller_from(&headers)?;
    let period = Period::parse(params.period.as_deref().unwrap_or("all"));
    let response = state.service.leaderboard(&caller, period).await?;
    Ok(Json(response))
}

/// The API trusts an upstream authenticator; identity arrives as headers.
fn caller_from(headers: &HeaderMap) -> Result<Caller, ApiError> {
    let unauthenticated = || {
        json_error(
            StatusCode::UNAUTHORIZED,
            "UNAUTHENTICATED",
            "Missing or invalid identity headers.",
        )
    };
    let id = headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())
        .ok_or_else(unauthenticated)?;
    let role = headers
        .get(ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(Role::parse)
        .ok_or_else(unauthenticated)?;

    Ok(Caller { id, role })
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error_code: String,
    message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error_code: String,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
    ApiError::new(status, code, message)
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unauthenticated { message } => {
                json_error(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", message)
            }
            ServiceError::InvalidParameter { message } => {
                json_error(StatusCode::BAD_REQUEST, "INVALID_PARAMETER", message)
            }
            ServiceError::ScopeDenied { message } => {
                json_error(StatusCode::FORBIDDEN, "SCOPE_DENIED", message)
            }
            ServiceError::NotFound { message } => {
                json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message)
            }
            ServiceError::Storage { message } => {
                tracing::error!(%message, "Storage failure.");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE", "Internal error.")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error_code: self.error_code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
