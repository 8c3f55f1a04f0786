use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use sift_service::{
	AutocompleteRequest, AutocompleteResponse, Error as ServiceError, ItemsRequest, ItemsResponse,
	SearchMode, SearchRequest, SearchResponse, SimilarMode, SimilarRequest, SimilarResponse,
};

#[derive(Debug, Deserialize)]
struct AutocompleteParams {
	#[serde(default)]
	query: String,
}

#[derive(Debug, Deserialize)]
struct SimilarParams {
	#[serde(default)]
	mode: SimilarMode,
	count: Option<u32>,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/tenants/{tenant}/search", post(search))
		.route("/v1/tenants/{tenant}/autocomplete", get(autocomplete))
		.route("/v1/tenants/{tenant}/similar/{item_id}", get(similar))
		.route("/v1/tenants/{tenant}/items", post(items))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	Path(tenant): Path<String>,
	Json(mut payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	payload.tenant_id = tenant;

	let wants_embedding = matches!(payload.mode, SearchMode::Semantic | SearchMode::Hybrid);

	if wants_embedding
		&& payload.query_embedding.is_none()
		&& !payload.query.trim().is_empty()
		&& let Some(embedder) = state.embedder.as_ref()
	{
		let texts = vec![payload.query.trim().to_string()];
		let vectors = embedder.embed(&texts).await.map_err(provider_error)?;

		payload.query_embedding = vectors.into_iter().next();
	}

	let response = state.service.search(payload).await?;

	Ok(Json(response))
}

async fn autocomplete(
	State(state): State<AppState>,
	Path(tenant): Path<String>,
	Query(params): Query<AutocompleteParams>,
) -> Result<Json<AutocompleteResponse>, ApiError> {
	let response = state
		.service
		.autocomplete(AutocompleteRequest { tenant_id: tenant, query: params.query })
		.await?;

	Ok(Json(response))
}

async fn similar(
	State(state): State<AppState>,
	Path((tenant, item_id)): Path<(String, String)>,
	Query(params): Query<SimilarParams>,
) -> Result<Json<SimilarResponse>, ApiError> {
	let response = state
		.service
		.similar(SimilarRequest {
			tenant_id: tenant,
			item_id,
			mode: params.mode,
			count: params.count,
		})
		.await?;

	Ok(Json(response))
}

async fn items(
	State(state): State<AppState>,
	Path(tenant): Path<String>,
	Json(mut payload): Json<ItemsRequest>,
) -> Result<Json<ItemsResponse>, ApiError> {
	payload.tenant_id = tenant;

	let response = state.service.fetch_items(payload).await?;

	Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let message = err.to_string();

		match err {
			ServiceError::UnknownField { allowed, .. } =>
				json_error(StatusCode::BAD_REQUEST, "unknown_field", message, Some(allowed)),
			ServiceError::TypeMismatch { path, .. } =>
				json_error(StatusCode::BAD_REQUEST, "type_mismatch", message, Some(vec![path])),
			ServiceError::InvalidRequest { .. } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message, None),
			ServiceError::UnknownTenant { .. } =>
				json_error(StatusCode::NOT_FOUND, "unknown_tenant", message, None),
			ServiceError::ReferenceNotFound { .. } =>
				json_error(StatusCode::NOT_FOUND, "reference_not_found", message, None),
			ServiceError::BackendTimeout { .. } => {
				tracing::error!(error = %message, "Search backend timed out.");

				json_error(StatusCode::GATEWAY_TIMEOUT, "backend_timeout", message, None)
			},
			ServiceError::BackendUnavailable { .. } => {
				tracing::error!(error = %message, "Search backend unavailable.");

				json_error(StatusCode::SERVICE_UNAVAILABLE, "backend_unavailable", message, None)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

fn provider_error(err: sift_providers::Error) -> ApiError {
	tracing::error!(error = %err, "Embedding provider failed.");

	json_error(StatusCode::BAD_GATEWAY, "provider_error", err.to_string(), None)
}
