//! Dream journal endpoints. Every route here sits behind the auth guard,
//! and every repository call is scoped to the authenticated owner.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::Principal;
use crate::domain::{Dream, DreamId, DreamStats, NewDream, UpdateDream};
use crate::errors::Error;

const DEFAULT_PER_PAGE: i64 = 10;
const MAX_PER_PAGE: i64 = 50;
const RATE_WINDOW_SECONDS: u64 = 3_600;

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateDreamBody {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
    pub date_dreamed: NaiveDate,
    #[validate(length(max = 50))]
    pub mood: Option<String>,
    #[serde(default)]
    pub is_lucid: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Dreams are private unless the caller opts out.
    #[serde(default = "default_private")]
    pub is_private: bool,
}

fn default_private() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateDreamBody {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "content cannot be empty"))]
    pub content: Option<String>,
    pub date_dreamed: Option<NaiveDate>,
    /// Absent leaves the mood unchanged, an explicit `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub mood: Option<Option<String>>,
    pub is_lucid: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub is_private: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ListDreamsQuery {
    /// 1-based page number
    pub page: Option<i64>,
    /// Page size, capped at 50
    pub per_page: Option<i64>,
    /// Filter over title, content, and tags
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct SearchDreamsQuery {
    /// Search term over title, content, and tags
    pub q: String,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DreamListResponse {
    pub dreams: Vec<Dream>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

/// Deserializes a field so that an absent key stays `None` while an
/// explicit `null` becomes `Some(None)`.
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

fn page_bounds(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    (page, per_page)
}

/// Row offset for a page. Saturates so an absurd page number walks off
/// the end of the data instead of overflowing.
fn page_offset(page: i64, per_page: i64) -> i64 {
    (page - 1).saturating_mul(per_page)
}

fn list_response(dreams: Vec<Dream>, total: i64, page: i64, per_page: i64) -> DreamListResponse {
    let total_pages = if total == 0 { 0 } else { (total + per_page - 1) / per_page };
    DreamListResponse { dreams, total, page, per_page, total_pages }
}

fn check_rate(
    state: &ApiState,
    principal: &Principal,
    action: &str,
    limit: u32,
) -> Result<(), ApiError> {
    state
        .rate_limiter
        .allow(principal.user_id.as_str(), action, limit, RATE_WINDOW_SECONDS)
        .map_err(|retry_after| {
            ApiError::from(Error::rate_limited(
                format!("Too many {action} requests, slow down"),
                retry_after,
            ))
        })
}

#[utoipa::path(
    post,
    path = "/api/dreams",
    request_body = CreateDreamBody,
    responses(
        (status = 201, description = "Dream recorded", body = Dream),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Not authenticated"),
        (status = 429, description = "Too many dreams recorded this hour")
    ),
    security(("bearerAuth" = [])),
    tag = "dreams"
)]
pub async fn create_dream_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateDreamBody>,
) -> Result<(StatusCode, Json<Dream>), ApiError> {
    check_rate(&state, &principal, "create_dream", state.limits.create_dream_per_hour)?;
    body.validate().map_err(Error::from)?;

    let dream = state
        .dreams
        .create(NewDream {
            id: DreamId::new(),
            user_id: principal.user_id.clone(),
            title: body.title,
            content: body.content,
            date_dreamed: body.date_dreamed,
            mood: body.mood,
            is_lucid: body.is_lucid,
            tags: body.tags,
            is_private: body.is_private,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(dream)))
}

#[utoipa::path(
    get,
    path = "/api/dreams",
    params(ListDreamsQuery),
    responses(
        (status = 200, description = "Page of the caller's dreams", body = DreamListResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearerAuth" = [])),
    tag = "dreams"
)]
pub async fn list_dreams_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListDreamsQuery>,
) -> Result<Json<DreamListResponse>, ApiError> {
    let (page, per_page) = page_bounds(query.page, query.per_page);
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let (dreams, total) = state
        .dreams
        .list(&principal.user_id, search, per_page, page_offset(page, per_page))
        .await?;

    Ok(Json(list_response(dreams, total, page, per_page)))
}

#[utoipa::path(
    get,
    path = "/api/dreams/search",
    params(SearchDreamsQuery),
    responses(
        (status = 200, description = "Dreams matching the search term", body = DreamListResponse),
        (status = 400, description = "Empty search term"),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearerAuth" = [])),
    tag = "dreams"
)]
pub async fn search_dreams_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<SearchDreamsQuery>,
) -> Result<Json<DreamListResponse>, ApiError> {
    let term = query.q.trim();
    if term.is_empty() {
        return Err(ApiError::BadRequest("Search term cannot be empty".to_string()));
    }

    let (page, per_page) = page_bounds(query.page, query.per_page);
    let (dreams, total) = state
        .dreams
        .list(&principal.user_id, Some(term), per_page, page_offset(page, per_page))
        .await?;

    Ok(Json(list_response(dreams, total, page, per_page)))
}

#[utoipa::path(
    get,
    path = "/api/dreams/stats",
    responses(
        (status = 200, description = "Aggregate journal statistics", body = DreamStats),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearerAuth" = [])),
    tag = "dreams"
)]
pub async fn dream_stats_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<DreamStats>, ApiError> {
    let stats = state.dreams.stats(&principal.user_id).await?;
    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/api/dreams/{id}",
    params(("id" = String, Path, description = "Dream identifier")),
    responses(
        (status = 200, description = "Dream details", body = Dream),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No such dream for this account")
    ),
    security(("bearerAuth" = [])),
    tag = "dreams"
)]
pub async fn get_dream_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<Json<Dream>, ApiError> {
    let dream_id = parse_dream_id(&id)?;
    let dream = state
        .dreams
        .find(&dream_id, &principal.user_id)
        .await?
        .ok_or_else(|| Error::not_found("dream", dream_id.as_str()))?;
    Ok(Json(dream))
}

#[utoipa::path(
    put,
    path = "/api/dreams/{id}",
    params(("id" = String, Path, description = "Dream identifier")),
    request_body = UpdateDreamBody,
    responses(
        (status = 200, description = "Updated dream", body = Dream),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No such dream for this account"),
        (status = 429, description = "Too many updates this hour")
    ),
    security(("bearerAuth" = [])),
    tag = "dreams"
)]
pub async fn update_dream_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<UpdateDreamBody>,
) -> Result<Json<Dream>, ApiError> {
    check_rate(&state, &principal, "update_dream", state.limits.update_dream_per_hour)?;
    body.validate().map_err(Error::from)?;

    let dream_id = parse_dream_id(&id)?;
    let update = UpdateDream {
        title: body.title,
        content: body.content,
        date_dreamed: body.date_dreamed,
        mood: body.mood,
        is_lucid: body.is_lucid,
        tags: body.tags,
        is_private: body.is_private,
    };

    let dream = state.dreams.update(&dream_id, &principal.user_id, update).await?;
    Ok(Json(dream))
}

#[utoipa::path(
    delete,
    path = "/api/dreams/{id}",
    params(("id" = String, Path, description = "Dream identifier")),
    responses(
        (status = 204, description = "Dream deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No such dream for this account")
    ),
    security(("bearerAuth" = [])),
    tag = "dreams"
)]
pub async fn delete_dream_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let dream_id = parse_dream_id(&id)?;
    let removed = state.dreams.delete(&dream_id, &principal.user_id).await?;
    if !removed {
        return Err(ApiError::from(Error::not_found("dream", dream_id.as_str())));
    }
    Ok(StatusCode::NO_CONTENT)
}

fn parse_dream_id(raw: &str) -> Result<DreamId, ApiError> {
    raw.parse::<DreamId>()
        .map_err(|_| ApiError::from(Error::not_found("dream", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_clamp_and_default() {
        assert_eq!(page_bounds(None, None), (1, DEFAULT_PER_PAGE));
        assert_eq!(page_bounds(Some(0), Some(500)), (1, MAX_PER_PAGE));
        assert_eq!(page_bounds(Some(3), Some(25)), (3, 25));
    }

    #[test]
    fn page_offset_saturates_instead_of_overflowing() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 25), 50);
        assert_eq!(page_offset(i64::MAX, MAX_PER_PAGE), i64::MAX);
        assert!(page_offset(i64::MAX, MAX_PER_PAGE) >= 0);
    }

    #[test]
    fn list_response_computes_total_pages() {
        let resp = list_response(Vec::new(), 21, 1, 10);
        assert_eq!(resp.total_pages, 3);
        let empty = list_response(Vec::new(), 0, 1, 10);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn update_body_distinguishes_absent_from_null_mood() {
        let absent: UpdateDreamBody = serde_json::from_str(r#"{"title":"t"}"#).unwrap();
        assert_eq!(absent.mood, None);

        let cleared: UpdateDreamBody = serde_json::from_str(r#"{"mood":null}"#).unwrap();
        assert_eq!(cleared.mood, Some(None));

        let set: UpdateDreamBody = serde_json::from_str(r#"{"mood":"calm"}"#).unwrap();
        assert_eq!(set.mood, Some(Some("calm".to_string())));
    }
}
