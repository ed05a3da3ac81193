//! Profile aggregation endpoints
//!
//! `POST /profile` runs one aggregation and returns the unified profile;
//! `GET /categories` exposes the registry for discovery. Malformed input is
//! the only 4xx path — a degraded upstream never changes the status code.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::types::{Category, GeoQuery, ProviderDescriptor, UnifiedProfile};
use crate::AppState;

/// POST /profile request body
#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: Option<String>,
    /// Category names; omitted means every registered category
    #[serde(default)]
    pub categories: Option<Vec<String>>,
}

/// GET /categories response body
#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct CategoryEntry {
    pub name: Category,
    pub providers: Vec<ProviderDescriptor>,
}

/// POST /profile
pub async fn create_profile(
    State(state): State<AppState>,
    Json(request): Json<ProfileRequest>,
) -> ApiResult<Json<UnifiedProfile>> {
    let query = GeoQuery {
        latitude: request.latitude,
        longitude: request.longitude,
        address: request.address,
    };
    if !query.in_range() {
        return Err(ApiError::BadRequest(format!(
            "coordinates out of range: ({}, {})",
            query.latitude, query.longitude
        )));
    }

    let categories: Vec<Category> = match request.categories {
        Some(names) => names
            .iter()
            .map(|name| name.parse::<Category>())
            .collect::<Result<_, _>>()
            .map_err(ApiError::BadRequest)?,
        None => state.engine.registry().categories(),
    };

    match state.engine.aggregate(&query, &categories).await {
        Ok(profile) => Ok(Json(profile)),
        Err(err) => {
            *state.last_error.write().await = Some(err.to_string());
            Err(err.into())
        }
    }
}

/// GET /categories
pub async fn list_categories(State(state): State<AppState>) -> Json<CategoriesResponse> {
    let registry = state.engine.registry();
    let categories = registry
        .categories()
        .into_iter()
        .map(|name| CategoryEntry {
            name,
            providers: registry
                .descriptors()
                .into_iter()
                .filter(|d| d.category == name)
                .collect(),
        })
        .collect();

    Json(CategoriesResponse { categories })
}

/// Build profile routes
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", post(create_profile))
        .route("/categories", get(list_categories))
}
