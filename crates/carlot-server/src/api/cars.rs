use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::header::CACHE_CONTROL,
    response::IntoResponse,
    Extension, Json,
};
use carlot_core::{car_path, handle_with_year_word, Car, CarSpecs};
use carlot_offline::RouteClass;
use serde::Deserialize;

use crate::cache::PRODUCTS_TAG;
use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

/// Page size used when walking the full catalogue.
const ALL_CARS_PAGE_SIZE: u32 = 100;

/// Cars shown on the homepage.
pub(super) const HOMEPAGE_LIMIT: u32 = 8;

/// Largest handle batch accepted by the specs endpoint.
const MAX_SPEC_HANDLES: usize = 250;

/// Cache key of the full listing, shared with the sitemap.
pub(super) const ALL_CARS_PATH: &str = "/all-cars";

const HOMEPAGE_PATH: &str = "/";

/// Upstream data cached under the page path it backs.
#[derive(Debug, Clone)]
pub enum CachedPage {
    Listing(Arc<Vec<Car>>),
    Detail(Arc<Car>),
}

#[derive(Debug, Deserialize)]
pub(super) struct CarsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SpecsRequest {
    pub handles: Vec<String>,
}

fn page_cache_control() -> [(axum::http::HeaderName, &'static str); 1] {
    [(
        CACHE_CONTROL,
        RouteClass::Page.cache_control().unwrap_or("no-store"),
    )]
}

/// Full listing, cached. Upstream failures degrade to an empty list that is
/// not cached.
pub(super) async fn load_all_cars(state: &AppState) -> Arc<Vec<Car>> {
    if let Some(CachedPage::Listing(cars)) = state.cache.get(ALL_CARS_PATH).await {
        return cars;
    }

    match state.shopify.fetch_all_cars(ALL_CARS_PAGE_SIZE).await {
        Ok(cars) => {
            let cars = Arc::new(cars);
            state
                .cache
                .insert(
                    ALL_CARS_PATH,
                    &[PRODUCTS_TAG],
                    CachedPage::Listing(Arc::clone(&cars)),
                )
                .await;
            cars
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to fetch all cars; serving empty listing");
            Arc::new(Vec::new())
        }
    }
}

async fn load_homepage_cars(state: &AppState) -> Arc<Vec<Car>> {
    if let Some(CachedPage::Listing(cars)) = state.cache.get(HOMEPAGE_PATH).await {
        return cars;
    }

    match state.shopify.fetch_homepage_cars(HOMEPAGE_LIMIT).await {
        Ok(cars) => {
            let cars = Arc::new(cars);
            state
                .cache
                .insert(
                    HOMEPAGE_PATH,
                    &[PRODUCTS_TAG],
                    CachedPage::Listing(Arc::clone(&cars)),
                )
                .await;
            cars
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to fetch homepage cars; serving empty listing");
            Arc::new(Vec::new())
        }
    }
}

/// Looks a car up by its Shopify handle or by the pretty slug of its URL.
async fn load_car(state: &AppState, handle: &str) -> Option<Arc<Car>> {
    let path = car_path(handle);
    if let Some(CachedPage::Detail(car)) = state.cache.get(&path).await {
        return Some(car);
    }

    let mut candidates = vec![handle.to_owned()];
    candidates.extend(handle_with_year_word(handle));

    for candidate in candidates {
        match state.shopify.fetch_car_by_handle(&candidate).await {
            Ok(Some(car)) => {
                let car = Arc::new(car);
                state
                    .cache
                    .insert(&path, &[PRODUCTS_TAG], CachedPage::Detail(Arc::clone(&car)))
                    .await;
                return Some(car);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(handle = %candidate, error = %e, "failed to fetch car");
                return None;
            }
        }
    }
    None
}

pub(super) async fn list_cars(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CarsQuery>,
) -> impl IntoResponse {
    let all = load_all_cars(&state).await;
    let limit = query.limit.unwrap_or(all.len());
    let mut cars: Vec<Car> = all.iter().take(limit).cloned().collect();
    state.status_store.apply_overrides(&mut cars).await;

    (page_cache_control(), Json(ApiResponse::new(cars, req_id.0)))
}

pub(super) async fn homepage_cars(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let mut cars = load_homepage_cars(&state).await.as_ref().clone();
    state.status_store.apply_overrides(&mut cars).await;

    (page_cache_control(), Json(ApiResponse::new(cars, req_id.0)))
}

pub(super) async fn get_car(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(handle): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = handle.trim();
    let Some(car) = load_car(&state, handle).await else {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("car '{handle}' not found"),
        ));
    };

    let mut cars = [car.as_ref().clone()];
    state.status_store.apply_overrides(&mut cars).await;
    let [car] = cars;

    Ok((page_cache_control(), Json(ApiResponse::new(car, req_id.0))))
}

pub(super) async fn car_specs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<SpecsRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<HashMap<String, CarSpecs>>>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::from_json_rejection(req_id.0.clone(), &e))?;

    if request.handles.len() > MAX_SPEC_HANDLES {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("at most {MAX_SPEC_HANDLES} handles per request"),
        ));
    }

    let specs = match state.shopify.fetch_specs_by_handles(&request.handles).await {
        Ok(specs) => specs,
        Err(e) => {
            tracing::warn!(error = %e, handles = request.handles.len(), "failed to fetch car specs");
            HashMap::new()
        }
    };

    Ok(Json(ApiResponse::new(specs, req_id.0)))
}
