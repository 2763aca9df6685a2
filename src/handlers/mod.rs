/// HTTP request handlers
use crate::domain::{Event, Health, SatelliteImage};
use crate::errors::{ApiError, ApiResult};
use crate::geo::Region;
use crate::query::{Criteria, Page, SortKey, DEFAULT_PAGE_SIZE};
use crate::services::{EventService, MapMarker, ProjectionMode};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub event_service: Arc<EventService>,
}

/// Successful response wrapper
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub ok: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

#[derive(Serialize)]
pub struct EventsBody {
    pub events: Vec<Event>,
    pub total: usize,
}

#[derive(Serialize)]
pub struct EventBody {
    pub event: Event,
}

#[derive(Serialize)]
pub struct ImagesBody {
    pub images: Vec<SatelliteImage>,
}

#[derive(Serialize)]
pub struct MarkersBody {
    pub markers: Vec<MapMarker>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub category: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub region: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub sort: Option<SortKey>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct MarkerParams {
    pub category: Option<String>,
    pub mode: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// Health check handler
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        now: Utc::now(),
    })
}

/// List cached/fetched events for the given upstream filters
pub async fn list_events(
    Query(params): Query<ListParams>,
    State(state): State<AppState>,
) -> ApiResult<Json<SuccessResponse<EventsBody>>> {
    let events = state
        .event_service
        .list_events(
            params.category.as_deref(),
            params.start.as_deref(),
            params.end.as_deref(),
        )
        .await?;
    let total = events.len();
    Ok(Json(SuccessResponse::new(EventsBody { events, total })))
}

/// Get a single event by id
pub async fn get_event(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<SuccessResponse<EventBody>>> {
    let event = state.event_service.get_event(&id).await?;
    Ok(Json(SuccessResponse::new(EventBody { event })))
}

/// Derived satellite images for an event. This surface never reports a hard
/// failure: derivation problems degrade to an empty list.
pub async fn get_event_images(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Json<SuccessResponse<ImagesBody>> {
    let images = state.event_service.event_images(&id).await;
    Json(SuccessResponse::new(ImagesBody { images }))
}

/// Filtered, sorted, paginated feed page
pub async fn get_feed(
    Query(params): Query<FeedParams>,
    State(state): State<AppState>,
) -> ApiResult<Json<SuccessResponse<Page<Event>>>> {
    let region = params
        .region
        .as_deref()
        .filter(|r| !r.is_empty() && *r != "all")
        .map(|r| {
            r.parse::<Region>()
                .map_err(|_| ApiError::InvalidQuery(format!("unknown region: {r}")))
        })
        .transpose()?;

    let criteria = Criteria {
        search: params.search,
        category: params.category,
        region,
        date_from: params.from,
        date_to: params.to,
        sort: params.sort.unwrap_or_default(),
        page: params.page.unwrap_or(1),
        page_size: params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    };

    let page = state.event_service.feed(&criteria).await?;
    Ok(Json(SuccessResponse::new(page)))
}

/// Projected map markers for events with usable geometry
pub async fn get_map_markers(
    Query(params): Query<MarkerParams>,
    State(state): State<AppState>,
) -> ApiResult<Json<SuccessResponse<MarkersBody>>> {
    let mode = match params.mode.as_deref() {
        None => ProjectionMode::World,
        Some(raw) => raw
            .parse::<ProjectionMode>()
            .map_err(|_| ApiError::InvalidQuery(format!("unknown projection mode: {raw}")))?,
    };

    let width = params.width.unwrap_or(100.0);
    let height = params.height.unwrap_or(100.0);
    if width <= 0.0 || height <= 0.0 {
        return Err(ApiError::InvalidQuery(
            "plane dimensions must be positive".to_string(),
        ));
    }

    let markers = state
        .event_service
        .map_markers(params.category.as_deref(), mode, width, height)
        .await?;
    Ok(Json(SuccessResponse::new(MarkersBody { markers })))
}
