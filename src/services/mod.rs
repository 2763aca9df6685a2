/// Business logic services layer
use crate::cache::{event_key, list_key, FetchCache};
use crate::clients::EonetClient;
use crate::domain::{Event, SatelliteImage};
use crate::errors::ApiResult;
use crate::geo::{self, GeoBounds, PlanePoint, Region};
use crate::normalize::{derive_images, normalize_event, normalize_feed};
use crate::query::{self, Criteria, Page};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Projection mode for map markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMode {
    /// Equirectangular world overview.
    World,
    /// Min-max fit against the dataset bounds.
    Fit,
}

impl std::str::FromStr for ProjectionMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "world" => Ok(Self::World),
            "fit" => Ok(Self::Fit),
            _ => Err(()),
        }
    }
}

/// A projected event marker ready for a presentation plane.
#[derive(Debug, Clone, Serialize)]
pub struct MapMarker {
    pub event_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub region: Region,
    pub point: PlanePoint,
    pub in_bounds: bool,
}

/// Hazard event service: cached upstream access plus query and projection
/// operations over the normalized collection.
pub struct EventService {
    cache: FetchCache,
    client: Arc<EonetClient>,
}

impl EventService {
    pub fn new(cache: FetchCache, client: EonetClient) -> Self {
        Self {
            cache,
            client: Arc::new(client),
        }
    }

    /// List normalized events for the given upstream filters, through the
    /// fetch cache.
    pub async fn list_events(
        &self,
        category: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
    ) -> ApiResult<Vec<Event>> {
        let key = list_key(category, start, end);
        let client = self.client.clone();
        let category = category.map(str::to_string);
        let start = start.map(str::to_string);
        let end = end.map(str::to_string);

        let payload = self
            .cache
            .fetch_or_load(&key, move || async move {
                client
                    .fetch_events(category.as_deref(), start.as_deref(), end.as_deref())
                    .await
            })
            .await?;

        normalize_feed(&payload)
    }

    /// Fetch a single normalized event by id, through the fetch cache.
    pub async fn get_event(&self, id: &str) -> ApiResult<Event> {
        let key = event_key(id);
        let client = self.client.clone();
        let id = id.to_string();

        let payload = self
            .cache
            .fetch_or_load(&key, move || async move { client.fetch_event(&id).await })
            .await?;

        normalize_event(&payload)
    }

    /// Derived satellite imagery for an event. Degrades to an empty list on
    /// any failure so display collaborators never see a hard error here.
    pub async fn event_images(&self, id: &str) -> Vec<SatelliteImage> {
        match self.get_event(id).await {
            Ok(event) => derive_images(&event),
            Err(e) => {
                warn!(event_id = %id, error = %e, "image derivation degraded to empty list");
                Vec::new()
            }
        }
    }

    /// Filtered, sorted, paginated page over the cached event collection.
    pub async fn feed(&self, criteria: &Criteria) -> ApiResult<Page<Event>> {
        let events = self.list_events(None, None, None).await?;
        query::query(&events, criteria)
    }

    /// Plane markers for every event with usable geometry. Events without
    /// geometry are excluded here, never projected with synthetic zeros.
    pub async fn map_markers(
        &self,
        category: Option<&str>,
        mode: ProjectionMode,
        width: f64,
        height: f64,
    ) -> ApiResult<Vec<MapMarker>> {
        let events = self.list_events(category, None, None).await?;
        let bounds = GeoBounds::from_events(&events).unwrap_or(geo::WORLD);

        let markers = events
            .iter()
            .filter_map(|event| {
                let geom = event.primary_geometry()?;
                let [lon, lat] = geom.coordinates;
                let point = match mode {
                    ProjectionMode::World => geo::project_world(lon, lat, width, height),
                    ProjectionMode::Fit => geo::project_fitted(lon, lat, &bounds, width, height),
                };
                let in_bounds = point.in_bounds(width, height);
                Some(MapMarker {
                    event_id: event.id.clone(),
                    title: event.title.clone(),
                    category: event.primary_category().map(|c| c.title.clone()),
                    region: geo::classify_region(lon, lat),
                    point,
                    in_bounds,
                })
            })
            .collect();

        Ok(markers)
    }

    /// Force-refresh the default event list; used by the background poller.
    pub async fn refresh(&self) -> ApiResult<usize> {
        self.cache.invalidate(&list_key(None, None, None)).await;
        let events = self.list_events(None, None, None).await?;
        Ok(events.len())
    }
}
