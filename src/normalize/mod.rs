/// Event normalization: raw upstream records into the domain shape.
use crate::domain::{
    Event, EventCategory, EventGeometry, EventSource, EventStatus, ImageKind, SatelliteImage,
    Severity,
};
use crate::errors::{ApiError, ApiResult};
use crate::utils::{date_only, num, s_pick};
use serde_json::Value;

/// NASA GIBS WMS endpoint and layer used for derived imagery.
const GIBS_WMS: &str = "https://gibs.earthdata.nasa.gov/wms/epsg4326/best/wms.cgi";
const GIBS_LAYER: &str = "MODIS_Terra_CorrectedReflectance_TrueColor";

/// Normalize a full feed payload. The envelope must carry an `events` array.
pub fn normalize_feed(payload: &Value) -> ApiResult<Vec<Event>> {
    let records = payload
        .get("events")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ApiError::MalformedPayload("feed payload has no events array".to_string())
        })?;

    records.iter().map(normalize_event).collect()
}

/// Normalize a single raw record into an `Event`.
///
/// Missing optional fields are tolerated; a record without an identity field
/// is rejected as malformed.
pub fn normalize_event(record: &Value) -> ApiResult<Event> {
    let id = s_pick(record, &["id"])
        .ok_or_else(|| ApiError::MalformedPayload("event record is missing an id".to_string()))?;

    let categories = record
        .get("categories")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(category).collect())
        .unwrap_or_default();

    let sources = record
        .get("sources")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(source).collect())
        .unwrap_or_default();

    let geometry = record
        .get("geometry")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(geometry_sample).collect())
        .unwrap_or_default();

    Ok(Event {
        id,
        title: s_pick(record, &["title"]).unwrap_or_default(),
        description: s_pick(record, &["description"]),
        link: s_pick(record, &["link"]),
        categories,
        sources,
        geometry,
        status: Some(derive_status(record)),
        severity: parse_severity(record),
        affected_area: s_pick(record, &["affectedArea"]),
        estimated_impact: s_pick(record, &["estimatedImpact"]),
    })
}

fn category(v: &Value) -> Option<EventCategory> {
    Some(EventCategory {
        id: s_pick(v, &["id"])?,
        title: s_pick(v, &["title"])?,
    })
}

fn source(v: &Value) -> Option<EventSource> {
    Some(EventSource {
        id: s_pick(v, &["id"])?,
        url: s_pick(v, &["url"]).unwrap_or_default(),
    })
}

/// A usable geometry sample is a two-element numeric point. Polygon
/// geometries carry nested coordinate arrays and are skipped.
fn geometry_sample(v: &Value) -> Option<EventGeometry> {
    let coords = v.get("coordinates")?.as_array()?;
    if coords.len() != 2 {
        return None;
    }
    let lon = num(coords.first()?)?;
    let lat = num(coords.get(1)?)?;

    Some(EventGeometry {
        magnitude_value: v.get("magnitudeValue").and_then(num),
        magnitude_unit: s_pick(v, &["magnitudeUnit"]),
        date: s_pick(v, &["date"]).unwrap_or_default(),
        kind: s_pick(v, &["type"]).unwrap_or_else(|| "Point".to_string()),
        coordinates: [lon, lat],
    })
}

/// Status enrichment, applied once at normalization time. An explicit
/// upstream status wins; otherwise a non-null `closed` date marks the event
/// closed and everything else is active.
fn derive_status(record: &Value) -> EventStatus {
    if let Some(s) = s_pick(record, &["status"]) {
        match s.as_str() {
            "active" => return EventStatus::Active,
            "closed" => return EventStatus::Closed,
            "monitoring" => return EventStatus::Monitoring,
            _ => {}
        }
    }
    match record.get("closed") {
        Some(v) if !v.is_null() => EventStatus::Closed,
        _ => EventStatus::Active,
    }
}

fn parse_severity(record: &Value) -> Option<Severity> {
    match s_pick(record, &["severity"])?.as_str() {
        "low" => Some(Severity::Low),
        "medium" => Some(Severity::Medium),
        "high" => Some(Severity::High),
        "critical" => Some(Severity::Critical),
        _ => None,
    }
}

/// Derive the default satellite-image descriptor list for an event.
///
/// Pure function of the event id and its primary geometry: the same inputs
/// always yield the same descriptor. Events without usable geometry yield an
/// empty list rather than an error.
pub fn derive_images(event: &Event) -> Vec<SatelliteImage> {
    let Some(geom) = event.primary_geometry() else {
        return Vec::new();
    };

    let [lon, lat] = geom.coordinates;
    let date = date_only(&geom.date).to_string();
    let url = format!(
        "{GIBS_WMS}?SERVICE=WMS&REQUEST=GetMap&VERSION=1.3.0\
         &LAYERS={GIBS_LAYER}&STYLES=&FORMAT=image/jpeg&TRANSPARENT=FALSE\
         &HEIGHT=512&WIDTH=512&CRS=EPSG:4326&BBOX={},{},{},{}&TIME={date}",
        lat - 1.0,
        lon - 1.0,
        lat + 1.0,
        lon + 1.0
    );

    vec![SatelliteImage {
        id: format!("derived-{}", event.id),
        title: "NASA GIBS - True Color".to_string(),
        url: url.clone(),
        thumbnail: url,
        source: "NASA GIBS".to_string(),
        date,
        resolution: "1km".to_string(),
        kind: ImageKind::Rgb,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_event() -> Value {
        json!({
            "id": "EONET_6789",
            "title": "Wildfire - Serra da Mantiqueira",
            "description": "Active wildfire front",
            "link": "https://eonet.gsfc.nasa.gov/api/v3/events/EONET_6789",
            "closed": null,
            "categories": [{"id": "wildfires", "title": "Wildfires"}],
            "sources": [{"id": "InciWeb", "url": "https://inciweb.wildfire.gov/"}],
            "geometry": [{
                "magnitudeValue": 125.0,
                "magnitudeUnit": "acres",
                "date": "2025-01-10T12:00:00Z",
                "type": "Point",
                "coordinates": [-45.5, -22.5]
            }]
        })
    }

    #[test]
    fn normalizes_all_fields() {
        let event = normalize_event(&raw_event()).unwrap();
        assert_eq!(event.id, "EONET_6789");
        assert_eq!(event.title, "Wildfire - Serra da Mantiqueira");
        assert_eq!(event.categories[0].title, "Wildfires");
        assert_eq!(event.sources[0].id, "InciWeb");
        assert_eq!(event.geometry[0].coordinates, [-45.5, -22.5]);
        assert_eq!(event.geometry[0].magnitude_value, Some(125.0));
        assert_eq!(event.status, Some(EventStatus::Active));
    }

    #[test]
    fn renormalizing_is_idempotent() {
        let raw = raw_event();
        assert_eq!(normalize_event(&raw).unwrap(), normalize_event(&raw).unwrap());
    }

    #[test]
    fn missing_id_is_malformed() {
        let raw = json!({"title": "No identity"});
        assert!(matches!(
            normalize_event(&raw),
            Err(ApiError::MalformedPayload(_))
        ));
    }

    #[test]
    fn missing_optional_fields_are_tolerated() {
        let raw = json!({"id": "EONET_1"});
        let event = normalize_event(&raw).unwrap();
        assert_eq!(event.title, "");
        assert!(event.description.is_none());
        assert!(event.categories.is_empty());
        assert!(event.geometry.is_empty());
    }

    #[test]
    fn closed_date_marks_event_closed() {
        let mut raw = raw_event();
        raw["closed"] = json!("2025-01-20T00:00:00Z");
        let event = normalize_event(&raw).unwrap();
        assert_eq!(event.status, Some(EventStatus::Closed));
    }

    #[test]
    fn polygon_geometry_is_skipped() {
        let mut raw = raw_event();
        raw["geometry"] = json!([{
            "date": "2025-01-10T12:00:00Z",
            "type": "Polygon",
            "coordinates": [[[-45.0, -22.0], [-44.0, -22.0], [-44.0, -21.0]]]
        }]);
        let event = normalize_event(&raw).unwrap();
        assert!(event.geometry.is_empty());
    }

    #[test]
    fn feed_without_events_array_is_malformed() {
        let payload = json!({"title": "EONET Events"});
        assert!(matches!(
            normalize_feed(&payload),
            Err(ApiError::MalformedPayload(_))
        ));
    }

    #[test]
    fn feed_normalizes_each_record() {
        let payload = json!({"events": [raw_event()]});
        let events = normalize_feed(&payload).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "EONET_6789");
    }

    #[test]
    fn derived_image_is_deterministic() {
        let event = normalize_event(&raw_event()).unwrap();
        let first = derive_images(&event);
        let second = derive_images(&event);
        assert_eq!(first, second);

        let image = &first[0];
        assert_eq!(image.id, "derived-EONET_6789");
        assert_eq!(image.date, "2025-01-10");
        assert_eq!(image.kind, ImageKind::Rgb);
        // ±1 degree bounding box around the primary coordinate.
        assert!(image.url.contains("BBOX=-23.5,-46.5,-21.5,-44.5"));
        assert!(image.url.contains("TIME=2025-01-10"));
    }

    #[test]
    fn event_without_geometry_derives_no_images() {
        let event = normalize_event(&json!({"id": "EONET_2"})).unwrap();
        assert!(derive_images(&event).is_empty());
    }
}
