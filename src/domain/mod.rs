/// Domain models for the application
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event category, e.g. "Wildfires". The first category of an event is its
/// primary type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCategory {
    pub id: String,
    pub title: String,
}

/// Link back to the authority reporting the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSource {
    pub id: String,
    pub url: String,
}

/// One dated location sample of an event. Upstream reports these
/// most-recent-first by convention, but that order is not guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventGeometry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnitude_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magnitude_unit: Option<String>,
    pub date: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// [longitude, latitude]
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Active,
    Closed,
    Monitoring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Normalized hazard event. Built once by the normalizer and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub categories: Vec<EventCategory>,
    pub sources: Vec<EventSource>,
    /// May be empty when upstream supplied no usable point geometry; such
    /// events are excluded from geo-dependent operations but kept otherwise.
    pub geometry: Vec<EventGeometry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_impact: Option<String>,
}

impl Event {
    /// Primary geometry sample: the first entry, shown as the event's
    /// current location and date.
    pub fn primary_geometry(&self) -> Option<&EventGeometry> {
        self.geometry.first()
    }

    /// Primary category: the first entry in the category list.
    pub fn primary_category(&self) -> Option<&EventCategory> {
        self.categories.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImageKind {
    Rgb,
    Infrared,
    Thermal,
    Wms,
    Wmts,
}

/// Satellite imagery descriptor attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteImage {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail: String,
    pub source: String,
    pub date: String,
    pub resolution: String,
    #[serde(rename = "type")]
    pub kind: ImageKind,
}

/// Health check response
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub now: DateTime<Utc>,
}
