/// Coarse region bucketing and 2D plane projection for event coordinates.
use crate::domain::Event;
use serde::{Deserialize, Serialize};

/// Full world coordinate range, the fallback when a dataset provides no
/// usable bounds of its own.
pub const WORLD: GeoBounds = GeoBounds {
    min_lon: -180.0,
    max_lon: 180.0,
    min_lat: -90.0,
    max_lat: 90.0,
};

/// Fraction of the plane kept clear around fitted markers (2% inset).
const INSET: f64 = 0.02;

/// Coarse directional region bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    North,
    South,
    East,
    West,
    Center,
    Unknown,
}

impl std::str::FromStr for Region {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "north" => Ok(Self::North),
            "south" => Ok(Self::South),
            "east" => Ok(Self::East),
            "west" => Ok(Self::West),
            "center" => Ok(Self::Center),
            "unknown" => Ok(Self::Unknown),
            _ => Err(()),
        }
    }
}

/// Bucket a coordinate into a coarse directional region.
///
/// A fixed-threshold heuristic, not a reverse-geocode: any latitude above
/// the equator is North, below -30 is South, and the longitude band
/// -60..-40 splits the remainder into West, Center and East.
pub fn classify_region(lon: f64, lat: f64) -> Region {
    if lat > 0.0 {
        Region::North
    } else if lat < -30.0 {
        Region::South
    } else if lon < -60.0 {
        Region::West
    } else if lon > -40.0 {
        Region::East
    } else {
        Region::Center
    }
}

/// A point on a 2D presentation plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlanePoint {
    pub x: f64,
    pub y: f64,
}

impl PlanePoint {
    /// Whether the point falls inside a plane of the given dimensions.
    /// `project_world` does not clip; callers decide what to do with
    /// out-of-bounds points.
    pub fn in_bounds(&self, width: f64, height: f64) -> bool {
        self.x >= 0.0 && self.x <= width && self.y >= 0.0 && self.y <= height
    }
}

/// Equirectangular projection of a coordinate onto a world-overview plane.
pub fn project_world(lon: f64, lat: f64, width: f64, height: f64) -> PlanePoint {
    PlanePoint {
        x: (lon + 180.0) / 360.0 * width,
        y: (90.0 - lat) / 180.0 * height,
    }
}

/// Bounding box of a dataset's primary coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoBounds {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl GeoBounds {
    /// Bounds over the primary coordinates of a collection. Events without
    /// usable geometry are skipped; `None` when nothing remains.
    pub fn from_events(events: &[Event]) -> Option<Self> {
        let mut bounds: Option<GeoBounds> = None;
        for event in events {
            let Some(geom) = event.primary_geometry() else {
                continue;
            };
            let [lon, lat] = geom.coordinates;
            bounds = Some(match bounds {
                None => GeoBounds {
                    min_lon: lon,
                    max_lon: lon,
                    min_lat: lat,
                    max_lat: lat,
                },
                Some(b) => GeoBounds {
                    min_lon: b.min_lon.min(lon),
                    max_lon: b.max_lon.max(lon),
                    min_lat: b.min_lat.min(lat),
                    max_lat: b.max_lat.max(lat),
                },
            });
        }
        bounds
    }
}

/// Min-max fit of a coordinate against the dataset bounds, inverted on the
/// vertical axis and clamped into the inset margin so markers never render
/// flush against a plane edge. Zero-span axes fall back to the world range
/// to keep the division defined.
pub fn project_fitted(lon: f64, lat: f64, bounds: &GeoBounds, width: f64, height: f64) -> PlanePoint {
    let (min_lon, max_lon) =
        span_or_world(bounds.min_lon, bounds.max_lon, WORLD.min_lon, WORLD.max_lon);
    let (min_lat, max_lat) =
        span_or_world(bounds.min_lat, bounds.max_lat, WORLD.min_lat, WORLD.max_lat);

    let fx = (lon - min_lon) / (max_lon - min_lon);
    let fy = 1.0 - (lat - min_lat) / (max_lat - min_lat);

    PlanePoint {
        x: fx.clamp(INSET, 1.0 - INSET) * width,
        y: fy.clamp(INSET, 1.0 - INSET) * height,
    }
}

fn span_or_world(min: f64, max: f64, world_min: f64, world_max: f64) -> (f64, f64) {
    if max > min {
        (min, max)
    } else {
        (world_min, world_max)
    }
}
