// Location model representing geographic coordinates

use geo::{HaversineDistance, Point};
use serde::{Deserialize, Serialize};

/// Represents a location as (longitude, latitude) in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lon: f64,
    pub lat: f64,
}

impl Location {
    /// Creates a new location with the given coordinates
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Great-circle distance to another location in meters
    pub fn distance_to(&self, other: &Location) -> f64 {
        Point::from(*self).haversine_distance(&Point::from(*other))
    }
}

impl From<Location> for Point<f64> {
    fn from(location: Location) -> Self {
        Point::new(location.lon, location.lat)
    }
}

impl From<Point<f64>> for Location {
    fn from(point: Point<f64>) -> Self {
        Self::new(point.x(), point.y())
    }
}
