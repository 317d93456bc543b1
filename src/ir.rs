use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in geographic coordinate space. Planar math treats `lon` as x
/// and `lat` as y.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vertex {
    pub lat: f64,
    pub lon: f64,
}

impl Vertex {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub(crate) fn from_xy(point: (f64, f64)) -> Self {
        Self {
            lat: point.1,
            lon: point.0,
        }
    }

    pub(crate) fn xy(&self) -> (f64, f64) {
        (self.lon, self.lat)
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    pub fn distance(&self, other: &Vertex) -> f64 {
        let dx = self.lon - other.lon;
        let dy = self.lat - other.lat;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn approx_eq(&self, other: &Vertex, eps: f64) -> bool {
        (self.lat - other.lat).abs() <= eps && (self.lon - other.lon).abs() <= eps
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolygonId(pub String);

impl PolygonId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PolygonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PolygonId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PolygonId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for PolygonId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// Viewport bounds in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl Bounds {
    pub const fn new(south: f64, north: f64, west: f64, east: f64) -> Self {
        Self {
            south,
            north,
            west,
            east,
        }
    }

    pub fn contains(&self, vertex: Vertex) -> bool {
        vertex.lat >= self.south
            && vertex.lat <= self.north
            && vertex.lon >= self.west
            && vertex.lon <= self.east
    }

    pub fn center(&self) -> Vertex {
        Vertex::new(
            (self.south + self.north) * 0.5,
            (self.west + self.east) * 0.5,
        )
    }

    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    pub fn is_valid(&self) -> bool {
        self.south.is_finite()
            && self.north.is_finite()
            && self.west.is_finite()
            && self.east.is_finite()
            && self.south < self.north
            && self.west < self.east
    }
}

/// A host-owned polygon. The ring is open: the closing edge from the last
/// vertex back to the first is implicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub id: PolygonId,
    pub vertices: Vec<Vertex>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Polygon {
    pub fn new(id: impl Into<PolygonId>, vertices: Vec<Vertex>) -> Self {
        Self {
            id: id.into(),
            vertices,
            color: None,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Rings with fewer than three vertices never receive labels.
    pub fn is_labelable(&self) -> bool {
        self.vertices.len() >= 3
    }

    /// False when any vertex carries a NaN or infinite coordinate.
    pub fn is_finite(&self) -> bool {
        self.vertices.iter().all(Vertex::is_finite)
    }

    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}
