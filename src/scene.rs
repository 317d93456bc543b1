// Scene documents: a viewport plus the polygons to label, as handed over by
// a map host or stored next to the CLI.

use crate::ir::{Bounds, Polygon, PolygonId, Vertex};
use crate::projection::WebMercatorView;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to read scene: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scene: {0}")]
    Parse(#[from] json5::Error),
    #[error("viewport {south},{west} .. {north},{east} is empty or inverted")]
    InvalidViewport {
        south: f64,
        north: f64,
        west: f64,
        east: f64,
    },
    #[error("zoom {0} is outside 0..=22")]
    InvalidZoom(i32),
    #[error("polygon `{polygon}` vertex {index} is not a finite coordinate")]
    NonFiniteVertex { polygon: String, index: usize },
    #[error("polygon id `{0}` appears more than once")]
    DuplicatePolygon(String),
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub view: WebMercatorView,
    pub polygons: Vec<Polygon>,
}

#[derive(Debug, Deserialize)]
struct SceneFile {
    viewport: Bounds,
    #[serde(default)]
    zoom: Option<i32>,
    #[serde(default)]
    polygons: Vec<PolygonFile>,
}

#[derive(Debug, Deserialize)]
struct PolygonFile {
    id: IdValue,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    color: Option<String>,
    vertices: Vec<VertexValue>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdValue {
    Number(u64),
    Text(String),
}

/// `[lat, lon]` or `{ lat, lon }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VertexValue {
    Pair([f64; 2]),
    Object { lat: f64, lon: f64 },
}

impl From<VertexValue> for Vertex {
    fn from(value: VertexValue) -> Self {
        match value {
            VertexValue::Pair([lat, lon]) => Vertex::new(lat, lon),
            VertexValue::Object { lat, lon } => Vertex::new(lat, lon),
        }
    }
}

pub fn load_scene(path: &Path, width_px: f64) -> Result<Scene, SceneError> {
    let contents = std::fs::read_to_string(path)?;
    parse_scene(&contents, width_px)
}

/// Parse a JSON5 scene. Without an explicit zoom the view zooms in as far
/// as `width_px` allows.
pub fn parse_scene(contents: &str, width_px: f64) -> Result<Scene, SceneError> {
    let parsed: SceneFile = json5::from_str(contents)?;
    let bounds = parsed.viewport;
    if !bounds.is_valid() {
        return Err(SceneError::InvalidViewport {
            south: bounds.south,
            north: bounds.north,
            west: bounds.west,
            east: bounds.east,
        });
    }
    let view = match parsed.zoom {
        Some(zoom) if !(0..=22).contains(&zoom) => return Err(SceneError::InvalidZoom(zoom)),
        Some(zoom) => WebMercatorView::new(bounds, zoom),
        None => WebMercatorView::fit(bounds, width_px),
    };

    let mut seen = HashSet::new();
    let mut polygons = Vec::with_capacity(parsed.polygons.len());
    for raw in parsed.polygons {
        let id = match raw.id {
            IdValue::Number(n) => PolygonId::from(n),
            IdValue::Text(s) => PolygonId::from(s),
        };
        if !seen.insert(id.clone()) {
            return Err(SceneError::DuplicatePolygon(id.0));
        }
        let vertices: Vec<Vertex> = raw.vertices.into_iter().map(Vertex::from).collect();
        if let Some(index) = vertices.iter().position(|v| !v.is_finite()) {
            return Err(SceneError::NonFiniteVertex {
                polygon: id.0,
                index,
            });
        }
        if vertices.len() < 3 {
            log::warn!(
                "polygon `{id}` has only {} vertices and will not be labeled",
                vertices.len()
            );
        }
        polygons.push(Polygon {
            id,
            vertices,
            color: raw.color,
            name: raw.name,
        });
    }
    log::debug!("scene: {} polygons at zoom {}", polygons.len(), view.zoom);
    Ok(Scene { view, polygons })
}
