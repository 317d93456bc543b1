use super::geometry::{clamp_center_to_bounds, ring_centroid};
use super::types::{Label, NameMarker};
use crate::config::NameConfig;
use crate::ir::{Polygon, Vertex};
use crate::projection::Projection;

/// Place one name marker per named polygon at the candidate spot (centroid
/// or a cardinal offset from it) that stays furthest from every label.
pub fn place_names(
    polygons: &[Polygon],
    labels: &[Label],
    view: &dyn Projection,
    config: &NameConfig,
) -> Vec<NameMarker> {
    let local_per_px = view.local_per_px();
    let offset = config.offset_px * local_per_px;
    let padding = config.padding_px * local_per_px;
    let bounds = view.viewport_bounds();

    let mut markers = Vec::new();
    for polygon in polygons {
        let Some(name) = polygon.display_name() else {
            continue;
        };
        let Some(center) = ring_centroid(&polygon.vertices) else {
            continue;
        };
        let mut candidates: Vec<Vertex> = [
            center,
            Vertex::new(center.lat + offset, center.lon),
            Vertex::new(center.lat - offset, center.lon),
            Vertex::new(center.lat, center.lon + offset),
            Vertex::new(center.lat, center.lon - offset),
        ]
        .into_iter()
        .filter(|candidate| view.viewport_contains(*candidate))
        .collect();
        if candidates.is_empty() {
            candidates.push(Vertex::from_xy(clamp_center_to_bounds(
                center.xy(),
                padding,
                padding,
                &bounds,
            )));
        }

        let mut best = candidates[0];
        let mut best_score = clearance(best, labels);
        for candidate in candidates.into_iter().skip(1) {
            let score = clearance(candidate, labels);
            if score > best_score {
                best = candidate;
                best_score = score;
            }
        }
        markers.push(NameMarker {
            polygon: polygon.id.clone(),
            text: name.to_string(),
            position: best,
            color: polygon.color.clone(),
        });
    }
    markers
}

fn clearance(point: Vertex, labels: &[Label]) -> f64 {
    labels
        .iter()
        .map(|label| label.position.distance(&point))
        .fold(f64::INFINITY, f64::min)
}
