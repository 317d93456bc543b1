// Decides which polygon vertices receive a label and where each new label
// starts. One accepted list is shared by every polygon in a batch so that
// spacing is enforced across polygons too.

use std::collections::HashSet;

use super::geometry::vertex_angle;
use super::types::LabelKey;
use crate::config::SelectionConfig;
use crate::ir::{Polygon, Vertex};
use crate::projection::Projection;

/// Straight vertices are never labeled, whatever the configured minimum.
const STRAIGHT_ANGLE_EPS: f64 = 1e-9;
const CENTROID_EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AcceptedVertex {
    pub key: LabelKey,
    pub vertex: Vertex,
    pub angle: f64,
    pub initial: Vertex,
}

#[derive(Debug, Default)]
pub(crate) struct SelectionBatch {
    pub accepted: Vec<AcceptedVertex>,
    /// Keys that may not be evicted by a sharper neighbour.
    pub pinned: HashSet<LabelKey>,
    pub evicted: Vec<LabelKey>,
}

impl SelectionBatch {
    pub fn new(pinned: HashSet<LabelKey>) -> Self {
        Self {
            accepted: Vec::new(),
            pinned,
            evicted: Vec::new(),
        }
    }

    /// Seed the batch with a vertex that is already labeled elsewhere.
    pub fn seed(&mut self, entry: AcceptedVertex) {
        self.accepted.push(entry);
    }

    /// Run selection over one polygon's ring against everything accepted so
    /// far. Returns how many of its vertices were accepted.
    pub fn select(
        &mut self,
        polygon: &Polygon,
        view: &dyn Projection,
        config: &SelectionConfig,
    ) -> usize {
        if !polygon.is_labelable() {
            return 0;
        }
        let ring = &polygon.vertices;
        let visible: Vec<bool> = ring.iter().map(|v| view.viewport_contains(*v)).collect();
        let Some(visible_centroid) = visible_centroid(ring, &visible) else {
            return 0;
        };
        let local_per_px = view.local_per_px();
        let max_angle = 180.0 - config.min_vertex_angle_deg;

        let mut accepted_here = 0;
        for (index, vertex) in ring.iter().enumerate() {
            if !visible[index] {
                continue;
            }
            let angle = vertex_angle(ring, index);
            if angle > max_angle || angle >= 180.0 - STRAIGHT_ANGLE_EPS {
                continue;
            }

            let spacing = view.pixels_to_local(config.min_vertex_distance_px, vertex.lat);
            let nearby: Vec<usize> = self
                .accepted
                .iter()
                .enumerate()
                .filter(|(_, entry)| entry.vertex.distance(vertex) < spacing)
                .map(|(idx, _)| idx)
                .collect();

            // A pinned candidate always wins against unpinned neighbours and
            // coexists with pinned ones.
            let key = LabelKey::new(polygon.id.clone(), index);
            let candidate_pinned = self.pinned.contains(&key);
            let blocked = !candidate_pinned
                && nearby.iter().any(|&idx| {
                    let entry = &self.accepted[idx];
                    entry.angle <= angle || self.pinned.contains(&entry.key)
                });
            if blocked {
                continue;
            }
            for idx in nearby.into_iter().rev() {
                if self.pinned.contains(&self.accepted[idx].key) {
                    continue;
                }
                let evicted = self.accepted.remove(idx);
                self.evicted.push(evicted.key);
            }

            self.evicted.retain(|evicted| evicted != &key);
            self.accepted.push(AcceptedVertex {
                key,
                vertex: *vertex,
                angle,
                initial: initial_position(*vertex, index, visible_centroid, local_per_px, config),
            });
            accepted_here += 1;
        }
        accepted_here
    }
}

fn visible_centroid(ring: &[Vertex], visible: &[bool]) -> Option<Vertex> {
    let mut count = 0usize;
    let mut lat = 0.0;
    let mut lon = 0.0;
    for (vertex, _) in ring.iter().zip(visible).filter(|(_, shown)| **shown) {
        lat += vertex.lat;
        lon += vertex.lon;
        count += 1;
    }
    (count > 0).then(|| Vertex::new(lat / count as f64, lon / count as f64))
}

/// Push the label outward from the centroid through its vertex, then stagger
/// neighbours vertically: even indices up, odd indices down.
pub(crate) fn initial_position(
    vertex: Vertex,
    index: usize,
    centroid: Vertex,
    local_per_px: f64,
    config: &SelectionConfig,
) -> Vertex {
    let offset = config.initial_offset_px * local_per_px;
    let dx = vertex.lon - centroid.lon;
    let dy = vertex.lat - centroid.lat;
    let len = (dx * dx + dy * dy).sqrt();
    let (ox, oy) = if len <= CENTROID_EPS {
        (offset, 0.0)
    } else {
        (dx / len * offset, dy / len * offset)
    };
    let jitter = config.initial_jitter_px * local_per_px;
    let jitter = if index % 2 == 0 { jitter } else { -jitter };
    Vertex::new(vertex.lat + oy + jitter, vertex.lon + ox)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Bounds;
    use crate::projection::WebMercatorView;

    const ZOOM: i32 = 16;

    fn view() -> WebMercatorView {
        WebMercatorView::new(Bounds::new(-1.0, 1.0, -1.0, 1.0), ZOOM)
    }

    fn px() -> f64 {
        view().local_per_px()
    }

    fn at_px(x: f64, y: f64) -> Vertex {
        Vertex::new(y * px(), x * px())
    }

    fn config(min_angle: f64) -> SelectionConfig {
        SelectionConfig {
            min_vertex_distance_px: 30.0,
            min_vertex_angle_deg: min_angle,
            ..Default::default()
        }
    }

    /// Ring with a 40° vertex A and a 170° vertex B five pixels apart. The
    /// far vertices sit hundreds of pixels away.
    fn sharp_and_flat_ring(a_first: bool) -> (Polygon, usize, usize) {
        let a = (0.0, 0.0);
        let b = (5.0, 0.0);
        let p = (
            a.0 + 300.0 * 40f64.to_radians().cos(),
            a.1 + 300.0 * 40f64.to_radians().sin(),
        );
        let q = (
            b.0 + 300.0 * 10f64.to_radians().cos(),
            b.1 - 300.0 * 10f64.to_radians().sin(),
        );
        let ring: Vec<Vertex> = if a_first {
            vec![at_px(a.0, a.1), at_px(b.0, b.1), at_px(q.0, q.1), at_px(p.0, p.1)]
        } else {
            vec![at_px(p.0, p.1), at_px(q.0, q.1), at_px(b.0, b.1), at_px(a.0, a.1)]
        };
        let (ia, ib) = if a_first { (0, 1) } else { (3, 2) };
        (Polygon::new("poly", ring), ia, ib)
    }

    fn selected_indices(batch: &SelectionBatch) -> Vec<usize> {
        let mut indices: Vec<usize> = batch.accepted.iter().map(|e| e.key.vertex).collect();
        indices.sort();
        indices
    }

    #[test]
    fn fixture_angles_match_scenario() {
        let (polygon, ia, ib) = sharp_and_flat_ring(true);
        assert!((vertex_angle(&polygon.vertices, ia) - 40.0).abs() < 1e-6);
        assert!((vertex_angle(&polygon.vertices, ib) - 170.0).abs() < 1e-6);
    }

    #[test]
    fn sharper_vertex_rejects_later_flat_neighbour() {
        let (polygon, ia, ib) = sharp_and_flat_ring(true);
        let mut batch = SelectionBatch::default();
        batch.select(&polygon, &view(), &config(5.0));
        let selected = selected_indices(&batch);
        assert!(selected.contains(&ia));
        assert!(!selected.contains(&ib));
        assert!(batch.evicted.is_empty());
    }

    #[test]
    fn sharper_vertex_evicts_earlier_flat_neighbour() {
        let (polygon, ia, ib) = sharp_and_flat_ring(false);
        let mut batch = SelectionBatch::default();
        batch.select(&polygon, &view(), &config(5.0));
        let selected = selected_indices(&batch);
        assert!(selected.contains(&ia));
        assert!(!selected.contains(&ib));
        assert_eq!(batch.evicted, vec![LabelKey::new("poly", ib)]);
    }

    #[test]
    fn pinned_vertex_is_never_evicted() {
        for a_first in [false, true] {
            let (polygon, ia, ib) = sharp_and_flat_ring(a_first);
            let pinned: HashSet<LabelKey> = [LabelKey::new("poly", ib)].into_iter().collect();
            let mut batch = SelectionBatch::new(pinned);
            batch.select(&polygon, &view(), &config(5.0));
            let selected = selected_indices(&batch);
            assert!(selected.contains(&ib), "pinned vertex lost (a_first={a_first})");
            assert!(!selected.contains(&ia), "sharp vertex kept (a_first={a_first})");
            assert!(!batch.evicted.contains(&LabelKey::new("poly", ib)));
        }
    }

    #[test]
    fn nearby_pinned_vertices_are_both_kept() {
        let (polygon, ia, ib) = sharp_and_flat_ring(true);
        let pinned: HashSet<LabelKey> = [LabelKey::new("poly", ia), LabelKey::new("poly", ib)]
            .into_iter()
            .collect();
        let mut batch = SelectionBatch::new(pinned);
        batch.select(&polygon, &view(), &config(5.0));
        let selected = selected_indices(&batch);
        assert!(selected.contains(&ia));
        assert!(selected.contains(&ib));
        assert!(batch.evicted.is_empty());
    }

    #[test]
    fn collinear_vertex_never_selected() {
        let ring = vec![
            at_px(0.0, 0.0),
            at_px(100.0, 0.0),
            at_px(200.0, 0.0),
            at_px(100.0, 150.0),
        ];
        let polygon = Polygon::new("line", ring);
        for min_angle in [0.0, 1.0, 10.0, 45.0] {
            let mut batch = SelectionBatch::default();
            batch.select(&polygon, &view(), &config(min_angle));
            assert!(
                !selected_indices(&batch).contains(&1),
                "straight vertex labeled with min angle {min_angle}"
            );
        }
    }

    #[test]
    fn vertices_outside_viewport_are_skipped() {
        let ring = vec![
            Vertex::new(0.0, 0.0),
            Vertex::new(0.0, 0.5),
            Vertex::new(5.0, 0.25),
        ];
        let polygon = Polygon::new("tall", ring);
        let mut batch = SelectionBatch::default();
        batch.select(&polygon, &view(), &config(5.0));
        assert_eq!(selected_indices(&batch), vec![0, 1]);
    }

    #[test]
    fn spacing_applies_across_polygons() {
        let first = Polygon::new(
            "first",
            vec![at_px(0.0, 0.0), at_px(300.0, 0.0), at_px(0.0, 300.0)],
        );
        let second = Polygon::new(
            "second",
            vec![at_px(3.0, 3.0), at_px(-300.0, 3.0), at_px(3.0, -300.0)],
        );
        let mut batch = SelectionBatch::default();
        batch.select(&first, &view(), &config(5.0));
        batch.select(&second, &view(), &config(5.0));
        let near_origin: Vec<&AcceptedVertex> = batch
            .accepted
            .iter()
            .filter(|e| e.vertex.distance(&Vertex::new(0.0, 0.0)) < 10.0 * px())
            .collect();
        assert_eq!(near_origin.len(), 1, "only one of two 90° corners survives");
        assert_eq!(near_origin[0].key, LabelKey::new("first", 0));
    }

    #[test]
    fn small_rings_produce_nothing() {
        let polygon = Polygon::new("pair", vec![at_px(0.0, 0.0), at_px(50.0, 50.0)]);
        let mut batch = SelectionBatch::default();
        assert_eq!(batch.select(&polygon, &view(), &config(5.0)), 0);
    }

    #[test]
    fn initial_position_points_away_from_centroid_with_jitter() {
        let cfg = SelectionConfig::default();
        let px = px();
        let centroid = Vertex::new(0.0, 0.0);
        let vertex = at_px(100.0, 0.0);
        let even = initial_position(vertex, 0, centroid, px, &cfg);
        let odd = initial_position(vertex, 1, centroid, px, &cfg);
        assert!(((even.lon - vertex.lon) / px - cfg.initial_offset_px).abs() < 1e-6);
        assert!(((even.lat - vertex.lat) / px - cfg.initial_jitter_px).abs() < 1e-6);
        assert!(((odd.lat - vertex.lat) / px + cfg.initial_jitter_px).abs() < 1e-6);
    }

    #[test]
    fn initial_position_defaults_right_when_on_centroid() {
        let cfg = SelectionConfig::default();
        let px = px();
        let vertex = Vertex::new(0.0, 0.0);
        let pos = initial_position(vertex, 1, vertex, px, &cfg);
        assert!(((pos.lon - vertex.lon) / px - cfg.initial_offset_px).abs() < 1e-6);
    }
}
