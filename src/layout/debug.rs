// Diagnostic rings showing where each repulsion field acts. Purely visual.

use std::sync::Arc;

use super::geometry::ring_centroid;
use super::types::{DebugField, FieldKind, Label};
use crate::config::SolverConfig;
use crate::ir::Vertex;
use crate::projection::Projection;

const VERTEX_RINGS: usize = 3;
const CENTER_RINGS: usize = 3;

pub fn debug_fields<'a>(
    labels: &[Label],
    rings: impl IntoIterator<Item = &'a Arc<[Vertex]>>,
    view: &dyn Projection,
    config: &SolverConfig,
) -> Vec<DebugField> {
    let local_per_px = view.local_per_px();
    let padding = config.forces.vertex_padding_px * local_per_px;
    let center_step = config.selection.initial_offset_px * local_per_px;
    let mut fields = Vec::new();

    for ring in rings {
        for vertex in ring.iter().filter(|v| view.viewport_contains(**v)) {
            for step in 1..=VERTEX_RINGS {
                fields.push(DebugField {
                    kind: FieldKind::Vertex,
                    center: *vertex,
                    radius: padding * step as f64 / VERTEX_RINGS as f64,
                });
            }
        }
        if let Some(center) = ring_centroid(ring) {
            for step in 1..=CENTER_RINGS {
                fields.push(DebugField {
                    kind: FieldKind::Center,
                    center,
                    radius: center_step * step as f64,
                });
            }
        }
    }

    let buffer = config.forces.label_buffer_px * local_per_px;
    for label in labels {
        let (half_w, half_h) = label.half_extent(local_per_px);
        fields.push(DebugField {
            kind: FieldKind::Label,
            center: label.position,
            radius: (half_w + buffer).hypot(half_h + buffer),
        });
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Bounds;
    use crate::layout::types::{LabelKey, LabelSize};
    use crate::projection::WebMercatorView;

    #[test]
    fn rings_per_source() {
        let view = WebMercatorView::new(Bounds::new(-1.0, 1.0, -1.0, 1.0), 14);
        let ring: Arc<[Vertex]> = Arc::from(vec![
            Vertex::new(0.0, 0.0),
            Vertex::new(0.0, 0.01),
            Vertex::new(0.01, 0.0),
            Vertex::new(5.0, 5.0),
        ]);
        let label = Label::new(
            LabelKey::new("p", 0),
            ring[0],
            Vertex::new(0.001, 0.001),
            LabelSize {
                width: 30.0,
                height: 40.0,
            },
            ring.clone(),
        );
        let config = SolverConfig::default();
        let fields = debug_fields(&[label], [&ring], &view, &config);

        let count = |kind| fields.iter().filter(|f| f.kind == kind).count();
        // The vertex outside the viewport has no rings.
        assert_eq!(count(FieldKind::Vertex), 9);
        assert_eq!(count(FieldKind::Center), 3);
        assert_eq!(count(FieldKind::Label), 1);

        let px = view.local_per_px();
        let label_field = fields
            .iter()
            .find(|f| f.kind == FieldKind::Label)
            .expect("label ring");
        let expected = ((15.0 + 2.0) * px).hypot((20.0 + 2.0) * px);
        assert!((label_field.radius - expected).abs() < 1e-12);
        let outer = fields
            .iter()
            .filter(|f| f.kind == FieldKind::Vertex)
            .map(|f| f.radius)
            .fold(0.0, f64::max);
        assert!((outer - config.forces.vertex_padding_px * px).abs() < 1e-12);
    }
}
