use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ir::{PolygonId, Vertex};

/// Stable label identity: one label per polygon vertex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LabelKey {
    pub polygon: PolygonId,
    pub vertex: usize,
}

impl LabelKey {
    pub fn new(polygon: impl Into<PolygonId>, vertex: usize) -> Self {
        Self {
            polygon: polygon.into(),
            vertex,
        }
    }
}

/// Label extent in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelSize {
    pub width: f64,
    pub height: f64,
}

/// Text shown for a vertex: decimal degrees at six digits.
pub fn label_text(anchor: Vertex) -> String {
    format!("{:.6}, {:.6}", anchor.lat, anchor.lon)
}

#[derive(Debug, Clone)]
pub struct Label {
    pub(crate) key: LabelKey,
    pub(crate) anchor: Vertex,
    pub(crate) position: Vertex,
    pub(crate) text: String,
    pub(crate) size: LabelSize,
    /// Ring of the owning polygon when this label was built.
    pub(crate) ring: Arc<[Vertex]>,
    pub(crate) manually_positioned: bool,
}

impl Label {
    pub(crate) fn new(
        key: LabelKey,
        anchor: Vertex,
        position: Vertex,
        size: LabelSize,
        ring: Arc<[Vertex]>,
    ) -> Self {
        Self {
            key,
            anchor,
            position,
            text: label_text(anchor),
            size,
            ring,
            manually_positioned: false,
        }
    }

    pub fn key(&self) -> &LabelKey {
        &self.key
    }

    pub fn polygon_id(&self) -> &PolygonId {
        &self.key.polygon
    }

    pub fn vertex_index(&self) -> usize {
        self.key.vertex
    }

    pub fn anchor(&self) -> Vertex {
        self.anchor
    }

    pub fn position(&self) -> Vertex {
        self.position
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn size(&self) -> LabelSize {
        self.size
    }

    pub fn ring(&self) -> &[Vertex] {
        &self.ring
    }

    pub fn is_manually_positioned(&self) -> bool {
        self.manually_positioned
    }

    pub fn leader_line(&self) -> LeaderLine {
        LeaderLine {
            from: self.anchor,
            to: self.position,
        }
    }

    /// Half extents in degrees at `local_per_px` degrees per pixel.
    pub(crate) fn half_extent(&self, local_per_px: f64) -> (f64, f64) {
        (
            self.size.width * 0.5 * local_per_px,
            self.size.height * 0.5 * local_per_px,
        )
    }
}

/// Connector from a vertex to its label, drawn as outline plus foreground.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeaderLine {
    pub from: Vertex,
    pub to: Vertex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameMarker {
    pub polygon: PolygonId,
    pub text: String,
    pub position: Vertex,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Vertex,
    Label,
    Center,
}

/// One diagnostic ring of a repulsion field. `radius` is in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DebugField {
    pub kind: FieldKind,
    pub center: Vertex,
    pub radius: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_text_uses_six_decimals() {
        assert_eq!(
            label_text(Vertex::new(47.5, -8.123_456_789)),
            "47.500000, -8.123457"
        );
    }

    #[test]
    fn label_keys_order_by_polygon_then_vertex() {
        let mut keys = vec![
            LabelKey::new("b", 0),
            LabelKey::new("a", 3),
            LabelKey::new("a", 1),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                LabelKey::new("a", 1),
                LabelKey::new("a", 3),
                LabelKey::new("b", 0)
            ]
        );
    }
}
