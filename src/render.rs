use crate::config::RenderConfig;
use crate::ir::{Polygon, PolygonId, Vertex};
use crate::layout::{DebugField, FieldKind, Label, LabelKey, LabelSize, LeaderLine, NameMarker};
use crate::projection::Projection;
use crate::theme::Theme;
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

/// Marker/layer callbacks implemented by the host map.
pub trait RenderSink {
    /// Create or move the draggable marker of `label`.
    fn update_label(&mut self, label: &Label);
    fn remove_label(&mut self, key: &LabelKey);
    /// Create or update both layers (outline and foreground) of a leader.
    fn update_leader_line(&mut self, key: &LabelKey, line: &LeaderLine);
    fn clear_labels(&mut self);
    fn update_name(&mut self, marker: &NameMarker);
    fn clear_names(&mut self);
    fn draw_debug_fields(&mut self, fields: &[DebugField]);
    fn clear_debug_fields(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelMarker {
    pub key: LabelKey,
    pub text: String,
    pub anchor: Vertex,
    pub position: Vertex,
    pub size: LabelSize,
    pub manual: bool,
}

impl From<&Label> for LabelMarker {
    fn from(label: &Label) -> Self {
        Self {
            key: label.key().clone(),
            text: label.text().to_string(),
            anchor: label.anchor(),
            position: label.position(),
            size: label.size(),
            manual: label.is_manually_positioned(),
        }
    }
}

/// Sink that keeps the latest state of every marker.
#[derive(Debug, Clone, Default)]
pub struct MarkerStore {
    pub labels: BTreeMap<LabelKey, LabelMarker>,
    pub leaders: BTreeMap<LabelKey, LeaderLine>,
    pub names: BTreeMap<PolygonId, NameMarker>,
    pub debug_fields: Vec<DebugField>,
    /// Number of label marker updates received.
    pub label_updates: usize,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderSink for MarkerStore {
    fn update_label(&mut self, label: &Label) {
        self.label_updates += 1;
        self.labels.insert(label.key().clone(), LabelMarker::from(label));
    }

    fn remove_label(&mut self, key: &LabelKey) {
        self.labels.remove(key);
        self.leaders.remove(key);
    }

    fn update_leader_line(&mut self, key: &LabelKey, line: &LeaderLine) {
        self.leaders.insert(key.clone(), *line);
    }

    fn clear_labels(&mut self) {
        self.labels.clear();
        self.leaders.clear();
    }

    fn update_name(&mut self, marker: &NameMarker) {
        self.names.insert(marker.polygon.clone(), marker.clone());
    }

    fn clear_names(&mut self) {
        self.names.clear();
    }

    fn draw_debug_fields(&mut self, fields: &[DebugField]) {
        self.debug_fields = fields.to_vec();
    }

    fn clear_debug_fields(&mut self) {
        self.debug_fields.clear();
    }
}

/// Maps degrees onto the SVG canvas at the view's pixel scale.
struct Screen {
    west: f64,
    north: f64,
    local_per_px: f64,
}

impl Screen {
    fn point(&self, vertex: Vertex) -> (f64, f64) {
        (
            (vertex.lon - self.west) / self.local_per_px,
            (self.north - vertex.lat) / self.local_per_px,
        )
    }

    fn length(&self, local: f64) -> f64 {
        local / self.local_per_px
    }
}

pub fn render_svg(
    polygons: &[Polygon],
    markers: &MarkerStore,
    view: &dyn Projection,
    theme: &Theme,
) -> String {
    let bounds = view.viewport_bounds();
    let screen = Screen {
        west: bounds.west,
        north: bounds.north,
        local_per_px: view.local_per_px(),
    };
    let width = screen.length(bounds.lon_span()).ceil().max(1.0);
    let height = screen.length(bounds.lat_span()).ceil().max(1.0);

    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">"
    );
    let _ = write!(
        svg,
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    );

    for polygon in polygons {
        if polygon.vertices.is_empty() {
            continue;
        }
        let color = polygon
            .color
            .as_deref()
            .unwrap_or(&theme.default_polygon_color);
        let d = ring_to_path(&polygon.vertices, &screen);
        let _ = write!(
            svg,
            "<path d=\"{d}\" fill=\"{}\" fill-opacity=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>",
            escape_xml(color),
            theme.polygon_fill_opacity,
            escape_xml(color),
            theme.polygon_stroke_width
        );
    }

    if !markers.debug_fields.is_empty() {
        svg.push_str("<g class=\"debug-fields\">");
        for field in &markers.debug_fields {
            let (cx, cy) = screen.point(field.center);
            let stroke = match field.kind {
                FieldKind::Vertex => &theme.debug_vertex_field,
                FieldKind::Label => &theme.debug_label_field,
                FieldKind::Center => &theme.debug_center_field,
            };
            let _ = write!(
                svg,
                "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{:.2}\" fill=\"none\" stroke=\"{stroke}\" stroke-width=\"1\" stroke-dasharray=\"3 3\" stroke-opacity=\"0.7\"/>",
                screen.length(field.radius)
            );
        }
        svg.push_str("</g>");
    }

    for line in markers.leaders.values() {
        let (x1, y1) = screen.point(line.from);
        let (x2, y2) = screen.point(line.to);
        let _ = write!(
            svg,
            "<line x1=\"{x1:.2}\" y1=\"{y1:.2}\" x2=\"{x2:.2}\" y2=\"{y2:.2}\" stroke=\"{}\" stroke-width=\"{}\" stroke-linecap=\"round\"/>",
            theme.leader_outline, theme.leader_outline_width
        );
        let _ = write!(
            svg,
            "<line x1=\"{x1:.2}\" y1=\"{y1:.2}\" x2=\"{x2:.2}\" y2=\"{y2:.2}\" stroke=\"{}\" stroke-width=\"{}\" stroke-linecap=\"round\"/>",
            theme.leader_color, theme.leader_width
        );
    }

    for marker in markers.labels.values() {
        let (cx, cy) = screen.point(marker.position);
        let x = cx - marker.size.width / 2.0;
        let y = cy - marker.size.height / 2.0;
        let border = if marker.manual {
            &theme.manual_label_border
        } else {
            &theme.label_border
        };
        let _ = write!(
            svg,
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"3\" ry=\"3\" fill=\"{}\" stroke=\"{border}\" stroke-width=\"1\"/>",
            marker.size.width, marker.size.height, theme.label_background
        );
        let _ = write!(
            svg,
            "<text x=\"{cx:.2}\" y=\"{cy:.2}\" text-anchor=\"middle\" dominant-baseline=\"central\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            escape_xml(&theme.font_family),
            theme.font_size,
            theme.label_text,
            escape_xml(&marker.text)
        );
    }

    for name in markers.names.values() {
        let (x, y) = screen.point(name.position);
        let _ = write!(
            svg,
            "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"middle\" dominant-baseline=\"central\" font-family=\"{}\" font-size=\"{}\" font-weight=\"bold\" fill=\"{}\" stroke=\"{}\" stroke-width=\"3\" paint-order=\"stroke\">{}</text>",
            escape_xml(&theme.font_family),
            theme.font_size * 1.25,
            theme.name_text,
            theme.name_halo,
            escape_xml(&name.text)
        );
    }

    svg.push_str("</svg>");
    svg
}

fn ring_to_path(ring: &[Vertex], screen: &Screen) -> String {
    let mut d = String::new();
    for (idx, vertex) in ring.iter().enumerate() {
        let (x, y) = screen.point(*vertex);
        let cmd = if idx == 0 { "M" } else { " L" };
        let _ = write!(d, "{cmd} {x:.2} {y:.2}");
    }
    d.push_str(" Z");
    d
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Helvetica Neue".to_string();
    if let Some(size) = usvg::Size::from_wh(render_cfg.width as f32, render_cfg.height as f32) {
        opt.default_size = size;
    }
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig) -> Result<()> {
    anyhow::bail!("PNG output requires the `png` feature")
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Bounds;
    use crate::projection::WebMercatorView;

    fn marker(key: LabelKey, position: Vertex, manual: bool) -> LabelMarker {
        LabelMarker {
            key,
            text: "0.000000, 0.000000".to_string(),
            anchor: Vertex::new(0.0, 0.0),
            position,
            size: LabelSize {
                width: 138.0,
                height: 20.0,
            },
            manual,
        }
    }

    #[test]
    fn render_svg_draws_every_layer() {
        let view = WebMercatorView::new(Bounds::new(-0.005, 0.005, -0.005, 0.005), 16);
        let polygons = vec![
            Polygon::new(
                "a",
                vec![
                    Vertex::new(0.0, 0.0),
                    Vertex::new(0.001, 0.0),
                    Vertex::new(0.0, 0.001),
                ],
            )
            .with_color("#ff0000"),
        ];
        let key = LabelKey::new("a", 0);
        let mut store = MarkerStore::new();
        store
            .labels
            .insert(key.clone(), marker(key.clone(), Vertex::new(0.0005, 0.0005), true));
        store.leaders.insert(
            key,
            LeaderLine {
                from: Vertex::new(0.0, 0.0),
                to: Vertex::new(0.0005, 0.0005),
            },
        );
        store.names.insert(
            PolygonId::from("a"),
            NameMarker {
                polygon: PolygonId::from("a"),
                text: "North & South".to_string(),
                position: Vertex::new(0.0003, 0.0003),
                color: None,
            },
        );
        let theme = Theme::classic();
        let svg = render_svg(&polygons, &store, &view, &theme);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("fill=\"#ff0000\""));
        assert_eq!(svg.matches("<line").count(), 2, "outline and foreground");
        assert!(svg.contains("0.000000, 0.000000"));
        assert!(svg.contains(&theme.manual_label_border));
        assert!(svg.contains("North &amp; South"));
        assert!(!svg.contains("<circle"));
    }

    #[test]
    fn marker_store_tracks_removals() {
        let key = LabelKey::new("a", 1);
        let mut store = MarkerStore::new();
        store.labels.insert(key.clone(), marker(key.clone(), Vertex::new(0.0, 0.0), false));
        store.update_leader_line(
            &key,
            &LeaderLine {
                from: Vertex::new(0.0, 0.0),
                to: Vertex::new(1.0, 1.0),
            },
        );
        store.remove_label(&key);
        assert!(store.labels.is_empty());
        assert!(store.leaders.is_empty());
    }

    #[test]
    fn escape_xml_handles_markup() {
        assert_eq!(escape_xml("<a & 'b'>"), "&lt;a &amp; &apos;b&apos;&gt;");
    }
}
