use std::path::Path;

use vertex_labeler::config::SolverConfig;
use vertex_labeler::layout::{Label, LabelEngine, LabelKey, TickOutcome};
use vertex_labeler::theme::Theme;
use vertex_labeler::{
    Bounds, MarkerStore, Polygon, Projection, Scene, SolverSettings, Vertex, WebMercatorView,
    load_scene, render_svg,
};

const EPS: f64 = 1e-9;

type Engine = LabelEngine<WebMercatorView, MarkerStore>;

fn fixture(name: &str) -> Scene {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    load_scene(&path, 1200.0).unwrap_or_else(|err| panic!("{name}: {err}"))
}

fn engine_for(scene: &Scene, config: SolverConfig) -> Engine {
    let mut engine = LabelEngine::new(scene.view, MarkerStore::new(), config);
    engine.update_all_labels(scene.polygons.clone());
    engine
}

fn assert_within_anchor_bound(label: &Label, view: &WebMercatorView, config: &SolverConfig) {
    if label.is_manually_positioned() {
        return;
    }
    let max = config.forces.max_label_distance_px * view.local_per_px();
    let dist = label.position().distance(&label.anchor());
    assert!(
        dist <= max + EPS,
        "{:?} is {} px from its anchor",
        label.key(),
        dist / view.local_per_px()
    );
}

fn assert_inside_viewport(label: &Label, view: &WebMercatorView, config: &SolverConfig) {
    if label.is_manually_positioned() {
        return;
    }
    let px = view.local_per_px();
    let bounds = view.viewport_bounds();
    let pad = config.forces.viewport_padding_px * px;
    let half_w = label.size().width * 0.5 * px;
    let half_h = label.size().height * 0.5 * px;
    let p = label.position();
    assert!(p.lon - half_w - pad >= bounds.west - EPS, "{:?} west", label.key());
    assert!(p.lon + half_w + pad <= bounds.east + EPS, "{:?} east", label.key());
    assert!(p.lat - half_h - pad >= bounds.south - EPS, "{:?} south", label.key());
    assert!(p.lat + half_h + pad <= bounds.north + EPS, "{:?} north", label.key());
}

#[test]
fn render_all_fixtures() {
    let fixtures = [
        "single_field.json5",
        "dense_parcels.json5",
        "edge_of_view.json5",
        "degenerate.json5",
    ];
    let theme = Theme::classic();
    for name in fixtures {
        let scene = fixture(name);
        let mut engine = engine_for(&scene, SolverConfig::default());
        let summary = engine.run_to_completion();
        assert!(
            summary.iterations <= engine.config().schedule.max_iterations,
            "{name}: ran past the budget"
        );
        let svg = render_svg(engine.polygons(), engine.sink(), engine.view(), &theme);
        assert!(svg.contains("<svg"), "{name}: missing <svg tag");
        assert!(svg.contains("</svg>"), "{name}: missing </svg tag");
        for label in engine.labels() {
            assert!(label.position().is_finite(), "{name}: {:?}", label.key());
            assert!(svg.contains(label.text()), "{name}: {} not drawn", label.text());
        }
    }
}

#[test]
fn shared_corners_are_labeled_once() {
    let scene = fixture("dense_parcels.json5");
    let engine = engine_for(&scene, SolverConfig::default());
    // 3x3 distinct corner positions.
    assert_eq!(engine.labels().len(), 9);
    let mut anchors: Vec<(i64, i64)> = engine
        .labels()
        .iter()
        .map(|l| {
            (
                (l.anchor().lat * 1e6).round() as i64,
                (l.anchor().lon * 1e6).round() as i64,
            )
        })
        .collect();
    anchors.sort();
    anchors.dedup();
    assert_eq!(anchors.len(), 9);
    // Unnamed parcel 3b gets no name marker.
    assert_eq!(engine.names().len(), 3);
}

#[test]
fn degenerate_rings_are_tolerated() {
    let scene = fixture("degenerate.json5");
    let engine = engine_for(&scene, SolverConfig::default());
    assert!(engine.labels().iter().all(|l| l.polygon_id().as_str() == "straight"));
    assert!(engine.label(&LabelKey::new("straight", 1)).is_none());
    assert_eq!(engine.labels().len(), 3);
    // The sliver still gets its name.
    assert_eq!(engine.names().len(), 1);
}

#[test]
fn only_visible_vertices_are_labeled() {
    let scene = fixture("edge_of_view.json5");
    assert_eq!(scene.view.zoom, 16);
    let engine = engine_for(&scene, SolverConfig::default());
    let mut indices: Vec<usize> = engine.labels().iter().map(|l| l.vertex_index()).collect();
    indices.sort();
    assert_eq!(indices, vec![0, 3]);
}

#[test]
fn every_tick_respects_anchor_and_viewport_bounds() {
    let scene = fixture("dense_parcels.json5");
    let config = SolverConfig::default();
    let mut engine = engine_for(&scene, config.clone());
    let mut ticks = 0;
    loop {
        let outcome = engine.tick();
        ticks += 1;
        for label in engine.labels() {
            assert_within_anchor_bound(label, &scene.view, &config);
            assert_inside_viewport(label, &scene.view, &config);
        }
        if !matches!(outcome, TickOutcome::Running { .. }) {
            break;
        }
        assert!(ticks <= config.schedule.max_iterations, "tick loop never ended");
    }
}

#[test]
fn manual_labels_survive_simulation_and_rebuild() {
    let scene = fixture("single_field.json5");
    let mut engine = engine_for(&scene, SolverConfig::default());
    engine.run_to_completion();

    let key = LabelKey::new("field-1", 2);
    let dropped = Vertex::new(47.3795, 8.5455);
    assert!(engine.begin_drag(&key));
    assert!(engine.drag_to(&key, dropped));
    assert!(engine.end_drag(&key));
    engine.run_to_completion();
    assert_eq!(engine.label(&key).map(Label::position), Some(dropped));

    // Rebuild from scratch: the pinned coordinate comes back exactly.
    engine.update_all_labels(scene.polygons.clone());
    let label = engine.label(&key).expect("label rebuilt");
    assert!(label.is_manually_positioned());
    assert_eq!(label.position(), dropped);
    engine.run_to_completion();
    assert_eq!(engine.label(&key).map(Label::position), Some(dropped));
    assert_eq!(engine.sink().labels[&key].position, dropped);
}

#[test]
fn lone_label_converges_within_a_few_ticks() {
    let view = WebMercatorView::new(Bounds::new(0.0, 0.01, 0.0, 0.01), 16);
    let polygon = Polygon::new(
        "lone",
        vec![
            Vertex::new(0.005, 0.005),
            Vertex::new(0.05, 0.005),
            Vertex::new(0.005, 0.05),
        ],
    );
    let mut config = SolverConfig::default();
    SolverSettings {
        center_repulsion_strength: Some(0.0),
        ..Default::default()
    }
    .apply(&mut config);

    let mut engine = LabelEngine::new(view, MarkerStore::new(), config);
    engine.set_labels(polygon);
    assert_eq!(engine.labels().len(), 1);
    let summary = engine.run_to_completion();
    assert!(summary.converged, "stopped on budget: {summary:?}");
    assert!(summary.ticks <= 40, "took {} ticks", summary.ticks);
    let label = &engine.labels()[0];
    let pulled = label.position().distance(&label.anchor()) / view.local_per_px();
    assert!(pulled < 60.0, "spring left the label {pulled} px out");
}

#[test]
fn simulation_is_deterministic() {
    let scene = fixture("dense_parcels.json5");
    let run = || {
        let mut engine = engine_for(&scene, SolverConfig::default());
        engine.run_to_completion();
        engine
            .labels()
            .iter()
            .map(|l| (l.key().clone(), l.position()))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

#[test]
fn incremental_update_keeps_unrelated_polygons() {
    let scene = fixture("dense_parcels.json5");
    let mut engine = engine_for(&scene, SolverConfig::default());
    engine.run_to_completion();
    let untouched: Vec<(LabelKey, Vertex)> = engine
        .labels()
        .iter()
        .filter(|l| l.polygon_id().as_str() == "1")
        .map(|l| (l.key().clone(), l.position()))
        .collect();

    let mut moved = scene.polygons[3].clone();
    for vertex in &mut moved.vertices {
        vertex.lat += 0.002;
    }
    engine.set_labels(moved);
    let after: Vec<(LabelKey, Vertex)> = engine
        .labels()
        .iter()
        .filter(|l| l.polygon_id().as_str() == "1")
        .map(|l| (l.key().clone(), l.position()))
        .collect();
    assert_eq!(untouched, after);
}

/// A 40° corner and a 170° corner five pixels apart, listed in either order.
fn sharp_and_flat(view: &WebMercatorView, sharp_first: bool) -> (Polygon, usize, usize) {
    let px = view.local_per_px();
    let at = |x: f64, y: f64| Vertex::new(y * px, x * px);
    let sharp = at(0.0, 0.0);
    let flat = at(5.0, 0.0);
    let p = at(300.0 * 40f64.to_radians().cos(), 300.0 * 40f64.to_radians().sin());
    let q = at(5.0 + 300.0 * 10f64.to_radians().cos(), -300.0 * 10f64.to_radians().sin());
    if sharp_first {
        (Polygon::new("wedge", vec![sharp, flat, q, p]), 0, 1)
    } else {
        (Polygon::new("wedge", vec![p, q, flat, sharp]), 3, 2)
    }
}

#[test]
fn dragged_flat_corner_survives_rebuild_in_any_ring_order() {
    let view = WebMercatorView::new(Bounds::new(-0.02, 0.02, -0.02, 0.02), 16);
    for sharp_first in [true, false] {
        let (polygon, sharp, flat) = sharp_and_flat(&view, sharp_first);
        let mut config = SolverConfig::default();
        config.selection.min_vertex_angle_deg = 5.0;
        config.selection.min_vertex_distance_px = 0.0;
        let mut engine = LabelEngine::new(view, MarkerStore::new(), config);
        engine.set_labels(polygon);

        let flat_key = LabelKey::new("wedge", flat);
        let dropped = Vertex::new(0.003, 0.003);
        assert!(engine.begin_drag(&flat_key));
        assert!(engine.drag_to(&flat_key, dropped));
        assert!(engine.end_drag(&flat_key));

        engine.update_settings(&SolverSettings {
            min_vertex_distance: Some(30.0),
            ..Default::default()
        });
        let label = engine
            .label(&flat_key)
            .unwrap_or_else(|| panic!("dragged label dropped (sharp_first={sharp_first})"));
        assert_eq!(label.position(), dropped);
        assert!(engine.label(&LabelKey::new("wedge", sharp)).is_none());
    }
}
