use serde::Deserialize;
use serde::de::DeserializeOwned;
use vertex_labeler::layout::TickOutcome;
use vertex_labeler::layout_dump::LayoutDump;
use vertex_labeler::{
    Bounds, LabelEngine, LabelKey, MarkerStore, Polygon, PolygonId, SolverConfig, SolverSettings,
    Vertex, WebMercatorView,
};
use wasm_bindgen::prelude::*;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewOptions {
    bounds: Bounds,
    zoom: i32,
}

fn parse<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    serde_json::from_str(raw).map_err(|error| error.to_string())
}

fn parse_view(raw: &str) -> Result<WebMercatorView, String> {
    let options: ViewOptions = parse(raw)?;
    if !options.bounds.is_valid() {
        return Err("viewport bounds are empty or inverted".to_string());
    }
    Ok(WebMercatorView::new(options.bounds, options.zoom))
}

fn build_config(settings_json: Option<&str>) -> Result<SolverConfig, String> {
    let mut config = SolverConfig::default();
    if let Some(raw) = settings_json {
        parse::<SolverSettings>(raw)?.apply(&mut config);
    }
    Ok(config)
}

fn to_js(error: String) -> JsValue {
    JsValue::from_str(&error)
}

/// Label engine driven from a browser map: feed it polygons and call
/// `tick()` from `requestAnimationFrame` until it returns false.
#[wasm_bindgen]
pub struct LabelSolver {
    engine: LabelEngine<WebMercatorView, MarkerStore>,
}

impl LabelSolver {
    fn create(view_json: &str, settings_json: Option<&str>) -> Result<Self, String> {
        let view = parse_view(view_json)?;
        let config = build_config(settings_json)?;
        Ok(Self {
            engine: LabelEngine::new(view, MarkerStore::new(), config),
        })
    }

    fn snapshot_json(&self) -> Result<String, String> {
        let dump = LayoutDump::from_store(self.engine.sink(), self.engine.view(), None);
        serde_json::to_string(&dump).map_err(|error| error.to_string())
    }
}

#[wasm_bindgen]
impl LabelSolver {
    /// `view_json`: `{ "bounds": {south, north, west, east}, "zoom": n }`.
    #[wasm_bindgen(constructor)]
    pub fn new(view_json: &str, settings_json: Option<String>) -> Result<LabelSolver, JsValue> {
        Self::create(view_json, settings_json.as_deref()).map_err(to_js)
    }

    #[wasm_bindgen(js_name = setLabels)]
    pub fn set_labels(&mut self, polygon_json: &str) -> Result<(), JsValue> {
        let polygon: Polygon = parse(polygon_json).map_err(to_js)?;
        self.engine.set_labels(polygon);
        Ok(())
    }

    #[wasm_bindgen(js_name = removeLabels)]
    pub fn remove_labels(&mut self, polygon_id: &str) {
        self.engine.remove_labels(&PolygonId::from(polygon_id));
    }

    #[wasm_bindgen(js_name = updateAllLabels)]
    pub fn update_all_labels(&mut self, polygons_json: &str) -> Result<(), JsValue> {
        let polygons: Vec<Polygon> = parse(polygons_json).map_err(to_js)?;
        self.engine.update_all_labels(polygons);
        Ok(())
    }

    #[wasm_bindgen(js_name = setViewport)]
    pub fn set_viewport(&mut self, view_json: &str) -> Result<(), JsValue> {
        let view = parse_view(view_json).map_err(to_js)?;
        self.engine.viewport_changed(view);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.engine.clear();
    }

    #[wasm_bindgen(js_name = updateSettings)]
    pub fn update_settings(&mut self, settings_json: &str) -> Result<(), JsValue> {
        let settings: SolverSettings = parse(settings_json).map_err(to_js)?;
        self.engine.update_settings(&settings);
        Ok(())
    }

    #[wasm_bindgen(js_name = toggleDebugFields)]
    pub fn toggle_debug_fields(&mut self, show: bool) {
        self.engine.toggle_debug_fields(show);
    }

    #[wasm_bindgen(js_name = beginDrag)]
    pub fn begin_drag(&mut self, polygon_id: &str, vertex: usize) -> bool {
        self.engine.begin_drag(&LabelKey::new(polygon_id, vertex))
    }

    #[wasm_bindgen(js_name = dragTo)]
    pub fn drag_to(&mut self, polygon_id: &str, vertex: usize, lat: f64, lon: f64) -> bool {
        self.engine
            .drag_to(&LabelKey::new(polygon_id, vertex), Vertex::new(lat, lon))
    }

    #[wasm_bindgen(js_name = endDrag)]
    pub fn end_drag(&mut self, polygon_id: &str, vertex: usize) -> bool {
        self.engine.end_drag(&LabelKey::new(polygon_id, vertex))
    }

    /// Advance one frame. Returns whether another frame should be scheduled.
    pub fn tick(&mut self) -> bool {
        matches!(self.engine.tick(), TickOutcome::Running { .. })
    }

    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    /// Current labels, leader endpoints and names as JSON.
    pub fn snapshot(&self) -> Result<String, JsValue> {
        self.snapshot_json().map_err(to_js)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEW: &str = r#"{"bounds": {"south": -0.02, "north": 0.02, "west": -0.02, "east": 0.02}, "zoom": 16}"#;

    #[test]
    fn solver_places_labels_and_reports_snapshot() {
        let mut solver = LabelSolver::create(VIEW, Some(r#"{"maxIterations": 60}"#))
            .expect("solver should build");
        let polygon: Polygon = parse(
            r#"{"id": "plot", "name": "Plot", "vertices": [
                {"lat": 0.0, "lon": 0.0},
                {"lat": 0.004, "lon": 0.0},
                {"lat": 0.0, "lon": 0.004}
            ]}"#,
        )
        .expect("polygon json");
        solver.engine.set_labels(polygon);
        let mut frames = 0;
        while solver.tick() {
            frames += 1;
            assert!(frames < 100);
        }
        assert!(!solver.is_running());

        let snapshot: serde_json::Value =
            serde_json::from_str(&solver.snapshot_json().expect("snapshot")).expect("valid json");
        assert_eq!(snapshot["labels"].as_array().map(Vec::len), Some(3));
        assert_eq!(snapshot["names"][0]["text"], "Plot");
    }

    #[test]
    fn rejects_inverted_viewport() {
        let err = parse_view(r#"{"bounds": {"south": 1, "north": 0, "west": 0, "east": 1}, "zoom": 3}"#)
            .unwrap_err();
        assert!(err.contains("inverted"));
    }

    #[test]
    fn drag_pins_label() {
        let mut solver = LabelSolver::create(VIEW, None).expect("solver should build");
        solver
            .engine
            .update_all_labels(vec![Polygon::new(
                "p",
                vec![
                    Vertex::new(0.0, 0.0),
                    Vertex::new(0.004, 0.0),
                    Vertex::new(0.0, 0.004),
                ],
            )]);
        assert!(solver.begin_drag("p", 0));
        assert!(solver.drag_to("p", 0, 0.001, -0.001));
        assert!(solver.end_drag("p", 0));
        while solver.tick() {}
        let label = solver
            .engine
            .label(&LabelKey::new("p", 0))
            .expect("label exists");
        assert_eq!(label.position(), Vertex::new(0.001, -0.001));
    }
}
