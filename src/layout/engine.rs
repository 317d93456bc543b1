use std::collections::HashMap;
use std::sync::Arc;

use super::catalog::{CatalogChanges, LabelCatalog};
use super::debug::debug_fields;
use super::forces::StepContext;
use super::names::place_names;
use super::scheduler::{Scheduler, SimulationPhase, TickOutcome};
use super::types::{DebugField, Label, LabelKey, NameMarker};
use crate::config::{SolverConfig, SolverSettings};
use crate::ir::{Polygon, PolygonId, Vertex};
use crate::projection::Projection;
use crate::render::RenderSink;

/// Result of driving a run synchronously.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub ticks: usize,
    pub iterations: usize,
    pub energy: f64,
    pub converged: bool,
}

/// Owns the labels of every registered polygon and keeps them laid out
/// against the host view `P`, reporting marker changes to `S`.
pub struct LabelEngine<P: Projection, S: RenderSink> {
    config: SolverConfig,
    view: P,
    sink: S,
    polygons: Vec<Polygon>,
    catalog: LabelCatalog,
    scheduler: Scheduler,
    names: Vec<NameMarker>,
    debug: Option<Vec<DebugField>>,
    dragging: Option<LabelKey>,
}

impl<P: Projection, S: RenderSink> LabelEngine<P, S> {
    pub fn new(view: P, sink: S, config: SolverConfig) -> Self {
        Self {
            config,
            view,
            sink,
            polygons: Vec::new(),
            catalog: LabelCatalog::new(),
            scheduler: Scheduler::new(),
            names: Vec::new(),
            debug: None,
            dragging: None,
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn view(&self) -> &P {
        &self.view
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn labels(&self) -> &[Label] {
        self.catalog.labels()
    }

    pub fn label(&self, key: &LabelKey) -> Option<&Label> {
        self.catalog.get(key)
    }

    pub fn names(&self) -> &[NameMarker] {
        &self.names
    }

    /// Rings currently drawn, empty while debug fields are hidden.
    pub fn debug_fields(&self) -> &[DebugField] {
        self.debug.as_deref().unwrap_or(&[])
    }

    pub fn phase(&self) -> SimulationPhase {
        self.scheduler.phase()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Add or replace one polygon and re-select its vertices against the
    /// labels every other polygon already holds.
    pub fn set_labels(&mut self, polygon: Polygon) {
        if !polygon.is_finite() {
            log::warn!("polygon `{}` has a non-finite vertex; ignoring it", polygon.id);
            return;
        }
        let changes = self.catalog.replace_polygon(&polygon, &self.view, &self.config);
        match self.polygons.iter_mut().find(|p| p.id == polygon.id) {
            Some(slot) => *slot = polygon,
            None => self.polygons.push(polygon),
        }
        self.apply_changes(&changes);
        self.restart_simulation();
    }

    pub fn remove_labels(&mut self, polygon: &PolygonId) {
        self.polygons.retain(|p| &p.id != polygon);
        let removed = self.catalog.remove_for_polygon(polygon);
        for key in &removed {
            self.sink.remove_label(key);
        }
        self.refresh_names();
        self.refresh_debug();
        if self.catalog.is_empty() {
            self.scheduler.stop();
        } else {
            self.restart_simulation();
        }
    }

    /// Replace the whole polygon set and rebuild every label.
    /// Rings with non-finite coordinates are skipped; when an id repeats
    /// the last polygon given wins.
    pub fn update_all_labels(&mut self, polygons: Vec<Polygon>) {
        self.polygons = registry(polygons);
        self.rebuild();
    }

    /// The host view moved or zoomed: visibility and pixel scale changed,
    /// so every label is rebuilt.
    pub fn viewport_changed(&mut self, view: P) {
        self.view = view;
        self.rebuild();
    }

    pub fn clear(&mut self) {
        self.scheduler.stop();
        self.polygons.clear();
        self.catalog.clear();
        self.names.clear();
        self.dragging = None;
        self.sink.clear_labels();
        self.sink.clear_names();
        if self.debug.is_some() {
            self.debug = Some(Vec::new());
            self.sink.clear_debug_fields();
        }
    }

    pub fn update_settings(&mut self, settings: &SolverSettings) {
        let before = self.config.clone();
        settings.apply(&mut self.config);
        if self.config == before {
            return;
        }
        if self.config.selection != before.selection || self.config.label != before.label {
            log::debug!("selection settings changed, rebuilding labels");
            self.rebuild();
        } else if !self.catalog.is_empty() {
            self.restart_simulation();
            self.refresh_debug();
        }
    }

    pub fn toggle_debug_fields(&mut self, show: bool) {
        if show {
            self.debug = Some(Vec::new());
            self.refresh_debug();
        } else {
            self.debug = None;
            self.sink.clear_debug_fields();
        }
    }

    /// Hand a label to the user. Physics stops so it does not fight the drag.
    pub fn begin_drag(&mut self, key: &LabelKey) -> bool {
        if self.catalog.get(key).is_none() {
            return false;
        }
        self.scheduler.stop();
        self.dragging = Some(key.clone());
        true
    }

    pub fn drag_to(&mut self, key: &LabelKey, position: Vertex) -> bool {
        let Some(label) = self.catalog.move_label(key, position) else {
            return false;
        };
        self.sink.update_label(label);
        self.sink.update_leader_line(label.key(), &label.leader_line());
        true
    }

    /// Pin the label where it was dropped and let the others settle around it.
    pub fn end_drag(&mut self, key: &LabelKey) -> bool {
        if self.dragging.as_ref() == Some(key) {
            self.dragging = None;
        }
        if !self.catalog.mark_manual(key) {
            return false;
        }
        if let Some(label) = self.catalog.get(key) {
            self.sink.update_label(label);
        }
        self.restart_simulation();
        true
    }

    /// Advance one animation frame.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.scheduler.is_running() {
            return TickOutcome::Idle;
        }
        let obstacles: Vec<Arc<[Vertex]>> = self.catalog.rings().cloned().collect();
        let ctx = StepContext {
            config: &self.config.forces,
            local_per_px: self.view.local_per_px(),
            bounds: self.view.viewport_bounds(),
            obstacles: &obstacles,
        };
        let outcome = self
            .scheduler
            .tick(self.catalog.labels_mut(), &ctx, &self.config.schedule);
        self.render_labels();
        if outcome.is_settled() {
            self.refresh_names();
            self.refresh_debug();
        }
        outcome
    }

    /// Drive ticks until the current run settles, starting one if idle and
    /// there is anything to lay out.
    pub fn run_to_completion(&mut self) -> RunSummary {
        if !self.scheduler.is_running() && !self.catalog.is_empty() {
            self.scheduler.start(self.catalog.labels());
        }
        let mut summary = RunSummary {
            ticks: 0,
            iterations: 0,
            energy: 0.0,
            converged: false,
        };
        loop {
            match self.tick() {
                TickOutcome::Idle => break,
                TickOutcome::Running { iterations, energy } => {
                    summary.ticks += 1;
                    summary.iterations = iterations;
                    summary.energy = energy;
                }
                TickOutcome::Settled {
                    iterations,
                    energy,
                    converged,
                } => {
                    summary.ticks += 1;
                    summary.iterations = iterations;
                    summary.energy = energy;
                    summary.converged = converged;
                    break;
                }
            }
        }
        summary
    }

    fn rebuild(&mut self) {
        let changes = self
            .catalog
            .rebuild_all(&self.polygons, &self.view, &self.config);
        self.sink.clear_labels();
        self.apply_changes(&CatalogChanges {
            removed: Vec::new(),
            added: changes.added,
        });
        self.restart_simulation();
    }

    fn apply_changes(&mut self, changes: &CatalogChanges) {
        for key in &changes.removed {
            if self.catalog.get(key).is_none() {
                self.sink.remove_label(key);
            }
        }
        self.render_labels();
        self.refresh_names();
        self.refresh_debug();
    }

    fn restart_simulation(&mut self) {
        if self.dragging.is_some() {
            return;
        }
        if self.catalog.is_empty() {
            self.scheduler.stop();
            return;
        }
        self.scheduler.restart(self.catalog.labels());
    }

    fn render_labels(&mut self) {
        for label in self.catalog.labels() {
            self.sink.update_label(label);
            self.sink.update_leader_line(label.key(), &label.leader_line());
        }
    }

    fn refresh_names(&mut self) {
        self.names = place_names(
            &self.polygons,
            self.catalog.labels(),
            &self.view,
            &self.config.names,
        );
        self.sink.clear_names();
        for marker in &self.names {
            self.sink.update_name(marker);
        }
    }

    fn refresh_debug(&mut self) {
        if self.debug.is_none() {
            return;
        }
        let fields = debug_fields(
            self.catalog.labels(),
            self.catalog.rings(),
            &self.view,
            &self.config,
        );
        self.sink.clear_debug_fields();
        self.sink.draw_debug_fields(&fields);
        self.debug = Some(fields);
    }
}

fn registry(polygons: Vec<Polygon>) -> Vec<Polygon> {
    let mut slots: HashMap<PolygonId, usize> = HashMap::new();
    let mut kept: Vec<Polygon> = Vec::with_capacity(polygons.len());
    for polygon in polygons {
        if !polygon.is_finite() {
            log::warn!("polygon `{}` has a non-finite vertex; ignoring it", polygon.id);
            continue;
        }
        match slots.get(&polygon.id) {
            Some(&slot) => {
                log::warn!("polygon id `{}` given twice; keeping the last", polygon.id);
                kept[slot] = polygon;
            }
            None => {
                slots.insert(polygon.id.clone(), kept.len());
                kept.push(polygon);
            }
        }
    }
    kept
}
