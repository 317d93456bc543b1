// Authoritative set of active labels, one per selected vertex.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use super::geometry::vertex_angle;
use super::selection::{AcceptedVertex, SelectionBatch};
use super::types::{Label, LabelKey};
use crate::config::SolverConfig;
use crate::ir::{Polygon, PolygonId, Vertex};
use crate::projection::Projection;
use crate::text_metrics::label_size;

/// Keys touched by a catalog update, for the render sink.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CatalogChanges {
    pub removed: Vec<LabelKey>,
    pub added: Vec<LabelKey>,
}

#[derive(Debug, Default)]
pub struct LabelCatalog {
    labels: Vec<Label>,
    rings: BTreeMap<PolygonId, Arc<[Vertex]>>,
}

impl LabelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub(crate) fn labels_mut(&mut self) -> &mut [Label] {
        &mut self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, key: &LabelKey) -> Option<&Label> {
        self.labels.iter().find(|label| &label.key == key)
    }

    /// Ring snapshots of every polygon known to the catalog.
    pub fn rings(&self) -> impl Iterator<Item = &Arc<[Vertex]>> {
        self.rings.values()
    }

    /// Rebuild every label from scratch. Manual positions survive when the
    /// same (polygon, vertex) is selected again.
    pub fn rebuild_all<'a>(
        &mut self,
        polygons: impl IntoIterator<Item = &'a Polygon>,
        view: &dyn Projection,
        config: &SolverConfig,
    ) -> CatalogChanges {
        let saved = self.manual_positions();
        let removed: Vec<LabelKey> = self.labels.drain(..).map(|label| label.key).collect();
        self.rings.clear();

        let mut batch = SelectionBatch::new(saved.keys().cloned().collect());
        let mut processed: Vec<&Polygon> = Vec::new();
        for polygon in unique_finite(polygons) {
            self.rings
                .insert(polygon.id.clone(), Arc::from(polygon.vertices.as_slice()));
            if !polygon.is_labelable() {
                log::warn!(
                    "polygon `{}` has {} vertices; at least 3 are needed for labels",
                    polygon.id,
                    polygon.vertices.len()
                );
                continue;
            }
            batch.select(polygon, view, &config.selection);
            processed.push(polygon);
        }

        let added = self.insert_accepted(batch.accepted, &saved, config);
        log::debug!(
            "rebuilt label catalog: {} polygons, {} labels, {} manual restored",
            processed.len(),
            self.labels.len(),
            self.labels.iter().filter(|l| l.manually_positioned).count()
        );
        CatalogChanges { removed, added }
    }

    /// Replace the labels of one polygon, selecting its vertices against the
    /// labels every other polygon already holds.
    pub fn replace_polygon(
        &mut self,
        polygon: &Polygon,
        view: &dyn Projection,
        config: &SolverConfig,
    ) -> CatalogChanges {
        let saved: HashMap<LabelKey, Vertex> = self
            .manual_positions()
            .into_iter()
            .filter(|(key, _)| key.polygon == polygon.id)
            .collect();
        let mut removed = self.take_polygon(&polygon.id);
        if !polygon.is_finite() {
            log::warn!("polygon `{}` has a non-finite vertex; ignoring it", polygon.id);
            self.rings.remove(&polygon.id);
            return CatalogChanges {
                removed,
                added: Vec::new(),
            };
        }
        self.rings
            .insert(polygon.id.clone(), Arc::from(polygon.vertices.as_slice()));
        if !polygon.is_labelable() {
            log::warn!(
                "polygon `{}` has {} vertices; at least 3 are needed for labels",
                polygon.id,
                polygon.vertices.len()
            );
            return CatalogChanges {
                removed,
                added: Vec::new(),
            };
        }

        let mut pinned: HashSet<LabelKey> = saved.keys().cloned().collect();
        let mut batch = SelectionBatch::default();
        for label in &self.labels {
            if label.manually_positioned {
                pinned.insert(label.key.clone());
            }
            batch.seed(AcceptedVertex {
                key: label.key.clone(),
                vertex: label.anchor,
                angle: vertex_angle(&label.ring, label.key.vertex),
                initial: label.position,
            });
        }
        batch.pinned = pinned;
        batch.select(polygon, view, &config.selection);

        for key in &batch.evicted {
            if let Some(idx) = self.index_of(key) {
                self.labels.remove(idx);
                removed.push(key.clone());
            }
        }
        let fresh: Vec<AcceptedVertex> = batch
            .accepted
            .into_iter()
            .filter(|entry| entry.key.polygon == polygon.id)
            .collect();
        let added = self.insert_accepted(fresh, &saved, config);
        log::debug!(
            "replaced labels of `{}`: {} removed, {} added",
            polygon.id,
            removed.len(),
            added.len()
        );
        CatalogChanges { removed, added }
    }

    /// Drop every label and the ring snapshot of `polygon`.
    pub fn remove_for_polygon(&mut self, polygon: &PolygonId) -> Vec<LabelKey> {
        self.rings.remove(polygon);
        self.take_polygon(polygon)
    }

    /// Flag a label as user-placed. Returns false for unknown keys.
    pub fn mark_manual(&mut self, key: &LabelKey) -> bool {
        match self.index_of(key) {
            Some(idx) => {
                self.labels[idx].manually_positioned = true;
                true
            }
            None => false,
        }
    }

    /// Move a label under direct user control.
    pub fn move_label(&mut self, key: &LabelKey, position: Vertex) -> Option<&Label> {
        if !position.is_finite() {
            return None;
        }
        let idx = self.index_of(key)?;
        self.labels[idx].position = position;
        Some(&self.labels[idx])
    }

    pub fn clear(&mut self) -> Vec<LabelKey> {
        self.rings.clear();
        self.labels.drain(..).map(|label| label.key).collect()
    }

    fn index_of(&self, key: &LabelKey) -> Option<usize> {
        self.labels.iter().position(|label| &label.key == key)
    }

    fn manual_positions(&self) -> HashMap<LabelKey, Vertex> {
        self.labels
            .iter()
            .filter(|label| label.manually_positioned)
            .map(|label| (label.key.clone(), label.position))
            .collect()
    }

    fn take_polygon(&mut self, polygon: &PolygonId) -> Vec<LabelKey> {
        let mut removed = Vec::new();
        self.labels.retain(|label| {
            if &label.key.polygon == polygon {
                removed.push(label.key.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    fn insert_accepted(
        &mut self,
        accepted: Vec<AcceptedVertex>,
        saved: &HashMap<LabelKey, Vertex>,
        config: &SolverConfig,
    ) -> Vec<LabelKey> {
        let mut added = Vec::with_capacity(accepted.len());
        for entry in accepted {
            let Some(ring) = self.rings.get(&entry.key.polygon).cloned() else {
                continue;
            };
            let text = super::types::label_text(entry.vertex);
            let size = label_size(&text, &config.label);
            let mut label = Label::new(entry.key.clone(), entry.vertex, entry.initial, size, ring);
            if let Some(position) = saved.get(&entry.key) {
                label.position = *position;
                label.manually_positioned = true;
            }
            added.push(entry.key);
            self.labels.push(label);
        }
        self.labels.sort_by(|a, b| a.key.cmp(&b.key));
        added
    }
}

/// Drop rings with non-finite coordinates and keep only the last polygon
/// given for each id, at the slot of its first appearance.
fn unique_finite<'a>(polygons: impl IntoIterator<Item = &'a Polygon>) -> Vec<&'a Polygon> {
    let mut slots: HashMap<&'a PolygonId, usize> = HashMap::new();
    let mut kept: Vec<&'a Polygon> = Vec::new();
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
                slots.insert(&polygon.id, kept.len());
                kept.push(polygon);
            }
        }
    }
    kept
}
