use crate::ir::{Bounds, Vertex};
use crate::layout::{DebugField, RunSummary};
use crate::projection::Projection;
use crate::render::MarkerStore;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub zoom: i32,
    pub viewport: Bounds,
    pub labels: Vec<LabelDump>,
    pub names: Vec<NameDump>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub debug_fields: Vec<DebugField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converged: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDump {
    pub polygon_id: String,
    pub vertex_index: usize,
    pub text: String,
    pub anchor: Vertex,
    pub position: Vertex,
    pub width: f64,
    pub height: f64,
    pub manual: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameDump {
    pub polygon_id: String,
    pub text: String,
    pub position: Vertex,
    pub color: Option<String>,
}

impl LayoutDump {
    pub fn from_store(store: &MarkerStore, view: &dyn Projection, run: Option<&RunSummary>) -> Self {
        let labels = store
            .labels
            .values()
            .map(|marker| LabelDump {
                polygon_id: marker.key.polygon.to_string(),
                vertex_index: marker.key.vertex,
                text: marker.text.clone(),
                anchor: marker.anchor,
                position: marker.position,
                width: marker.size.width,
                height: marker.size.height,
                manual: marker.manual,
            })
            .collect();
        let names = store
            .names
            .values()
            .map(|name| NameDump {
                polygon_id: name.polygon.to_string(),
                text: name.text.clone(),
                position: name.position,
                color: name.color.clone(),
            })
            .collect();

        LayoutDump {
            zoom: view.zoom(),
            viewport: view.viewport_bounds(),
            labels,
            names,
            debug_fields: store.debug_fields.clone(),
            iterations: run.map(|r| r.iterations),
            converged: run.map(|r| r.converged),
        }
    }
}

pub fn write_layout_dump(
    path: Option<&Path>,
    store: &MarkerStore,
    view: &dyn Projection,
    run: Option<&RunSummary>,
) -> anyhow::Result<()> {
    let dump = LayoutDump::from_store(store, view, run);
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            println!("{}", serde_json::to_string_pretty(&dump)?);
        }
    }
    Ok(())
}
