#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod projection;
pub mod render;
pub mod scene;
pub mod text_metrics;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, SolverConfig, SolverSettings, load_config};
pub use ir::{Bounds, Polygon, PolygonId, Vertex};
pub use layout::{LabelEngine, LabelKey, RunSummary, TickOutcome};
pub use projection::{Projection, WebMercatorView};
pub use render::{MarkerStore, RenderSink, render_svg};
pub use scene::{Scene, SceneError, load_scene, parse_scene};
