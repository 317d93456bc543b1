mod catalog;
mod debug;
mod engine;
mod forces;
pub mod geometry;
mod names;
mod scheduler;
mod selection;
pub(crate) mod types;
pub use types::*;

pub use catalog::{CatalogChanges, LabelCatalog};
pub use debug::debug_fields;
pub use engine::{LabelEngine, RunSummary};
pub use forces::{
    Force, MotionState, StepContext, accumulate_forces, anchor_spring_force,
    center_repulsion_force, label_pair_force, leader_avoidance_force, step, vertex_padding_force,
};
pub use geometry::{LabelBox, segment_intersects_box, vertex_angle};
pub use names::place_names;
pub use scheduler::{Scheduler, SimulationPhase, TickOutcome};
