// One integration step of the label solver.
//
// Positions live in degrees but every force law is evaluated in screen
// pixels: distances are divided by `local_per_px` before use and the summed
// force is scaled back just before integration.

use std::sync::Arc;

use super::geometry::{
    LabelBox, clamp_center_to_bounds, overlap_depth, ring_centroid, segment_intersects_box,
};
use super::types::Label;
use crate::config::ForceConfig;
use crate::ir::{Bounds, Vertex};

/// Below this separation (degrees) a direction cannot be normalised.
const DIRECTION_EPS: f64 = 1e-5;
/// Tolerance for recognising a label's own anchor among ring vertices.
const ANCHOR_EPS: f64 = 1e-6;
/// Added to the center distance (px) of overlapping labels.
const PENETRATION_EPS_PX: f64 = 1.0;
/// Inverse-power laws never divide by less than one pixel.
const MIN_FORCE_DISTANCE_PX: f64 = 1.0;

/// Everything a step needs besides the labels themselves.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub config: &'a ForceConfig,
    /// Degrees per screen pixel.
    pub local_per_px: f64,
    pub bounds: Bounds,
    /// Ring snapshots of every polygon; their vertices repel labels.
    pub obstacles: &'a [Arc<[Vertex]>],
}

impl StepContext<'_> {
    /// Separation below which no direction is taken. Never more than a
    /// hundredth of a pixel so deep zooms keep their short-range forces.
    pub fn direction_eps(&self) -> f64 {
        DIRECTION_EPS.min(self.local_per_px * 0.01)
    }
}

/// Force in pixel units, x = east, y = north.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Force {
    pub x: f64,
    pub y: f64,
}

impl Force {
    fn add(&mut self, x: f64, y: f64) {
        self.x += x;
        self.y += y;
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// Verlet history: the position each label held before the last step.
#[derive(Debug, Clone, Default)]
pub struct MotionState {
    previous: Vec<Vertex>,
}

impl MotionState {
    /// Zero every implicit velocity.
    pub fn reset(&mut self, labels: &[Label]) {
        self.previous = labels.iter().map(|label| label.position).collect();
    }

    pub fn len(&self) -> usize {
        self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }
}

fn buffered_box(label: &Label, ctx: &StepContext<'_>) -> LabelBox {
    let (half_w, half_h) = label.half_extent(ctx.local_per_px);
    let buffer = ctx.config.label_buffer_px * ctx.local_per_px;
    LabelBox::around(label.position.xy(), half_w + buffer, half_h + buffer)
}

/// Push away from nearby ring vertices of any polygon, hard cutoff at the
/// padding radius.
pub fn vertex_padding_force(label: &Label, ctx: &StepContext<'_>) -> Force {
    let cfg = ctx.config;
    let mut force = Force::default();
    if cfg.vertex_repulsion_strength == 0.0 {
        return force;
    }
    for ring in ctx.obstacles {
        for vertex in ring.iter() {
            if vertex.approx_eq(&label.anchor, ANCHOR_EPS) {
                continue;
            }
            let dx = label.position.lon - vertex.lon;
            let dy = label.position.lat - vertex.lat;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist < ctx.direction_eps() {
                continue;
            }
            let dist_px = dist / ctx.local_per_px;
            if dist_px >= cfg.vertex_padding_px {
                continue;
            }
            let magnitude = cfg.vertex_repulsion_strength
                / dist_px.max(MIN_FORCE_DISTANCE_PX).powf(cfg.falloff);
            force.add(dx / dist * magnitude, dy / dist * magnitude);
        }
    }
    force
}

/// Spring toward the anchor. Odd vertices pull twice as hard when the
/// alternate boost is on.
pub fn anchor_spring_force(label: &Label, ctx: &StepContext<'_>) -> Force {
    let cfg = ctx.config;
    let mut strength = cfg.spring_strength;
    if cfg.alternate_spring_boost && label.key.vertex % 2 == 1 {
        strength *= 2.0;
    }
    Force {
        x: strength * (label.anchor.lon - label.position.lon) / ctx.local_per_px,
        y: strength * (label.anchor.lat - label.position.lat) / ctx.local_per_px,
    }
}

/// Gentle outward bias from the owning polygon's centroid, one power weaker
/// than the vertex falloff.
pub fn center_repulsion_force(label: &Label, ctx: &StepContext<'_>) -> Force {
    let cfg = ctx.config;
    if cfg.center_repulsion_strength == 0.0 {
        return Force::default();
    }
    let Some(center) = ring_centroid(&label.ring) else {
        return Force::default();
    };
    let dx = label.position.lon - center.lon;
    let dy = label.position.lat - center.lat;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist < ctx.direction_eps() {
        return Force::default();
    }
    let dist_px = dist / ctx.local_per_px;
    let magnitude = cfg.center_repulsion_strength
        / dist_px
            .max(MIN_FORCE_DISTANCE_PX)
            .powf(cfg.falloff - 1.0);
    Force {
        x: dx / dist * magnitude,
        y: dy / dist * magnitude,
    }
}

/// Force on `a` from overlapping `b`; `b` receives the negation.
pub fn label_pair_force(a: &Label, b: &Label, ctx: &StepContext<'_>) -> Option<Force> {
    let cfg = ctx.config;
    let box_a = buffered_box(a, ctx);
    let box_b = buffered_box(b, ctx);
    let (depth_x, depth_y) = overlap_depth(&box_a, &box_b);
    if depth_x <= 0.0 || depth_y <= 0.0 {
        return None;
    }

    let dx = a.position.lon - b.position.lon;
    let dy = a.position.lat - b.position.lat;
    let sign_x = if dx == 0.0 { 1.0 } else { dx.signum() };
    let sign_y = if dy == 0.0 { 1.0 } else { dy.signum() };
    let mut force = Force {
        x: sign_x * depth_x / ctx.local_per_px * cfg.label_repulsion_strength,
        y: sign_y * depth_y / ctx.local_per_px * cfg.label_repulsion_strength,
    };

    let dist = (dx * dx + dy * dy).sqrt();
    if dist < ctx.direction_eps() {
        force.add(cfg.label_penetration_strength, 0.0);
    } else {
        let magnitude = cfg.label_penetration_strength
            / (dist / ctx.local_per_px + PENETRATION_EPS_PX);
        force.add(dx / dist * magnitude, dy / dist * magnitude);
    }
    Some(force)
}

/// Push `label` off the leader line of `other` when that line crosses it.
pub fn leader_avoidance_force(label: &Label, other: &Label, ctx: &StepContext<'_>) -> Force {
    let strength = ctx.config.leader_avoidance_strength;
    if strength == 0.0 {
        return Force::default();
    }
    let rect = buffered_box(label, ctx);
    let from = other.anchor.xy();
    let to = other.position.xy();
    if !segment_intersects_box(from, to, &rect) {
        return Force::default();
    }
    let mid = ((from.0 + to.0) * 0.5, (from.1 + to.1) * 0.5);
    let dx = label.position.lon - mid.0;
    let dy = label.position.lat - mid.1;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist < ctx.direction_eps() {
        return Force::default();
    }
    Force {
        x: dx / dist * strength,
        y: dy / dist * strength,
    }
}

/// Net force on every label, in pixel units, index-aligned with `labels`.
pub fn accumulate_forces(labels: &[Label], ctx: &StepContext<'_>) -> Vec<Force> {
    let mut forces: Vec<Force> = labels
        .iter()
        .map(|label| {
            let mut force = vertex_padding_force(label, ctx);
            let spring = anchor_spring_force(label, ctx);
            let center = center_repulsion_force(label, ctx);
            force.add(spring.x + center.x, spring.y + center.y);
            force
        })
        .collect();

    for i in 0..labels.len() {
        for j in (i + 1)..labels.len() {
            if let Some(push) = label_pair_force(&labels[i], &labels[j], ctx) {
                forces[i].add(push.x, push.y);
                forces[j].add(-push.x, -push.y);
            }
        }
    }

    for i in 0..labels.len() {
        for j in 0..labels.len() {
            if i == j {
                continue;
            }
            let push = leader_avoidance_force(&labels[i], &labels[j], ctx);
            forces[i].add(push.x, push.y);
        }
    }
    forces
}

/// Advance every non-manual label by one damped Verlet step and apply the
/// anchor and viewport constraints. Returns the step's kinetic energy: the
/// sum of squared displacements in px².
pub fn step(labels: &mut [Label], motion: &mut MotionState, ctx: &StepContext<'_>) -> f64 {
    if motion.previous.len() != labels.len() {
        motion.reset(labels);
    }
    let forces = accumulate_forces(labels, ctx);
    let cfg = ctx.config;
    let scale = ctx.local_per_px;
    let max_distance = cfg.max_label_distance_px * scale;
    let padding = cfg.viewport_padding_px * scale;
    let mut energy = 0.0;

    for ((label, previous), force) in labels
        .iter_mut()
        .zip(motion.previous.iter_mut())
        .zip(forces)
    {
        let current = label.position;
        if label.manually_positioned {
            *previous = current;
            continue;
        }

        let vx = (current.lon - previous.lon) * cfg.damping;
        let vy = (current.lat - previous.lat) * cfg.damping;
        let mut next = Vertex::new(
            current.lat + vy + force.y * cfg.force_scale * scale,
            current.lon + vx + force.x * cfg.force_scale * scale,
        );
        if !next.is_finite() {
            log::warn!("label {:?} produced a non-finite position", label.key);
            *previous = current;
            continue;
        }
        let mut prev_next = current;

        let dx = next.lon - label.anchor.lon;
        let dy = next.lat - label.anchor.lat;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist > max_distance && dist > 0.0 {
            let k = max_distance / dist;
            next = Vertex::new(label.anchor.lat + dy * k, label.anchor.lon + dx * k);
            prev_next = damp_previous(next, prev_next);
        }

        let (half_w, half_h) = label.half_extent(scale);
        let clamped = Vertex::from_xy(clamp_center_to_bounds(
            next.xy(),
            half_w + padding,
            half_h + padding,
            &ctx.bounds,
        ));
        if clamped != next {
            next = clamped;
            prev_next = damp_previous(next, prev_next);
        }

        let moved_x = (next.lon - current.lon) / scale;
        let moved_y = (next.lat - current.lat) / scale;
        energy += moved_x * moved_x + moved_y * moved_y;
        label.position = next;
        *previous = prev_next;
    }
    energy
}

/// Halve the implied velocity after a constraint moved the label.
fn damp_previous(next: Vertex, previous: Vertex) -> Vertex {
    Vertex::new(
        next.lat - (next.lat - previous.lat) * 0.5,
        next.lon - (next.lon - previous.lon) * 0.5,
    )
}
