// Drives the force solver one animation frame at a time. The host calls
// `tick` from its frame callback; tests call it in a plain loop.

use super::forces::{MotionState, StepContext, step};
use super::types::Label;
use crate::config::ScheduleConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulationPhase {
    #[default]
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Nothing was running.
    Idle,
    /// Steps were taken and the run continues.
    Running { iterations: usize, energy: f64 },
    /// The run ended on this tick.
    Settled {
        iterations: usize,
        energy: f64,
        converged: bool,
    },
}

impl TickOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(self, TickOutcome::Settled { .. })
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    phase: SimulationPhase,
    motion: MotionState,
    iterations: usize,
    previous_energy: Option<f64>,
    stable_ticks: usize,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SimulationPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == SimulationPhase::Running
    }

    /// Steps taken by the current (or last) run.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Begin a run. Does nothing and returns false while one is active.
    pub fn start(&mut self, labels: &[Label]) -> bool {
        if self.is_running() {
            return false;
        }
        self.motion.reset(labels);
        self.iterations = 0;
        self.previous_energy = None;
        self.stable_ticks = 0;
        self.phase = SimulationPhase::Running;
        log::debug!("simulation started with {} labels", labels.len());
        true
    }

    /// Halt immediately, without further steps. Returns whether a run was
    /// active.
    pub fn stop(&mut self) -> bool {
        let was_running = self.is_running();
        self.phase = SimulationPhase::Idle;
        if was_running {
            log::debug!("simulation stopped after {} iterations", self.iterations);
        }
        was_running
    }

    pub fn restart(&mut self, labels: &[Label]) {
        self.stop();
        self.start(labels);
    }

    pub fn tick(
        &mut self,
        labels: &mut [Label],
        ctx: &StepContext<'_>,
        schedule: &ScheduleConfig,
    ) -> TickOutcome {
        if !self.is_running() {
            return TickOutcome::Idle;
        }
        let budget = schedule.max_iterations.saturating_sub(self.iterations);
        let steps = schedule.steps_per_tick.max(1).min(budget);
        let mut total = 0.0;
        for _ in 0..steps {
            total += step(labels, &mut self.motion, ctx);
        }
        self.iterations += steps;
        let energy = if steps == 0 { 0.0 } else { total / steps as f64 };

        let mut converged = energy < schedule.energy_floor;
        if let Some(previous) = self.previous_energy {
            let change = (energy - previous).abs() / previous.max(f64::EPSILON);
            if change <= schedule.energy_change_tolerance {
                self.stable_ticks += 1;
            } else {
                self.stable_ticks = 0;
            }
        }
        self.previous_energy = Some(energy);
        if self.stable_ticks >= schedule.stable_ticks {
            converged = true;
        }
        log::trace!(
            "tick: {} iterations, energy {:.6} px², {} stable ticks",
            self.iterations,
            energy,
            self.stable_ticks
        );

        if converged || self.iterations >= schedule.max_iterations {
            self.phase = SimulationPhase::Idle;
            if converged {
                log::info!(
                    "labels settled after {} iterations (energy {:.6} px²)",
                    self.iterations,
                    energy
                );
            } else {
                log::info!(
                    "iteration budget of {} exhausted (energy {:.6} px²)",
                    schedule.max_iterations,
                    energy
                );
            }
            return TickOutcome::Settled {
                iterations: self.iterations,
                energy,
                converged,
            };
        }
        TickOutcome::Running {
            iterations: self.iterations,
            energy,
        }
    }
}
