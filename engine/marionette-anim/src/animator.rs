//! Per-character solver and pose, and crowd updates

use std::sync::Arc;

use log::debug;

use crate::config::EngineConfig;
use crate::loader::AssetLoader;
use crate::pose::{BodyState, Pose};
use crate::sequence::{EventBatch, Sequence};
use crate::skeleton::Skeleton;
use crate::solver::{AnimationSolver, SolveRequest};

/// Everything one character needs to animate
#[derive(Debug)]
pub struct Animator {
    pub solver: AnimationSolver,
    pub pose: Pose,
    /// Tick up to which events have been reported
    event_barrier: u64,
}

impl Animator {
    pub fn new(solver: AnimationSolver) -> Self {
        let pose = Pose::new(Arc::clone(solver.base()));
        Self {
            solver,
            pose,
            event_barrier: 0,
        }
    }

    /// Animator on `base`, seeded as configured
    pub fn from_config(
        loader: Arc<dyn AssetLoader>,
        base: Arc<Skeleton>,
        config: &EngineConfig,
    ) -> Self {
        Self::new(AnimationSolver::from_config(loader, base, config))
    }

    /// Resolve `request` and start the resulting clip
    pub fn start_action(
        &mut self,
        request: &SolveRequest,
        body_state: BodyState,
        force: bool,
        now: u64,
    ) -> bool {
        match self.solver.solve_anim(request) {
            Some(seq) => self
                .pose
                .start_anim(&self.solver, &seq, body_state, force, now),
            None => {
                debug!("Action {} did not resolve", request.action);
                false
            }
        }
    }

    /// Resolve `request` and continue (or begin) an attack combo with it
    pub fn continue_combo(
        &mut self,
        request: &SolveRequest,
        body_state: BodyState,
        now: u64,
    ) -> Option<Arc<Sequence>> {
        let seq = self.solver.solve_anim(request)?;
        self.pose.continue_combo(&self.solver, &seq, body_state, now)
    }

    /// Advance to `now`: expire overlays, then update the pose
    pub fn tick(&mut self, now: u64) -> bool {
        self.solver.expire_overlays(now);
        self.pose.update(&self.solver, now)
    }

    /// Events crossed since the previous call
    pub fn drain_events(&mut self, now: u64, out: &mut EventBatch) {
        self.pose.process_events(&mut self.event_barrier, now, out);
    }
}

/// Tick every animator to `now`, returning how many changed their clips
///
/// Crowds of at least `config.parallel_threshold` animators are ticked on
/// the rayon pool.
#[cfg(feature = "parallel")]
pub fn update_all(animators: &mut [Animator], now: u64, config: &EngineConfig) -> usize {
    use rayon::prelude::*;

    if animators.len() < config.parallel_threshold {
        return update_sequential(animators, now);
    }
    animators
        .par_iter_mut()
        .map(|animator| usize::from(animator.tick(now)))
        .sum()
}

/// Tick every animator to `now`, returning how many changed their clips
#[cfg(not(feature = "parallel"))]
pub fn update_all(animators: &mut [Animator], now: u64, _config: &EngineConfig) -> usize {
    update_sequential(animators, now)
}

fn update_sequential(animators: &mut [Animator], now: u64) -> usize {
    animators
        .iter_mut()
        .map(|animator| usize::from(animator.tick(now)))
        .sum()
}
