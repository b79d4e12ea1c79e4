//! Layered playback state of one character
//!
//! A [`Pose`] owns the clips a character is currently playing, at most one per
//! layer index, and the blended bone matrices they produce. Layers are kept in
//! ascending layer order; higher layers override lower ones bone by bone.
//!
//! The per-tick entry points never fail: a clip that cannot start, a missing
//! bridge transition or an unresolved successor is reported through the
//! returned `bool` / `Option` and leaves the pose consistent.

mod blend;
mod layer;
mod persist;

pub use layer::{BodyState, Layer};
pub use persist::{LayerState, PoseState};

use std::sync::Arc;

use glam::{Mat4, Vec3};
use log::{debug, trace};

use crate::sequence::{EventBatch, Sequence, SequenceClass};
use crate::skeleton::Skeleton;
use crate::solver::{Action, AnimationSolver, ItemUse, SolveRequest, WalkMode, WeaponState};

/// Blended skeleton pose plus the layers that drive it
#[derive(Debug, Clone)]
pub struct Pose {
    skeleton: Arc<Skeleton>,
    layers: Vec<Layer>,
    /// Local bind transforms, copied into `base` before sampling
    bind: Vec<Mat4>,
    /// Local transforms of the current tick
    base: Vec<Mat4>,
    /// Global transforms of the current tick
    transforms: Vec<Mat4>,
    combo_len: u16,
    rotation: Option<u64>,
    item_use: Option<u64>,
    next_layer_id: u64,
}

impl Pose {
    /// Bind pose of `skeleton` with no layers
    pub fn new(skeleton: Arc<Skeleton>) -> Self {
        let bind: Vec<Mat4> = skeleton.nodes().iter().map(|n| n.transform).collect();
        let transforms = skeleton.bind_global().to_vec();
        Self {
            base: bind.clone(),
            bind,
            transforms,
            skeleton,
            layers: Vec::new(),
            combo_len: 0,
            rotation: None,
            item_use: None,
            next_layer_id: 1,
        }
    }

    /// Pose of a single clip frozen `phase` ms into playback
    pub fn snapshot(skeleton: Arc<Skeleton>, seq: Arc<Sequence>, phase: u64) -> Self {
        let mut pose = Self::new(skeleton);
        pose.insert_layer(seq, BodyState::empty(), 0);
        pose.update_animation(phase);
        pose
    }

    /// Drop every layer and return to the bind pose
    pub fn reset(&mut self) {
        self.stop_all();
        self.base.copy_from_slice(&self.bind);
        self.transforms.copy_from_slice(self.skeleton.bind_global());
    }

    /// Rebind to another skeleton; all layers are dropped
    pub fn set_skeleton(&mut self, skeleton: Arc<Skeleton>) {
        let next_layer_id = self.next_layer_id;
        *self = Self::new(skeleton);
        self.next_layer_id = next_layer_id;
    }

    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    /// Layers in ascending layer order
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Global bone transforms, indexed like the skeleton's nodes
    pub fn transforms(&self) -> &[Mat4] {
        &self.transforms
    }

    /// Local bone transforms after blending, before hierarchy composition
    pub fn local_transforms(&self) -> &[Mat4] {
        &self.base
    }

    pub fn bone(&self, index: usize) -> Option<Mat4> {
        self.transforms.get(index).copied()
    }

    /// Layer currently playing at layer index `index`
    pub fn layer_at(&self, index: u32) -> Option<&Layer> {
        self.layers.iter().find(|l| l.seq.layer() == index)
    }

    /// Start `seq`, bridging from whatever plays on its layer
    ///
    /// Returns `false` when the request was refused: the current clip cannot
    /// be interrupted yet, or an item interaction is already in progress.
    pub fn start_anim(
        &mut self,
        solver: &AnimationSolver,
        seq: &Arc<Sequence>,
        body_state: BodyState,
        force: bool,
        now: u64,
    ) -> bool {
        if body_state.contains(BodyState::ITEM_INTERACT)
            && self.layers.iter().any(|l| {
                l.body_state.contains(BodyState::ITEM_INTERACT) && l.seq.name() != seq.name()
            })
        {
            debug!("Refusing '{}': item interaction in progress", seq.name());
            return false;
        }

        let Some(pos) = self.position_of_layer(seq.layer()) else {
            trace!("Layer {}: start '{}' at {}", seq.layer(), seq.name(), now);
            self.insert_layer(Arc::clone(seq), body_state, now);
            return true;
        };

        let current = &self.layers[pos];
        let elapsed = current.elapsed(now);
        let finished = current.seq.is_finished(elapsed, self.combo_len);
        let interruptible = current.seq.can_interrupt(elapsed, self.combo_len);

        if current.seq.name() == seq.name()
            && current.body_state == body_state
            && (force || finished || interruptible)
        {
            return true;
        }
        if !force && !interruptible && !finished {
            trace!(
                "Layer {}: '{}' is busy, ignoring '{}'",
                seq.layer(),
                current.seq.name(),
                seq.name()
            );
            return false;
        }

        let from = Arc::clone(&current.seq);
        let clip = self
            .find_bridge(solver, &from, seq, now)
            .unwrap_or_else(|| Arc::clone(seq));
        debug!(
            "Layer {}: '{}' -> '{}' at {}",
            seq.layer(),
            from.name(),
            clip.name(),
            now
        );
        self.remove_at(pos);
        self.insert_layer(clip, body_state, now);
        // The combo stage belongs to the attack; other layers leave it alone
        if from.is_attack() {
            self.combo_len = 0;
        }
        true
    }

    /// Transition clip that leads from `from` into `to`, if one exists
    fn find_bridge(
        &self,
        solver: &AnimationSolver,
        from: &Sequence,
        to: &Sequence,
        now: u64,
    ) -> Option<Arc<Sequence>> {
        let source = from.short_name();
        let target = to.short_name();

        if let (Some(source), Some(target)) = (source, target) {
            if let Some(bridge) = solver.solve_frm_at(&format!("T_{source}_2_{target}"), now) {
                return Some(bridge);
            }
        }
        if let Some(target) = target {
            if let Some(bridge) = solver.solve_frm_at(&format!("T_STAND_2_{target}"), now) {
                return Some(bridge);
            }
        }
        if to.is_idle() {
            if let Some(source) = source {
                return solver.solve_frm_at(&format!("T_{source}_2_STAND"), now);
            }
        }
        None
    }

    /// Stop the layer playing the clip named `name`
    pub fn stop_anim(&mut self, name: &str) -> bool {
        match self
            .layers
            .iter()
            .position(|l| l.seq.name().eq_ignore_ascii_case(name))
        {
            Some(pos) => {
                self.remove_at(pos);
                true
            }
            None => false,
        }
    }

    /// Stop every locomotion layer
    pub fn stop_walk_anim(&mut self) -> usize {
        self.remove_where(|l| l.seq.is_move() || l.body_state.intersects(BodyState::LOCOMOTION))
    }

    /// Stop everything except death and unconsciousness
    pub fn interrupt(&mut self) -> usize {
        self.combo_len = 0;
        self.remove_where(|l| !l.body_state.intersects(BodyState::PERSISTENT))
    }

    pub fn stop_all(&mut self) {
        self.layers.clear();
        self.rotation = None;
        self.item_use = None;
        self.combo_len = 0;
    }

    /// Advance finished transitions and recompute the pose
    ///
    /// Successors resolve against the overlays live at `now`; overlays past
    /// their expiry are skipped even if the solver still holds them.
    /// Returns whether the set of playing clips changed.
    pub fn update(&mut self, solver: &AnimationSolver, now: u64) -> bool {
        let mut changed = false;
        let mut resort = false;

        let mut i = 0;
        while i < self.layers.len() {
            let seq = Arc::clone(&self.layers[i].seq);
            let elapsed = self.layers[i].elapsed(now);
            if seq.class() != SequenceClass::Transition || !seq.is_finished(elapsed, self.combo_len) {
                i += 1;
                continue;
            }

            changed = true;
            if seq.is_attack() {
                self.combo_len = 0;
            }
            match solver.solve_next_at(&seq, now) {
                Some(next) => {
                    trace!("Layer {}: '{}' -> '{}'", seq.layer(), seq.name(), next.name());
                    resort |= next.layer() != seq.layer();
                    let layer = &mut self.layers[i];
                    layer.seq = next;
                    layer.start = now;
                    i += 1;
                }
                None => {
                    trace!("Layer {}: '{}' finished", seq.layer(), seq.name());
                    self.remove_at(i);
                }
            }
        }

        if resort {
            self.resort();
        }
        self.update_animation(now);
        changed
    }

    /// Continue an attack combo with `seq`
    ///
    /// While `seq` plays, a request inside combo window `k` extends the attack
    /// to stage `k + 1` without restarting it; a request outside every window
    /// resets the combo and is ignored. Otherwise `seq` is force-started.
    pub fn continue_combo(
        &mut self,
        solver: &AnimationSolver,
        seq: &Arc<Sequence>,
        body_state: BodyState,
        now: u64,
    ) -> Option<Arc<Sequence>> {
        let playing = self
            .layers
            .iter()
            .find(|l| l.seq.name() == seq.name())
            .map(|l| (Arc::clone(&l.seq), l.seq.combo_window_at(l.elapsed(now))));

        if let Some((current, window)) = playing {
            return match window {
                Some(k) => {
                    self.combo_len = u16::try_from(k + 1).unwrap_or(u16::MAX);
                    trace!("'{}': combo stage {}", current.name(), self.combo_len);
                    Some(current)
                }
                None => {
                    self.combo_len = 0;
                    None
                }
            };
        }

        self.combo_len = 0;
        self.start_anim(solver, seq, body_state, true, now)
            .then(|| Arc::clone(seq))
    }

    /// Collect events of all layers over `(*barrier, now]` and advance the barrier
    pub fn process_events(&self, barrier: &mut u64, now: u64, out: &mut EventBatch) {
        for layer in &self.layers {
            layer.seq.process_events(*barrier, layer.start, now, out);
        }
        *barrier = now;
    }

    /// Turn in place: `dir < 0` left, `dir > 0` right, `0` stops turning
    pub fn set_anim_rotate(
        &mut self,
        solver: &AnimationSolver,
        request: &SolveRequest,
        dir: i32,
        now: u64,
    ) -> bool {
        if dir == 0 {
            if let Some(pos) = self.rotation_position() {
                self.remove_at(pos);
            }
            return true;
        }
        if self.body_state().intersects(BodyState::NO_ROTATION) {
            return false;
        }

        let action = if dir < 0 { Action::RotL } else { Action::RotR };
        let Some(seq) = solver.solve_anim(&request.with_action(action)) else {
            return false;
        };

        if let Some(pos) = self.rotation_position() {
            if self.layers[pos].seq.name() == seq.name() {
                return true;
            }
            self.remove_at(pos);
        }
        if !self.start_anim(solver, &seq, BodyState::STAND, false, now) {
            return false;
        }
        self.rotation = self.layer_at(seq.layer()).map(|l| l.id);
        true
    }

    /// Move the item interaction of `scheme` to `state`
    ///
    /// Enters the item stance when no interaction is bound yet. Returns the
    /// clip now playing for the interaction.
    pub fn set_anim_item(
        &mut self,
        solver: &AnimationSolver,
        scheme: &str,
        state: u32,
        now: u64,
    ) -> Option<Arc<Sequence>> {
        let request = SolveRequest::new(Action::UseItem, WeaponState::NoWeapon, WalkMode::Run);

        let Some(pos) = self.item_use_position() else {
            let seq = solver.solve_anim(&request.with_item(ItemUse::new(scheme, None, state)))?;
            if !self.start_anim(solver, &seq, BodyState::ITEM_INTERACT, false, now) {
                return None;
            }
            self.item_use = self.layer_at(seq.layer()).map(|l| l.id);
            return Some(seq);
        };

        let (current_scheme, current_state) = item_stance(self.layers[pos].seq.name())?;
        if !current_scheme.eq_ignore_ascii_case(scheme) {
            return None;
        }
        if current_state == state {
            return Some(Arc::clone(&self.layers[pos].seq));
        }

        let item = ItemUse::new(scheme, Some(current_state), state);
        let seq = solver.solve_anim(&request.with_item(item))?;
        self.remove_at(pos);
        self.item_use = Some(self.insert_layer(Arc::clone(&seq), BodyState::ITEM_INTERACT, now));
        Some(seq)
    }

    /// Leave the bound item interaction, playing its exit transition if any
    pub fn stop_item_state(&mut self, solver: &AnimationSolver, now: u64) -> bool {
        let Some(pos) = self.item_use_position() else {
            return false;
        };
        let stance = item_stance(self.layers[pos].seq.name());
        self.remove_at(pos);

        if let Some((scheme, state)) = stance {
            let request = SolveRequest::new(Action::UseItemEnd, WeaponState::NoWeapon, WalkMode::Run)
                .with_item(ItemUse::new(scheme, Some(state), state));
            if let Some(exit) = solver.solve_anim(&request) {
                self.insert_layer(exit, BodyState::STAND, now);
            }
        }
        true
    }

    /// Union of the body states of all layers
    pub fn body_state(&self) -> BodyState {
        self.layers
            .iter()
            .fold(BodyState::empty(), |acc, l| acc | l.body_state)
    }

    /// Exactly one looping idle clip is playing
    pub fn is_standing(&self) -> bool {
        match self.layers.as_slice() {
            [only] => only.seq.class() == SequenceClass::Loop && only.seq.is_idle(),
            _ => false,
        }
    }

    pub fn is_in_anim(&self, name: &str) -> bool {
        self.layers
            .iter()
            .any(|l| l.seq.name().eq_ignore_ascii_case(name))
    }

    pub fn has_anim(&self) -> bool {
        !self.layers.is_empty()
    }

    pub fn is_defence_window(&self, now: u64) -> bool {
        self.layers
            .iter()
            .any(|l| l.seq.is_defence_window(l.elapsed(now)))
    }

    pub fn is_parry_window(&self, now: u64) -> bool {
        self.layers
            .iter()
            .any(|l| l.seq.is_parry_window(l.elapsed(now)))
    }

    /// Some attack layer has not landed its first hit yet
    pub fn is_prehit(&self, now: u64) -> bool {
        self.layers.iter().any(|l| l.seq.is_prehit(l.start, now))
    }

    /// Longest total time of the playing clips
    pub fn animation_total_time(&self) -> u64 {
        self.layers
            .iter()
            .map(|l| l.seq.total_time())
            .max()
            .unwrap_or(0)
    }

    /// Root-motion displacement of all moving layers over `[now, now + dt)`
    pub fn anim_move_speed(&self, now: u64, dt: u64) -> Vec3 {
        self.layers
            .iter()
            .filter(|l| l.seq.is_move())
            .map(|l| l.seq.speed(l.elapsed(now), dt))
            .sum()
    }

    pub fn combo_length(&self) -> u16 {
        self.combo_len
    }

    pub fn rotation_layer(&self) -> Option<&Layer> {
        self.rotation_position().map(|pos| &self.layers[pos])
    }

    pub fn item_use_layer(&self) -> Option<&Layer> {
        self.item_use_position().map(|pos| &self.layers[pos])
    }

    fn rotation_position(&self) -> Option<usize> {
        let id = self.rotation?;
        self.layers.iter().position(|l| l.id == id)
    }

    fn item_use_position(&self) -> Option<usize> {
        let id = self.item_use?;
        self.layers.iter().position(|l| l.id == id)
    }

    fn position_of_layer(&self, index: u32) -> Option<usize> {
        self.layers.iter().position(|l| l.seq.layer() == index)
    }

    /// Insert keeping layer order, replacing any layer with the same index
    fn insert_layer(&mut self, seq: Arc<Sequence>, body_state: BodyState, start: u64) -> u64 {
        let index = seq.layer();
        if let Some(pos) = self.position_of_layer(index) {
            self.remove_at(pos);
        }

        let id = self.next_layer_id;
        self.next_layer_id += 1;
        let at = self.layers.partition_point(|l| l.seq.layer() < index);
        self.layers.insert(
            at,
            Layer {
                id,
                seq,
                start,
                body_state,
            },
        );
        id
    }

    /// Remove a layer and clear every reference to it
    fn remove_at(&mut self, pos: usize) -> Layer {
        let layer = self.layers.remove(pos);
        if self.rotation == Some(layer.id) {
            self.rotation = None;
        }
        if self.item_use == Some(layer.id) {
            self.item_use = None;
        }
        layer
    }

    fn remove_where(&mut self, pred: impl Fn(&Layer) -> bool) -> usize {
        let mut removed = 0;
        let mut i = 0;
        while i < self.layers.len() {
            if pred(&self.layers[i]) {
                self.remove_at(i);
                removed += 1;
            } else {
                i += 1;
            }
        }
        removed
    }

    /// Restore ascending layer order; on a collision the newest layer stays
    fn resort(&mut self) {
        self.layers.sort_by(|a, b| {
            a.seq
                .layer()
                .cmp(&b.seq.layer())
                .then(b.start.cmp(&a.start))
                .then(b.id.cmp(&a.id))
        });
        let mut i = 1;
        while i < self.layers.len() {
            if self.layers[i].seq.layer() == self.layers[i - 1].seq.layer() {
                self.remove_at(i);
            } else {
                i += 1;
            }
        }
    }
}

/// Scheme and target state encoded in an item clip name
///
/// `S_POTION_S1` is scheme `POTION` in state 1; the transitions
/// `T_POTION_STAND_2_S0` and `T_POTION_S0_2_S1` report their target state.
fn item_stance(name: &str) -> Option<(String, u32)> {
    let body = name.get(2..)?;
    let (head, state) = body.rsplit_once("_S")?;
    let state = state.parse().ok()?;
    let scheme = match head.rsplit_once('_') {
        Some((rest, "2")) => rest.rsplit_once('_').map_or(rest, |(scheme, _)| scheme),
        _ => head,
    };
    Some((scheme.to_string(), state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("S_POTION_S0", Some(("POTION", 0)))]
    #[test_case("S_MAP_GIVE_S2", Some(("MAP_GIVE", 2)))]
    #[test_case("T_POTION_STAND_2_S0", Some(("POTION", 0)))]
    #[test_case("T_POTION_S0_2_S1", Some(("POTION", 1)))]
    #[test_case("T_POTION_S1_2_STAND", None)]
    #[test_case("S_RUN", None)]
    fn test_item_stance(name: &str, expected: Option<(&str, u32)>) {
        let parsed = item_stance(name);
        assert_eq!(
            parsed.as_ref().map(|(scheme, state)| (scheme.as_str(), *state)),
            expected
        );
    }
}
