use glam::{Mat4, Vec3};

use super::Pose;

impl Pose {
    /// Recompute the bone matrices for tick `now` without touching the layers
    ///
    /// Local transforms start from the bind pose; each layer, lowest index
    /// first, overwrites the bones its clip animates. The result is composed
    /// down the hierarchy in a single pass.
    pub fn update_animation(&mut self, now: u64) {
        self.base.copy_from_slice(&self.bind);
        for layer in &self.layers {
            layer.seq.sample_into(layer.elapsed(now), &mut self.base);
        }
        self.compose();
    }

    fn compose(&mut self) {
        let correction = self.root_correction();
        let nodes = self.skeleton.nodes();
        for &i in self.skeleton.order() {
            self.transforms[i] = match nodes[i].parent {
                Some(parent) => self.transforms[parent] * self.base[i],
                None => correction * self.base[i],
            };
        }
    }

    /// Cancels the horizontal drift of the root bone
    ///
    /// Characters are moved by gameplay using
    /// [`anim_move_speed`](Pose::anim_move_speed); the pose itself stays
    /// anchored above the bind root position.
    fn root_correction(&self) -> Mat4 {
        let Some(&root) = self.skeleton.root_nodes().first() else {
            return Mat4::IDENTITY;
        };
        let offset = self.base[root].w_axis.truncate() - self.skeleton.root_translation();
        Mat4::from_translation(Vec3::new(-offset.x, 0.0, -offset.z))
    }
}
