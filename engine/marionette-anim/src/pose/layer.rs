use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::sequence::Sequence;

bitflags::bitflags! {
    /// Gameplay body state tagged onto each playing layer
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct BodyState: u32 {
        const STAND = 0x0000_0001;
        const WALK = 0x0000_0002;
        const RUN = 0x0000_0004;
        const SNEAK = 0x0000_0008;
        const SWIM = 0x0000_0010;
        const DIVE = 0x0000_0020;
        const FALL = 0x0000_0040;
        const JUMP = 0x0000_0080;
        const CLIMB = 0x0000_0100;
        const SIT = 0x0000_0200;
        const LIE = 0x0000_0400;
        /// Using an inventory item; at most one such interaction at a time
        const ITEM_INTERACT = 0x0000_0800;
        /// Using a world object (bench, anvil, ...)
        const MOB_INTERACT = 0x0000_1000;
        const UNCONSCIOUS = 0x0000_2000;
        const DEAD = 0x0000_4000;
        const HIT = 0x0000_8000;
        const PARADE = 0x0001_0000;
        const CAST = 0x0002_0000;
        const AIM = 0x0004_0000;

        /// Locomotion states removed by `stop_walk_anim`
        const LOCOMOTION = Self::WALK.bits() | Self::RUN.bits() | Self::SNEAK.bits()
            | Self::SWIM.bits() | Self::DIVE.bits();
        /// States that survive `interrupt`
        const PERSISTENT = Self::UNCONSCIOUS.bits() | Self::DEAD.bits();
        /// States during which the character cannot turn in place
        const NO_ROTATION = Self::FALL.bits() | Self::JUMP.bits() | Self::CLIMB.bits()
            | Self::SIT.bits() | Self::LIE.bits() | Self::ITEM_INTERACT.bits()
            | Self::MOB_INTERACT.bits() | Self::UNCONSCIOUS.bits() | Self::DEAD.bits()
            | Self::HIT.bits();
    }
}

/// One clip playing on a pose
#[derive(Debug, Clone)]
pub struct Layer {
    /// Identity of this playback, changes whenever the layer is replaced
    pub(crate) id: u64,
    pub(crate) seq: Arc<Sequence>,
    /// Tick at which playback started
    pub(crate) start: u64,
    pub(crate) body_state: BodyState,
}

impl Layer {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn sequence(&self) -> &Arc<Sequence> {
        &self.seq
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn body_state(&self) -> BodyState {
        self.body_state
    }

    /// Layer index of the playing clip
    pub fn index(&self) -> u32 {
        self.seq.layer()
    }

    pub fn elapsed(&self, now: u64) -> u64 {
        now.saturating_sub(self.start)
    }
}
