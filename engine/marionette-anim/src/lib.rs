//! # marionette_anim - Character Animation Engine
//!
//! Resolves semantic animation requests ("run forward with a two-handed
//! sword", "turn left while swimming") to concrete clips, splices them onto
//! what a character is already playing, and blends the active clips into one
//! skeleton pose per tick.
//!
//! ## Features
//!
//! - Data-driven action to clip-name rules with weapon and locomotion
//!   variants, random alternatives and fallbacks
//! - Overlay skeletons that shadow clips of their base, with expiry
//! - Layered playback with automatic bridging transitions (`T_RUN_2_WALK`)
//! - Combo, parry, defence and hit timing queries for combat code
//! - Timed event extraction with per-caller barriers
//! - Binary and JSON save / restore of playback state
//! - Shared pose cache for crowds and props
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use marionette_anim::{Animator, AssetLoader, BodyState, ClipLibrary, EngineConfig};
//! use marionette_anim::solver::{Action, SolveRequest, WalkMode, WeaponState};
//!
//! # fn main() -> marionette_anim::Result<()> {
//! let config = EngineConfig::from_path("engine.yaml")?;
//! let library: Arc<dyn AssetLoader> = Arc::new(ClipLibrary::from_path("humans.yaml")?);
//! let skeleton = library.load_skeleton("HUMANS").expect("skeleton");
//!
//! let mut hero = Animator::from_config(library, skeleton, &config);
//! let run = SolveRequest::new(Action::Move, WeaponState::NoWeapon, WalkMode::Run);
//! hero.start_action(&run, BodyState::RUN, false, 0);
//!
//! for now in (0..1000).step_by(16) {
//!     hero.tick(now);
//!     let _bones = hero.pose.transforms();
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod animator;
pub mod config;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod pool;
pub mod pose;
pub mod sequence;
pub mod skeleton;
pub mod solver;

pub use animator::{Animator, update_all};
pub use config::EngineConfig;
pub use error::{AnimError, Result};
pub use loader::{AssetLoader, ClipLibrary};
pub use manifest::Manifest;
pub use pool::{PoolConfig, PosePool};
pub use pose::{BodyState, Layer, Pose, PoseState};
pub use sequence::{EventBatch, Sequence, SequenceClass, SequenceFlags, TimeWindow};
pub use skeleton::{Node, Skeleton};
pub use solver::AnimationSolver;
