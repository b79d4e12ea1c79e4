//! Common test utilities and fixtures

#![allow(dead_code)]

use std::sync::Arc;

use glam::{Quat, Vec3};
use marionette_anim::manifest::{ClipDef, Manifest, NodeDef, SkeletonDef};
use marionette_anim::sequence::{
    BoneSample, EventKind, SequenceClass, SequenceFlags, TimeWindow, TimedEvent,
};
use marionette_anim::{AnimationSolver, AssetLoader, ClipLibrary};
use rand::SeedableRng;
use rand::rngs::StdRng;

pub const ROOT: &str = "BIP01";
pub const HEAD: &str = "BIP01 HEAD";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn node(name: &str, parent: Option<&str>, translation: Vec3) -> NodeDef {
    NodeDef {
        name: name.to_string(),
        parent: parent.map(str::to_string),
        translation,
        rotation: Quat::IDENTITY,
    }
}

/// Two-bone humanoid: root at the origin, head one unit above it
pub fn humans_nodes() -> Vec<NodeDef> {
    vec![
        node(ROOT, None, Vec3::ZERO),
        node(HEAD, Some(ROOT), Vec3::new(0.0, 1.0, 0.0)),
    ]
}

/// Clip animating the root bone with `frames` identical bind samples
pub fn clip(name: &str, layer: u32, class: SequenceClass, frames: usize, fps: f32) -> ClipDef {
    ClipDef {
        name: name.to_string(),
        layer,
        class,
        fps,
        bones: vec![ROOT.to_string()],
        samples: vec![vec![BoneSample::default()]; frames],
        ..ClipDef::default()
    }
}

pub fn looping(name: &str, layer: u32, flags: SequenceFlags) -> ClipDef {
    ClipDef {
        flags,
        ..clip(name, layer, SequenceClass::Loop, 10, 10.0)
    }
}

pub fn transition(name: &str, layer: u32, frames: usize, next: Option<&str>) -> ClipDef {
    ClipDef {
        next: next.map(str::to_string),
        ..clip(name, layer, SequenceClass::Transition, frames, 10.0)
    }
}

/// Two-stage one-handed attack: 2000 ms, hits at 300 and 1100
pub fn attack(name: &str) -> ClipDef {
    ClipDef {
        hit_windows: vec![TimeWindow::new(300, 800), TimeWindow::new(1100, 1600)],
        combo_windows: vec![TimeWindow::new(500, 800), TimeWindow::new(1300, 1600)],
        defence_windows: vec![TimeWindow::new(0, 300)],
        parry_windows: vec![TimeWindow::new(100, 200)],
        ..clip(name, 1, SequenceClass::Transition, 40, 20.0)
    }
}

/// Clip set used by most behaviour tests
pub fn humans_clips() -> Vec<ClipDef> {
    vec![
        looping("S_RUN", 1, SequenceFlags::IDLE),
        ClipDef {
            root_motion: Some(Vec3::new(0.0, 0.0, 200.0)),
            ..looping("S_RUNL", 1, SequenceFlags::MOVE)
        },
        transition("T_RUN_2_RUNL", 1, 5, Some("S_RUNL")),
        transition("T_RUNL_2_RUN", 1, 5, Some("S_RUN")),
        looping("S_WALK", 1, SequenceFlags::IDLE),
        looping("S_SWIM", 1, SequenceFlags::IDLE),
        looping("S_DIVE", 1, SequenceFlags::IDLE),
        looping("S_1HRUN", 1, SequenceFlags::IDLE),
        ClipDef {
            next: Some("S_1HRUN".to_string()),
            events: vec![
                TimedEvent {
                    time: 0,
                    kind: EventKind::Tag {
                        tag: "FIGHTMODE".to_string(),
                    },
                },
                TimedEvent {
                    time: 250,
                    kind: EventKind::Sound {
                        name: "WHOOSH".to_string(),
                        ground: false,
                    },
                },
            ],
            ..attack("S_1HATTACK")
        },
        transition("T_RUNTURNL", 20, 5, Some("T_RUNTURNL")),
        transition("T_RUNTURNR", 20, 5, Some("T_RUNTURNR")),
        transition("T_DEAD", 1, 5, Some("S_DEAD")),
        looping("S_DEAD", 1, SequenceFlags::empty()),
        transition("T_POTION_STAND_2_S0", 1, 5, Some("S_POTION_S0")),
        looping("S_POTION_S0", 1, SequenceFlags::empty()),
        transition("T_POTION_S0_2_S1", 1, 5, Some("S_POTION_S1")),
        looping("S_POTION_S1", 1, SequenceFlags::empty()),
        transition("T_POTION_S1_2_STAND", 1, 5, Some("S_RUN")),
        looping("S_LOOK", 5, SequenceFlags::empty()),
    ]
}

pub fn library_with(skeletons: Vec<SkeletonDef>) -> Arc<dyn AssetLoader> {
    let manifest = Manifest { skeletons };
    Arc::new(ClipLibrary::from_manifest(manifest).expect("valid manifest"))
}

pub fn humans(clips: Vec<ClipDef>) -> SkeletonDef {
    SkeletonDef {
        name: "HUMANS".to_string(),
        nodes: humans_nodes(),
        clips,
    }
}

/// Seeded solver over the HUMANS skeleton (plus any extra skeletons)
pub fn solver_with(clips: Vec<ClipDef>, extra: Vec<SkeletonDef>) -> AnimationSolver {
    let mut skeletons = vec![humans(clips)];
    skeletons.extend(extra);
    let library = library_with(skeletons);
    let base = library.load_skeleton("HUMANS").expect("HUMANS skeleton");
    AnimationSolver::with_rng(library, base, StdRng::seed_from_u64(0x5eed))
}

pub fn solver() -> AnimationSolver {
    solver_with(humans_clips(), Vec::new())
}
