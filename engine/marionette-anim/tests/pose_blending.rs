//! Layer blending and transition handling of a single pose

mod common;

use std::sync::Arc;

use common::*;
use glam::{Mat4, Quat, Vec3};
use marionette_anim::manifest::ClipDef;
use marionette_anim::sequence::{BoneSample, SequenceClass, SequenceFlags};
use marionette_anim::{BodyState, Pose};
use pretty_assertions::assert_eq;

fn close(a: Mat4, b: Mat4) -> bool {
    a.abs_diff_eq(b, 1e-5)
}

fn names(pose: &Pose) -> Vec<&str> {
    pose.layers().iter().map(|l| l.sequence().name()).collect()
}

fn bob_sample() -> [BoneSample; 2] {
    [
        BoneSample::new(Vec3::new(0.0, 2.0, 0.0), Quat::from_rotation_y(0.5)),
        BoneSample::new(Vec3::new(0.0, 1.0, 0.0), Quat::from_rotation_x(0.3)),
    ]
}

fn wave_sample() -> BoneSample {
    BoneSample::new(Vec3::new(0.0, 1.2, 0.1), Quat::from_rotation_z(1.0))
}

/// Whole-body loop on layer 1 and a head-only loop on layer 2
fn layered_clips() -> Vec<ClipDef> {
    let mut clips = humans_clips();
    clips.push(ClipDef {
        name: "S_BOB".to_string(),
        layer: 1,
        fps: 10.0,
        flags: SequenceFlags::IDLE,
        bones: vec![ROOT.to_string(), HEAD.to_string()],
        samples: vec![bob_sample().to_vec(); 4],
        ..ClipDef::default()
    });
    clips.push(ClipDef {
        name: "S_WAVE".to_string(),
        layer: 2,
        fps: 10.0,
        bones: vec![HEAD.to_string()],
        samples: vec![vec![wave_sample()]; 4],
        ..ClipDef::default()
    });
    clips
}

#[test]
fn test_higher_layer_overrides_its_bones() {
    init_logging();
    let solver = solver_with(layered_clips(), Vec::new());
    let mut pose = Pose::new(Arc::clone(solver.base()));

    let bob = solver.solve_frm("S_BOB").unwrap();
    let wave = solver.solve_frm("S_WAVE").unwrap();
    assert!(pose.start_anim(&solver, &bob, BodyState::STAND, false, 0));
    assert!(pose.start_anim(&solver, &wave, BodyState::STAND, false, 0));
    pose.update(&solver, 150);

    let [root, _] = bob_sample();
    let local = pose.local_transforms();
    assert!(close(local[0], root.to_matrix()));
    assert!(close(local[1], wave_sample().to_matrix()));

    let global = pose.transforms();
    assert!(close(global[0], local[0]));
    assert!(close(global[1], global[0] * local[1]));
}

#[test]
fn test_bones_without_layer_keep_bind_pose() {
    let solver = solver_with(layered_clips(), Vec::new());
    let mut pose = Pose::new(Arc::clone(solver.base()));

    let wave = solver.solve_frm("S_WAVE").unwrap();
    pose.start_anim(&solver, &wave, BodyState::STAND, false, 0);
    pose.update(&solver, 10);
    assert!(close(pose.local_transforms()[0], Mat4::IDENTITY));

    // Stopping the only layer returns every bone to bind
    assert!(pose.stop_anim("s_wave"));
    pose.update(&solver, 20);
    assert!(close(
        pose.local_transforms()[1],
        Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0))
    ));
    assert_eq!(pose.transforms(), pose.skeleton().bind_global());
}

#[test]
fn test_transform_count_matches_skeleton() {
    let solver = solver_with(layered_clips(), Vec::new());
    let mut pose = Pose::new(Arc::clone(solver.base()));
    let bones = solver.base().node_count();
    assert_eq!(pose.transforms().len(), bones);

    for (tick, name) in [(0, "S_BOB"), (100, "S_WAVE"), (200, "S_RUNL"), (900, "S_LOOK")] {
        let seq = solver.solve_frm(name).unwrap();
        pose.start_anim(&solver, &seq, BodyState::STAND, true, tick);
        pose.update(&solver, tick + 50);
        assert_eq!(pose.transforms().len(), bones);
    }
    pose.interrupt();
    pose.update(&solver, 2000);
    assert_eq!(pose.transforms().len(), bones);
}

#[test]
fn test_root_drift_is_cancelled() {
    let mut clips = humans_clips();
    clips.push(ClipDef {
        name: "S_DRIFT".to_string(),
        fps: 10.0,
        bones: vec![ROOT.to_string()],
        samples: vec![vec![BoneSample::new(Vec3::new(5.0, 3.0, 7.0), Quat::IDENTITY)]; 2],
        ..ClipDef::default()
    });
    let solver = solver_with(clips, Vec::new());
    let mut pose = Pose::new(Arc::clone(solver.base()));

    let drift = solver.solve_frm("S_DRIFT").unwrap();
    pose.start_anim(&solver, &drift, BodyState::STAND, false, 0);
    pose.update(&solver, 0);

    assert_eq!(pose.local_transforms()[0].w_axis.truncate(), Vec3::new(5.0, 3.0, 7.0));
    assert_eq!(pose.transforms()[0].w_axis.truncate(), Vec3::new(0.0, 3.0, 0.0));
    // The child follows the corrected root
    assert_eq!(pose.transforms()[1].w_axis.truncate(), Vec3::new(0.0, 4.0, 0.0));
}

#[test]
fn test_transition_advances_to_successor() {
    let solver = solver();
    let mut pose = Pose::new(Arc::clone(solver.base()));

    let bridge = solver.solve_frm("T_RUN_2_RUNL").unwrap();
    pose.start_anim(&solver, &bridge, BodyState::RUN, false, 0);
    let id = pose.layers()[0].id();

    assert!(!pose.update(&solver, 500));
    assert_eq!(names(&pose), vec!["T_RUN_2_RUNL"]);

    assert!(pose.update(&solver, 501));
    assert_eq!(names(&pose), vec!["S_RUNL"]);
    assert_eq!(pose.layers()[0].start(), 501);
    assert_eq!(pose.layers()[0].id(), id);
    assert_eq!(pose.layers()[0].body_state(), BodyState::RUN);
}

#[test]
fn test_finished_transition_without_successor_is_removed() {
    let mut clips = humans_clips();
    clips.push(transition("T_WAVE", 4, 5, None));
    clips.push(transition("T_NOD", 6, 5, Some("S_MISSING")));
    let solver = solver_with(clips, Vec::new());
    let mut pose = Pose::new(Arc::clone(solver.base()));

    for name in ["S_RUN", "T_WAVE", "T_NOD"] {
        let seq = solver.solve_frm(name).unwrap();
        pose.start_anim(&solver, &seq, BodyState::STAND, false, 0);
    }
    assert_eq!(names(&pose), vec!["S_RUN", "T_WAVE", "T_NOD"]);

    assert!(pose.update(&solver, 600));
    assert_eq!(names(&pose), vec!["S_RUN"]);
}

#[test]
fn test_successor_on_other_layer_replaces_occupant() {
    let mut clips = humans_clips();
    clips.push(transition("T_LAND", 3, 5, Some("S_WALK")));
    let solver = solver_with(clips, Vec::new());
    let mut pose = Pose::new(Arc::clone(solver.base()));

    let run = solver.solve_frm("S_RUN").unwrap();
    let land = solver.solve_frm("T_LAND").unwrap();
    pose.start_anim(&solver, &run, BodyState::STAND, false, 0);
    pose.start_anim(&solver, &land, BodyState::JUMP, false, 0);
    assert_eq!(names(&pose), vec!["S_RUN", "T_LAND"]);

    pose.update(&solver, 501);
    assert_eq!(names(&pose), vec!["S_WALK"]);
    assert_eq!(pose.layers()[0].index(), 1);
    assert_eq!(pose.layers()[0].body_state(), BodyState::JUMP);
}

#[test]
fn test_bridge_between_states() {
    let solver = solver();
    let mut pose = Pose::new(Arc::clone(solver.base()));

    let run = solver.solve_frm("S_RUN").unwrap();
    let run_loop = solver.solve_frm("S_RUNL").unwrap();
    pose.start_anim(&solver, &run, BodyState::STAND, false, 0);
    assert!(pose.start_anim(&solver, &run_loop, BodyState::RUN, false, 100));
    assert_eq!(names(&pose), vec!["T_RUN_2_RUNL"]);

    pose.update(&solver, 601);
    assert_eq!(names(&pose), vec!["S_RUNL"]);

    // And back again
    assert!(pose.start_anim(&solver, &run, BodyState::STAND, false, 700));
    assert_eq!(names(&pose), vec!["T_RUNL_2_RUN"]);
}

#[test]
fn test_bridge_to_stand_for_idle_target() {
    let mut clips = humans_clips();
    clips.push(looping("S_SNEAKL", 1, SequenceFlags::MOVE));
    clips.push(transition("T_SNEAKL_2_STAND", 1, 5, Some("S_WALK")));
    let solver = solver_with(clips, Vec::new());
    let mut pose = Pose::new(Arc::clone(solver.base()));

    let sneak = solver.solve_frm("S_SNEAKL").unwrap();
    let walk = solver.solve_frm("S_WALK").unwrap();
    pose.start_anim(&solver, &sneak, BodyState::SNEAK, false, 0);
    pose.start_anim(&solver, &walk, BodyState::STAND, false, 200);
    assert_eq!(names(&pose), vec!["T_SNEAKL_2_STAND"]);
}

#[test]
fn test_bridge_from_stand() {
    let mut clips = humans_clips();
    clips.push(looping("S_SIT", 1, SequenceFlags::empty()));
    clips.push(transition("T_STAND_2_SIT", 1, 5, Some("S_SIT")));
    let solver = solver_with(clips, Vec::new());
    let mut pose = Pose::new(Arc::clone(solver.base()));

    let walk = solver.solve_frm("S_WALK").unwrap();
    let sit = solver.solve_frm("S_SIT").unwrap();
    pose.start_anim(&solver, &walk, BodyState::STAND, false, 0);
    pose.start_anim(&solver, &sit, BodyState::SIT, false, 100);
    assert_eq!(names(&pose), vec!["T_STAND_2_SIT"]);

    pose.update(&solver, 601);
    assert_eq!(names(&pose), vec!["S_SIT"]);
}

#[test]
fn test_transition_holds_last_frame_until_finished() {
    let mut clips = humans_clips();
    clips.push(ClipDef {
        name: "T_RISE".to_string(),
        class: SequenceClass::Transition,
        fps: 10.0,
        bones: vec![ROOT.to_string()],
        samples: (0..5)
            .map(|i| vec![BoneSample::new(Vec3::new(0.0, i as f32, 0.0), Quat::IDENTITY)])
            .collect(),
        ..ClipDef::default()
    });
    let solver = solver_with(clips, Vec::new());
    let mut pose = Pose::new(Arc::clone(solver.base()));

    let rise = solver.solve_frm("T_RISE").unwrap();
    pose.start_anim(&solver, &rise, BodyState::STAND, false, 0);

    pose.update_animation(250);
    assert!((pose.local_transforms()[0].w_axis.y - 2.5).abs() < 1e-4);

    // Past the last frame the clip holds frame 4 rather than wrapping to 0
    pose.update_animation(480);
    assert!((pose.local_transforms()[0].w_axis.y - 4.0).abs() < 1e-4);
}

#[test]
fn test_move_speed_sums_moving_layers() {
    let solver = solver();
    let mut pose = Pose::new(Arc::clone(solver.base()));

    let run_loop = solver.solve_frm("S_RUNL").unwrap();
    let look = solver.solve_frm("S_LOOK").unwrap();
    pose.start_anim(&solver, &run_loop, BodyState::RUN, false, 0);
    pose.start_anim(&solver, &look, BodyState::STAND, false, 0);

    let speed = pose.anim_move_speed(100, 500);
    assert!((speed - Vec3::new(0.0, 0.0, 100.0)).length() < 1e-3);

    // Across the loop boundary the displacement keeps accumulating
    let speed = pose.anim_move_speed(900, 200);
    assert!((speed - Vec3::new(0.0, 0.0, 40.0)).length() < 1e-3);
}
