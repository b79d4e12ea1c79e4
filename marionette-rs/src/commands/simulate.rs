//! Scripted playback command
//!
//! A script lists timed operations against one character:
//!
//! ```yaml
//! skeleton: HUMANS
//! weapon: one_handed
//! tick: 100
//! steps:
//!   - { at: 0, op: solve, action: move, body_state: RUN }
//!   - { at: 400, op: start, clip: S_LOOK }
//!   - { at: 600, op: rotate, dir: -1 }
//!   - { at: 900, op: combo, action: attack }
//! ```

use anyhow::{Context, Result};
use clap::Args;
use log::{debug, info};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use marionette_anim::manifest::read_document;
use marionette_anim::solver::{Action, SolveRequest, WalkMode, WeaponState};
use marionette_anim::{Animator, BodyState, EngineConfig, EventBatch, Pose};

use crate::utils::{add_table_row, create_table};

#[derive(Args)]
pub struct SimulateArgs {
    /// Path to the manifest (JSON or YAML)
    pub manifest: PathBuf,

    /// Path to the script (JSON or YAML)
    pub script: PathBuf,

    /// Print every tick, not only those where something happened
    #[arg(long)]
    pub all: bool,

    /// Write the final playback state (`.json`, otherwise binary)
    #[arg(long, value_name = "FILE")]
    pub save: Option<PathBuf>,

    /// Seed for variant selection (overrides the config and the script)
    #[arg(long)]
    pub seed: Option<u64>,
}

fn default_tick() -> u64 {
    50
}

/// Timed operations against one character
#[derive(Debug, Deserialize)]
pub struct Script {
    pub skeleton: String,
    #[serde(default)]
    pub weapon: WeaponState,
    #[serde(default)]
    pub walk: WalkMode,
    /// Simulation step in milliseconds
    #[serde(default = "default_tick")]
    pub tick: u64,
    /// Last simulated tick; defaults to one second after the last step
    #[serde(default)]
    pub end: Option<u64>,
    #[serde(default)]
    pub seed: Option<u64>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct Step {
    pub at: u64,
    #[serde(flatten)]
    pub op: Op,
}

/// Action request carried by `solve` and `combo` steps
#[derive(Debug, Deserialize)]
pub struct ActionStep {
    pub action: Action,
    #[serde(default)]
    pub moving: bool,
    #[serde(default)]
    pub spell: Option<String>,
    #[serde(default)]
    pub body_state: BodyState,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Solve(ActionStep),
    Combo(ActionStep),
    Start {
        clip: String,
        #[serde(default)]
        body_state: BodyState,
        #[serde(default)]
        force: bool,
    },
    Stop {
        clip: String,
    },
    StopWalk,
    Interrupt,
    StopAll,
    Rotate {
        dir: i32,
    },
    Item {
        scheme: String,
        state: u32,
    },
    StopItem,
    PushOverlay {
        skeleton: String,
        #[serde(default)]
        expiry: Option<u64>,
    },
    PopOverlay {
        skeleton: String,
    },
}

pub fn execute(args: SimulateArgs, config: &EngineConfig) -> Result<()> {
    let mut script: Script = read_document(&args.script)
        .with_context(|| format!("Failed to load script: {}", args.script.display()))?;
    anyhow::ensure!(script.tick > 0, "Script tick must be positive");
    script.steps.sort_by_key(|s| s.at);

    let (library, base) = super::open_skeleton(&args.manifest, &script.skeleton)?;
    let config = EngineConfig {
        rng_seed: args.seed.or(script.seed).or(config.rng_seed),
        ..config.clone()
    };
    let mut animator = Animator::from_config(library, base, &config);

    let end = script
        .end
        .or_else(|| script.steps.last().map(|s| s.at + 1000))
        .unwrap_or(0);
    info!(
        "Simulating {} step(s) on '{}' until {} ms",
        script.steps.len(),
        script.skeleton,
        end
    );

    let mut table = create_table(&["Tick", "Step", "Layers", "Body state", "Events"]);
    let mut pending = script.steps.iter().peekable();
    let mut events = EventBatch::default();

    for now in (0..=end).step_by(script.tick as usize) {
        let mut notes = Vec::new();
        while let Some(step) = pending.next_if(|s| s.at <= now) {
            notes.push(apply(&mut animator, &script, &step.op, now)?);
        }

        let changed = animator.tick(now);
        events.clear();
        animator.drain_events(now, &mut events);

        if args.all || changed || !notes.is_empty() || !events.is_empty() {
            add_table_row(
                &mut table,
                vec![
                    now.to_string(),
                    notes.join("; "),
                    describe_layers(&animator.pose),
                    format!("{:?}", animator.pose.body_state()),
                    describe_events(&events),
                ],
            );
        }
    }
    table.printstd();

    if let Some(path) = &args.save {
        save_state(&animator.pose, path)?;
        println!("\nSaved playback state to {}", path.display());
    }
    Ok(())
}

fn build_request(script: &Script, step: &ActionStep) -> SolveRequest {
    let mut request =
        SolveRequest::new(step.action, script.weapon, script.walk).moving(step.moving);
    if let Some(spell) = &step.spell {
        request = request.with_spell(spell.clone());
    }
    request
}

/// Apply one step, returning a short description of the outcome
fn apply(animator: &mut Animator, script: &Script, op: &Op, now: u64) -> Result<String> {
    debug!("{now}: {op:?}");
    let outcome = |ok: bool| if ok { "" } else { " (refused)" };

    let note = match op {
        Op::Solve(step) => {
            let request = build_request(script, step);
            match animator.solver.solve_anim(&request) {
                Some(seq) => {
                    let ok = animator.pose.start_anim(
                        &animator.solver,
                        &seq,
                        step.body_state,
                        step.force,
                        now,
                    );
                    format!("{} -> {}{}", step.action, seq.name(), outcome(ok))
                }
                None => format!("{} -> unresolved", step.action),
            }
        }
        Op::Combo(step) => {
            let request = build_request(script, step);
            match animator.continue_combo(&request, step.body_state, now) {
                Some(seq) => format!(
                    "combo {} stage {}",
                    seq.name(),
                    animator.pose.combo_length()
                ),
                None => "combo reset".to_string(),
            }
        }
        Op::Start {
            clip,
            body_state,
            force,
        } => {
            let seq = animator
                .solver
                .solve_frm(clip)
                .with_context(|| format!("Clip '{clip}' not found"))?;
            let ok = animator
                .pose
                .start_anim(&animator.solver, &seq, *body_state, *force, now);
            format!("start {}{}", seq.name(), outcome(ok))
        }
        Op::Stop { clip } => {
            let ok = animator.pose.stop_anim(clip);
            format!("stop {clip}{}", outcome(ok))
        }
        Op::StopWalk => format!("stop walk ({})", animator.pose.stop_walk_anim()),
        Op::Interrupt => format!("interrupt ({})", animator.pose.interrupt()),
        Op::StopAll => {
            animator.pose.stop_all();
            "stop all".to_string()
        }
        Op::Rotate { dir } => {
            let idle = SolveRequest::new(Action::Idle, script.weapon, script.walk);
            let ok = animator
                .pose
                .set_anim_rotate(&animator.solver, &idle, *dir, now);
            format!("rotate {dir}{}", outcome(ok))
        }
        Op::Item { scheme, state } => {
            match animator
                .pose
                .set_anim_item(&animator.solver, scheme, *state, now)
            {
                Some(seq) => format!("item {scheme} S{state} -> {}", seq.name()),
                None => format!("item {scheme} S{state} (refused)"),
            }
        }
        Op::StopItem => {
            let ok = animator.pose.stop_item_state(&animator.solver, now);
            format!("stop item{}", outcome(ok))
        }
        Op::PushOverlay { skeleton, expiry } => {
            let overlay = animator
                .solver
                .loader()
                .load_skeleton(skeleton)
                .with_context(|| format!("Overlay skeleton '{skeleton}' not found"))?;
            animator.solver.push_overlay(overlay, *expiry);
            format!("overlay +{skeleton}")
        }
        Op::PopOverlay { skeleton } => {
            let ok = animator.solver.pop_overlay(skeleton);
            format!("overlay -{skeleton}{}", outcome(ok))
        }
    };
    Ok(note)
}

fn describe_layers(pose: &Pose) -> String {
    if pose.layers().is_empty() {
        return "-".to_string();
    }
    pose.layers()
        .iter()
        .map(|l| format!("{}:{}", l.index(), l.sequence().name()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn describe_events(events: &EventBatch) -> String {
    let mut parts: Vec<String> = events
        .timed
        .iter()
        .map(|e| format!("{:?}", e.kind))
        .collect();
    if events.hits > 0 {
        parts.push(format!("hit x{}", events.hits));
    }
    parts.join(", ")
}

fn save_state(pose: &Pose, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    let is_json = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::to_writer_pretty(&mut writer, &pose.snapshot_state())?;
    } else {
        pose.save(&mut writer)?;
    }
    writer.flush()?;
    Ok(())
}
