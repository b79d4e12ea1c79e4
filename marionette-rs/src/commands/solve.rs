//! Action resolution command

use anyhow::{Context, Result};
use clap::Args;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use marionette_anim::solver::{Action, AnimationSolver, ItemUse, SolveRequest, WalkMode, WeaponState};
use marionette_anim::EngineConfig;

use crate::utils::{add_table_row, create_table, format_ms};

#[derive(Args)]
pub struct SolveArgs {
    /// Path to the manifest (JSON or YAML)
    pub manifest: PathBuf,

    /// Base skeleton of the character
    pub skeleton: String,

    /// Requested action (e.g. "idle", "move", "attack", "rot_l")
    #[arg(short, long)]
    pub action: Action,

    /// Weapon state ("none", "fist", "1h", "2h", "bow", "cbow", "mage")
    #[arg(short, long, default_value = "none")]
    pub weapon: WeaponState,

    /// Walk mode ("run", "walk", "sneak", "water", "swim", "dive")
    #[arg(long, default_value = "run")]
    pub walk: WalkMode,

    /// The character is moving
    #[arg(long)]
    pub moving: bool,

    /// Spell animation code for cast actions
    #[arg(long)]
    pub spell: Option<String>,

    /// Item interaction scheme for use_item actions
    #[arg(long, value_name = "SCHEME")]
    pub item: Option<String>,

    /// Current item state; omit before the stance is entered
    #[arg(long, value_name = "STATE", requires = "item")]
    pub item_from: Option<u32>,

    /// Requested item state
    #[arg(long, value_name = "STATE", default_value_t = 0)]
    pub item_to: u32,

    /// Overlay skeletons to push, bottom first
    #[arg(short, long = "overlay", value_name = "SKELETON")]
    pub overlays: Vec<String>,

    /// Seed for variant selection (overrides the config)
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn execute(args: SolveArgs, config: &EngineConfig) -> Result<()> {
    let (library, base) = super::open_skeleton(&args.manifest, &args.skeleton)?;

    let config = EngineConfig {
        rng_seed: args.seed.or(config.rng_seed),
        ..config.clone()
    };
    let mut solver = AnimationSolver::from_config(Arc::clone(&library), base, &config);
    for name in &args.overlays {
        let overlay = library
            .load_skeleton(name)
            .with_context(|| format!("Overlay skeleton '{name}' not found"))?;
        solver.push_overlay(overlay, None);
    }

    let mut request = SolveRequest::new(args.action, args.weapon, args.walk).moving(args.moving);
    if let Some(spell) = args.spell {
        request = request.with_spell(spell);
    }
    if let Some(scheme) = args.item {
        request = request.with_item(ItemUse::new(scheme, args.item_from, args.item_to));
    }
    info!("Solving {:?}", request);

    let mut table = create_table(&["#", "Candidate", "Found"]);
    for (i, name) in solver.candidates(&request).into_iter().enumerate() {
        let found = match solver.solve_frm(&name) {
            Some(seq) => format!("layer {}, {}", seq.layer(), format_ms(seq.total_time())),
            None => "-".to_string(),
        };
        add_table_row(&mut table, vec![(i + 1).to_string(), name, found]);
    }
    table.printstd();
    println!();

    let seq = solver
        .solve_anim(&request)
        .with_context(|| format!("No clip resolves action '{}'", args.action))?;
    println!("Resolved: {}", seq.name());
    if let Some(next) = seq.next() {
        println!("Next: {next}");
    }
    Ok(())
}
