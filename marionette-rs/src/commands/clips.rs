//! Clip manifest command implementations

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::PathBuf;

use marionette_anim::manifest::Manifest;
use marionette_anim::{AssetLoader, ClipLibrary, Sequence, SequenceClass, Skeleton};

use crate::utils::{add_table_row, create_table, format_ms};

#[derive(Subcommand)]
pub enum ClipsCommands {
    /// List the skeletons and clips of a manifest
    List {
        /// Path to the manifest (JSON or YAML)
        manifest: PathBuf,

        /// Only list clips of this skeleton
        #[arg(short, long)]
        skeleton: Option<String>,
    },

    /// Show details of a single clip
    Info {
        /// Path to the manifest (JSON or YAML)
        manifest: PathBuf,

        /// Skeleton the clip belongs to
        skeleton: String,

        /// Clip name
        clip: String,
    },

    /// Build every clip of a manifest and report problems
    Validate {
        /// Path to the manifest (JSON or YAML)
        manifest: PathBuf,
    },
}

pub fn execute(command: ClipsCommands) -> Result<()> {
    match command {
        ClipsCommands::List { manifest, skeleton } => execute_list(manifest, skeleton),
        ClipsCommands::Info {
            manifest,
            skeleton,
            clip,
        } => execute_info(manifest, skeleton, clip),
        ClipsCommands::Validate { manifest } => execute_validate(manifest),
    }
}

fn class_name(class: SequenceClass) -> &'static str {
    match class {
        SequenceClass::Loop => "loop",
        SequenceClass::Transition => "transition",
    }
}

fn execute_list(path: PathBuf, only: Option<String>) -> Result<()> {
    let library = ClipLibrary::from_path(&path)
        .with_context(|| format!("Failed to load manifest: {}", path.display()))?;

    let mut table = create_table(&[
        "Skeleton", "Clip", "Layer", "Class", "Frames", "FPS", "Length", "Next",
    ]);
    let mut listed = 0;

    for name in library.skeleton_names() {
        if only.as_deref().is_some_and(|o| !o.eq_ignore_ascii_case(name)) {
            continue;
        }
        let Some(skeleton) = library.load_skeleton(name) else {
            continue;
        };
        for clip in library.clip_names(name) {
            let row = match library.load_animation(&skeleton, clip) {
                Some(seq) => vec![
                    name.to_string(),
                    seq.name().to_string(),
                    seq.layer().to_string(),
                    class_name(seq.class()).to_string(),
                    seq.frame_count().to_string(),
                    format!("{:.1}", seq.fps()),
                    format_ms(seq.total_time()),
                    seq.next().unwrap_or("-").to_string(),
                ],
                None => vec![
                    name.to_string(),
                    clip.to_string(),
                    "-".to_string(),
                    "invalid".to_string(),
                    "-".to_string(),
                    "-".to_string(),
                    "-".to_string(),
                    "-".to_string(),
                ],
            };
            add_table_row(&mut table, row);
            listed += 1;
        }
    }

    if listed == 0 {
        println!("No clips found");
    } else {
        table.printstd();
        println!("\n{listed} clip(s)");
    }
    Ok(())
}

fn execute_info(path: PathBuf, skeleton: String, clip: String) -> Result<()> {
    let (library, base) = super::open_skeleton(&path, &skeleton)?;
    let seq = library
        .load_animation(&base, &clip)
        .with_context(|| format!("Clip '{clip}' not found on skeleton '{}'", base.name()))?;

    print_sequence(&base, &seq);
    Ok(())
}

fn print_sequence(skeleton: &Skeleton, seq: &Sequence) {
    println!("Clip: {}", seq.name());
    println!("Skeleton: {}", skeleton.name());
    println!("Layer: {}", seq.layer());
    println!("Class: {}", class_name(seq.class()));
    println!("Flags: {:?}", seq.flags());
    println!("Frames: {} at {:.1} fps", seq.frame_count(), seq.fps());
    println!("Length: {}", format_ms(seq.total_time()));
    if seq.is_reverse() {
        println!("Reverse: yes");
    }
    if let Some(next) = seq.next() {
        println!("Next: {next}");
    }

    let motion = seq.root_motion();
    println!("Root motion: ({:.2}, {:.2}, {:.2})", motion.x, motion.y, motion.z);

    let nodes = skeleton.nodes();
    let bones: Vec<&str> = seq
        .node_index()
        .iter()
        .filter_map(|&i| nodes.get(i).map(|n| n.name.as_str()))
        .collect();
    println!("Bones ({}): {}", bones.len(), bones.join(", "));

    for (label, windows) in [
        ("Hit windows", seq.hit_windows()),
        ("Combo windows", seq.combo_windows()),
        ("Defence windows", seq.defence_windows()),
        ("Parry windows", seq.parry_windows()),
    ] {
        if windows.is_empty() {
            continue;
        }
        let spans: Vec<String> = windows
            .iter()
            .map(|w| format!("[{}, {})", w.start, w.end))
            .collect();
        println!("{label}: {}", spans.join(" "));
    }

    if !seq.events().is_empty() {
        println!();
        let mut table = create_table(&["Time", "Event"]);
        for event in seq.events() {
            add_table_row(
                &mut table,
                vec![format_ms(event.time), format!("{:?}", event.kind)],
            );
        }
        table.printstd();
    }
}

fn execute_validate(path: PathBuf) -> Result<()> {
    let manifest = Manifest::from_path(&path)
        .with_context(|| format!("Failed to load manifest: {}", path.display()))?;

    let mut failures = Vec::new();
    let mut checked = 0;
    for def in &manifest.skeletons {
        let skeleton = match def.build() {
            Ok(skeleton) => skeleton,
            Err(e) => {
                failures.push(format!("{}: {e}", def.name));
                continue;
            }
        };
        for clip in &def.clips {
            checked += 1;
            if clip.alias.is_none() {
                if let Err(e) = clip.build(&skeleton) {
                    failures.push(format!("{}/{}: {e}", def.name, clip.name));
                }
            }
        }
    }

    // Aliases only resolve through the library, which needs every skeleton
    if failures.is_empty() {
        check_aliases(&manifest, &mut failures)?;
    }

    if failures.is_empty() {
        println!(
            "✓ {} skeleton(s), {checked} clip(s) valid",
            manifest.skeletons.len()
        );
        Ok(())
    } else {
        for failure in &failures {
            println!("✗ {failure}");
        }
        anyhow::bail!("{} problem(s) found in {}", failures.len(), path.display())
    }
}

fn check_aliases(manifest: &Manifest, failures: &mut Vec<String>) -> Result<()> {
    let library = ClipLibrary::from_manifest(manifest.clone())?;
    for def in &manifest.skeletons {
        let Some(skeleton) = library.load_skeleton(&def.name) else {
            continue;
        };
        for clip in &def.clips {
            let Some(alias) = &clip.alias else {
                continue;
            };
            if library.load_animation(&skeleton, &clip.name).is_none() {
                failures.push(format!(
                    "{}/{}: alias '{alias}' does not resolve",
                    def.name, clip.name
                ));
            }
        }
    }
    Ok(())
}
