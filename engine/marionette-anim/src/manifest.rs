//! Clip manifests
//!
//! A manifest is the serialized description of one or more skeletons and the
//! clips authored against them. It is the input of
//! [`ClipLibrary`](crate::loader::ClipLibrary); the binary asset formats of a
//! shipping game are out of scope, so the manifest stands in for them in
//! tools and tests.
//!
//! ```yaml
//! skeletons:
//!   - name: HUMANS
//!     nodes:
//!       - { name: BIP01, translation: [0.0, 90.0, 0.0] }
//!       - { name: BIP01 HEAD, parent: BIP01 }
//!     clips:
//!       - name: S_RUN
//!         layer: 1
//!         flags: IDLE
//!         bones: [BIP01]
//!         samples:
//!           - [{ position: [0.0, 90.0, 0.0], rotation: [0.0, 0.0, 0.0, 1.0] }]
//! ```

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use glam::{Mat4, Quat, Vec3};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AnimError, Result};
use crate::sequence::{
    BoneSample, Sequence, SequenceClass, SequenceFlags, TimeWindow, TimedEvent,
};
use crate::skeleton::{Node, Skeleton};

fn default_fps() -> f32 {
    25.0
}

/// Serialized bone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
    pub name: String,
    /// Parent bone name; absent for roots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub translation: Vec3,
    #[serde(default)]
    pub rotation: Quat,
}

/// Serialized clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipDef {
    pub name: String,
    pub layer: u32,
    pub class: SequenceClass,
    pub flags: SequenceFlags,
    pub fps: f32,
    pub reverse: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// Reuse the keyframes, events and windows of another clip of the same
    /// skeleton; layer, class, flags, fps, reverse and next stay this clip's
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Bone names sampled by this clip, in sample order
    pub bones: Vec<String>,
    /// One entry per frame, one sample per bone
    pub samples: Vec<Vec<BoneSample>>,
    pub events: Vec<TimedEvent>,
    pub hit_windows: Vec<TimeWindow>,
    pub combo_windows: Vec<TimeWindow>,
    pub defence_windows: Vec<TimeWindow>,
    pub parry_windows: Vec<TimeWindow>,
    /// Explicit root displacement; derived from the root bone track if absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_motion: Option<Vec3>,
}

impl Default for ClipDef {
    fn default() -> Self {
        Self {
            name: String::new(),
            layer: 1,
            class: SequenceClass::Loop,
            flags: SequenceFlags::empty(),
            fps: default_fps(),
            reverse: false,
            next: None,
            alias: None,
            bones: Vec::new(),
            samples: Vec::new(),
            events: Vec::new(),
            hit_windows: Vec::new(),
            combo_windows: Vec::new(),
            defence_windows: Vec::new(),
            parry_windows: Vec::new(),
            root_motion: None,
        }
    }
}

impl ClipDef {
    /// Build an immutable [`Sequence`] bound to `skeleton`
    ///
    /// Every bone name must exist in the skeleton and every frame must carry
    /// exactly one sample per bone.
    pub fn build(&self, skeleton: &Skeleton) -> Result<Sequence> {
        let node_index = self
            .bones
            .iter()
            .map(|bone| {
                skeleton
                    .find_node(bone)
                    .ok_or_else(|| AnimError::UnknownBone {
                        clip: self.name.clone(),
                        bone: bone.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let bones = node_index.len();
        let frame_count = self.samples.len();
        if self.samples.iter().any(|frame| frame.len() != bones) {
            return Err(AnimError::SampleMismatch {
                clip: self.name.clone(),
                expected: frame_count * bones,
                actual: self.samples.iter().map(Vec::len).sum(),
            });
        }

        let samples: Vec<BoneSample> = self.samples.iter().flatten().copied().collect();
        let root_motion = self
            .root_motion
            .unwrap_or_else(|| self.derive_root_motion(skeleton, &node_index));

        Ok(Sequence {
            name: self.name.to_ascii_uppercase(),
            layer: self.layer,
            class: self.class,
            flags: self.flags,
            fps: self.fps,
            frame_count: frame_count as u32,
            reverse: self.reverse,
            next: self.next.as_ref().map(|n| n.to_ascii_uppercase()),
            samples,
            node_index,
            events: self.events.clone(),
            hit_windows: self.hit_windows.clone(),
            combo_windows: self.combo_windows.clone(),
            defence_windows: self.defence_windows.clone(),
            parry_windows: self.parry_windows.clone(),
            root_motion,
        })
    }

    /// Root bone displacement between the first and the last played frame
    fn derive_root_motion(&self, skeleton: &Skeleton, node_index: &[usize]) -> Vec3 {
        let Some(&root) = skeleton.root_nodes().first() else {
            return Vec3::ZERO;
        };
        let Some(slot) = node_index.iter().position(|&n| n == root) else {
            return Vec3::ZERO;
        };
        let (Some(first), Some(last)) = (self.samples.first(), self.samples.last()) else {
            return Vec3::ZERO;
        };

        let motion = last[slot].position - first[slot].position;
        if self.reverse { -motion } else { motion }
    }

    /// Copy of `source` presented under this clip's identity
    pub(crate) fn with_content_of(&self, source: &Self) -> Self {
        Self {
            name: self.name.clone(),
            layer: self.layer,
            class: self.class,
            flags: self.flags,
            fps: self.fps,
            reverse: self.reverse,
            next: self.next.clone(),
            alias: None,
            ..source.clone()
        }
    }
}

/// Serialized skeleton with its clips
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeletonDef {
    pub name: String,
    pub nodes: Vec<NodeDef>,
    pub clips: Vec<ClipDef>,
}

impl SkeletonDef {
    /// Resolve parent names and build the skeleton
    pub fn build(&self) -> Result<Skeleton> {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for def in &self.nodes {
            let parent = match &def.parent {
                Some(parent) => Some(
                    self.nodes
                        .iter()
                        .position(|n| n.name.eq_ignore_ascii_case(parent))
                        .ok_or_else(|| {
                            AnimError::Manifest(format!(
                                "skeleton '{}': bone '{}' has unknown parent '{}'",
                                self.name, def.name, parent
                            ))
                        })?,
                ),
                None => None,
            };
            let transform = Mat4::from_rotation_translation(def.rotation, def.translation);
            nodes.push(Node::new(def.name.clone(), parent, transform));
        }
        Ok(Skeleton::new(self.name.to_ascii_uppercase(), nodes))
    }
}

/// Top-level manifest document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub skeletons: Vec<SkeletonDef>,
}

impl Manifest {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let manifest: Self = serde_yaml_ng::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read a manifest, choosing JSON or YAML by file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let manifest: Self = read_document(path.as_ref())?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Reject duplicate skeleton, bone and clip names (case-insensitive)
    pub fn validate(&self) -> Result<()> {
        let mut skeletons = HashSet::new();
        for skeleton in &self.skeletons {
            if skeleton.name.is_empty() {
                return Err(AnimError::Manifest("skeleton without a name".into()));
            }
            if !skeletons.insert(skeleton.name.to_ascii_uppercase()) {
                return Err(AnimError::Manifest(format!(
                    "duplicate skeleton '{}'",
                    skeleton.name
                )));
            }

            let mut bones = HashSet::new();
            for node in &skeleton.nodes {
                if !bones.insert(node.name.to_ascii_uppercase()) {
                    return Err(AnimError::Manifest(format!(
                        "skeleton '{}': duplicate bone '{}'",
                        skeleton.name, node.name
                    )));
                }
            }

            let mut clips = HashSet::new();
            for clip in &skeleton.clips {
                if clip.name.is_empty() {
                    return Err(AnimError::Manifest(format!(
                        "skeleton '{}': clip without a name",
                        skeleton.name
                    )));
                }
                if !clips.insert(clip.name.to_ascii_uppercase()) {
                    return Err(AnimError::Manifest(format!(
                        "skeleton '{}': duplicate clip '{}'",
                        skeleton.name, clip.name
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn skeleton(&self, name: &str) -> Option<&SkeletonDef> {
        self.skeletons
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }
}

/// Deserialize a JSON (`.json`) or YAML (`.yaml`, `.yml`) document
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "json" => {
            let reader = BufReader::new(File::open(path)?);
            Ok(serde_json::from_reader(reader)?)
        }
        "yaml" | "yml" => {
            let reader = BufReader::new(File::open(path)?);
            Ok(serde_yaml_ng::from_reader(reader)?)
        }
        _ => Err(AnimError::UnsupportedFormat(path.display().to_string())),
    }
}
