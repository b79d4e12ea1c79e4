//! Skeleton and clip lookup
//!
//! The engine never reads asset files itself. It asks an [`AssetLoader`] for
//! skeletons and clips by name and treats a missing answer as "no such clip".
//! [`ClipLibrary`] is the loader shipped with the crate: it serves clips from
//! a [`Manifest`], building each [`Sequence`] on first request and memoizing
//! both hits and misses.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::RwLock;

use crate::error::{AnimError, Result};
use crate::manifest::{ClipDef, Manifest};
use crate::sequence::Sequence;
use crate::skeleton::Skeleton;

/// Alias chains longer than this are treated as broken
const MAX_ALIAS_DEPTH: usize = 8;

/// Source of skeletons and clips
///
/// Clip lookups are scoped by the owning skeleton so an overlay skeleton can
/// provide a clip of the same name as its base. Implementations memoize and
/// report failures as `None`.
pub trait AssetLoader: Send + Sync {
    fn load_skeleton(&self, name: &str) -> Option<Arc<Skeleton>>;

    fn load_animation(&self, skeleton: &Skeleton, name: &str) -> Option<Arc<Sequence>>;
}

type ClipKey = (String, String);

/// Memoizing manifest-backed loader
#[derive(Debug)]
pub struct ClipLibrary {
    skeletons: HashMap<String, Arc<Skeleton>>,
    clip_defs: HashMap<String, HashMap<String, ClipDef>>,
    cache: RwLock<HashMap<ClipKey, Option<Arc<Sequence>>>>,
}

impl ClipLibrary {
    /// Build all skeletons of `manifest`; clips are built lazily
    pub fn from_manifest(manifest: Manifest) -> Result<Self> {
        manifest.validate()?;

        let mut skeletons = HashMap::new();
        let mut clip_defs = HashMap::new();
        for def in manifest.skeletons {
            let skeleton = def.build()?;
            let key = skeleton.name().to_string();
            let clips = def
                .clips
                .into_iter()
                .map(|clip| (clip.name.to_ascii_uppercase(), clip))
                .collect::<HashMap<_, _>>();
            debug!(
                "Registered skeleton '{}' with {} bones and {} clips",
                key,
                skeleton.node_count(),
                clips.len()
            );
            skeletons.insert(key.clone(), Arc::new(skeleton));
            clip_defs.insert(key, clips);
        }

        Ok(Self {
            skeletons,
            clip_defs,
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_manifest(Manifest::from_path(path)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::from_manifest(Manifest::from_json_str(text)?)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Self::from_manifest(Manifest::from_yaml_str(text)?)
    }

    /// Registered skeleton names, sorted
    pub fn skeleton_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.skeletons.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Clip names authored for `skeleton`, sorted
    pub fn clip_names(&self, skeleton: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .clip_defs
            .get(&skeleton.to_ascii_uppercase())
            .map(|clips| clips.keys().map(String::as_str).collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }

    /// Number of memoized lookups (hits and misses)
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    fn build_clip(&self, skeleton: &Skeleton, name: &str) -> Option<Arc<Sequence>> {
        let clips = self.clip_defs.get(skeleton.name())?;
        let def = clips.get(name)?;

        let mut source = def;
        let mut depth = 0;
        while let Some(alias) = &source.alias {
            depth += 1;
            match clips.get(&alias.to_ascii_uppercase()) {
                Some(next) if depth <= MAX_ALIAS_DEPTH => source = next,
                _ => {
                    warn!(
                        "Clip '{}' of '{}': alias '{}' does not resolve",
                        name,
                        skeleton.name(),
                        alias
                    );
                    return None;
                }
            }
        }

        let built = if std::ptr::eq(source, def) {
            def.build(skeleton)
        } else {
            def.with_content_of(source).build(skeleton)
        };

        match built {
            Ok(seq) => Some(Arc::new(seq)),
            Err(e) => {
                warn!("Failed to build clip '{}' of '{}': {}", name, skeleton.name(), e);
                None
            }
        }
    }
}

impl AssetLoader for ClipLibrary {
    fn load_skeleton(&self, name: &str) -> Option<Arc<Skeleton>> {
        self.skeletons.get(&name.to_ascii_uppercase()).cloned()
    }

    fn load_animation(&self, skeleton: &Skeleton, name: &str) -> Option<Arc<Sequence>> {
        let key = (skeleton.name().to_string(), name.to_ascii_uppercase());
        if let Some(entry) = self.cache.read().get(&key) {
            return entry.clone();
        }

        let mut cache = self.cache.write();
        if let Some(entry) = cache.get(&key) {
            return entry.clone();
        }
        let built = self.build_clip(skeleton, &key.1);
        cache.insert(key, built.clone());
        built
    }
}

impl TryFrom<Manifest> for ClipLibrary {
    type Error = AnimError;

    fn try_from(manifest: Manifest) -> Result<Self> {
        Self::from_manifest(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "skeletons": [
            {
                "name": "HUMANS",
                "nodes": [{"name": "BIP01"}],
                "clips": [
                    {"name": "T_STAND_2_RUN", "class": "transition", "next": "S_RUN",
                     "bones": ["BIP01"],
                     "samples": [[{"position": [0, 0, 0], "rotation": [0, 0, 0, 1]}],
                                 [{"position": [0, 0, 5], "rotation": [0, 0, 0, 1]}]]},
                    {"name": "T_RUN_2_STAND", "class": "transition", "alias": "T_STAND_2_RUN",
                     "reverse": true, "layer": 2},
                    {"name": "S_BROKEN", "bones": ["TAIL"]},
                    {"name": "S_LOOP_A", "alias": "S_LOOP_B"},
                    {"name": "S_LOOP_B", "alias": "S_LOOP_A"}
                ]
            },
            {"name": "BABE", "nodes": [{"name": "BIP01"}]}
        ]
    }"#;

    #[test]
    fn test_lookup_is_memoized() {
        let library = ClipLibrary::from_json_str(JSON).unwrap();
        let skeleton = library.load_skeleton("humans").unwrap();

        let a = library.load_animation(&skeleton, "t_stand_2_run").unwrap();
        let b = library.load_animation(&skeleton, "T_STAND_2_RUN").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(library.cached_len(), 1);
    }

    #[test]
    fn test_misses_are_memoized() {
        let library = ClipLibrary::from_json_str(JSON).unwrap();
        let skeleton = library.load_skeleton("HUMANS").unwrap();
        assert!(library.load_animation(&skeleton, "S_NOPE").is_none());
        assert!(library.load_animation(&skeleton, "S_BROKEN").is_none());
        assert!(library.load_animation(&skeleton, "S_NOPE").is_none());
        assert_eq!(library.cached_len(), 2);
    }

    #[test]
    fn test_alias_reuses_content() {
        let library = ClipLibrary::from_json_str(JSON).unwrap();
        let skeleton = library.load_skeleton("HUMANS").unwrap();
        let back = library.load_animation(&skeleton, "T_RUN_2_STAND").unwrap();
        assert_eq!(back.frame_count(), 2);
        assert_eq!(back.layer(), 2);
        assert!(back.is_reverse());
        assert_eq!(back.next(), None);
        assert_eq!(back.root_motion(), glam::Vec3::new(0.0, 0.0, -5.0));
    }

    #[test]
    fn test_alias_cycle_is_a_miss() {
        let library = ClipLibrary::from_json_str(JSON).unwrap();
        let skeleton = library.load_skeleton("HUMANS").unwrap();
        assert!(library.load_animation(&skeleton, "S_LOOP_A").is_none());
    }

    #[test]
    fn test_lookup_is_scoped_by_skeleton() {
        let library = ClipLibrary::from_json_str(JSON).unwrap();
        let babe = library.load_skeleton("BABE").unwrap();
        assert!(library.load_animation(&babe, "T_STAND_2_RUN").is_none());
        assert_eq!(library.skeleton_names(), vec!["BABE", "HUMANS"]);
        assert_eq!(library.clip_names("babe"), Vec::<&str>::new());
    }
}
