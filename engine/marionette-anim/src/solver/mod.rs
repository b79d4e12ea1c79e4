//! Action to clip resolution
//!
//! [`AnimationSolver`] maps a [`SolveRequest`] to a concrete [`Sequence`].
//! The mapping is the [`RULES`](table::RULES) table: every rule that matches
//! the request contributes candidate names, and the first candidate that the
//! loader can resolve wins. Names are looked up on the overlay skeletons
//! first (most recently pushed first) and then on the base skeleton, so an
//! overlay can replace any clip of its base.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use marionette_anim::loader::{AssetLoader, ClipLibrary};
//! use marionette_anim::solver::{Action, AnimationSolver, SolveRequest, WalkMode, WeaponState};
//!
//! # fn main() -> marionette_anim::Result<()> {
//! let library: Arc<dyn AssetLoader> = Arc::new(ClipLibrary::from_path("humans.yaml")?);
//! let base = library.load_skeleton("HUMANS").expect("skeleton");
//! let solver = AnimationSolver::new(library, base);
//!
//! let request = SolveRequest::new(Action::Move, WeaponState::OneHanded, WalkMode::Run);
//! if let Some(clip) = solver.solve_anim(&request) {
//!     println!("playing {}", clip.name());
//! }
//! # Ok(())
//! # }
//! ```

mod action;
pub mod table;
mod template;

pub use action::{Action, ItemUse, SolveRequest, WalkMode, WalkSet, WeaponSet, WeaponState};
pub use template::{Candidate, NameTemplate, Slot};

use std::fmt;
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::config::EngineConfig;
use crate::loader::AssetLoader;
use crate::sequence::Sequence;
use crate::skeleton::Skeleton;

/// Skeleton pushed on top of the base to shadow its clips
#[derive(Debug, Clone)]
pub struct Overlay {
    pub skeleton: Arc<Skeleton>,
    /// Tick at which the overlay is dropped; `None` keeps it until popped
    pub expiry: Option<u64>,
}

impl Overlay {
    /// Whether the overlay still applies at `now`
    pub fn is_live(&self, now: u64) -> bool {
        self.expiry.is_none_or(|e| e > now)
    }
}

/// Per-character clip resolver
pub struct AnimationSolver {
    loader: Arc<dyn AssetLoader>,
    base: Arc<Skeleton>,
    overlays: Vec<Overlay>,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl fmt::Debug for AnimationSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationSolver")
            .field("base", &self.base.name())
            .field("overlays", &self.overlays)
            .finish_non_exhaustive()
    }
}

impl AnimationSolver {
    /// Solver with an OS-seeded random source
    pub fn new(loader: Arc<dyn AssetLoader>, base: Arc<Skeleton>) -> Self {
        Self::with_rng(loader, base, StdRng::from_os_rng())
    }

    /// Solver with an injected random source (deterministic variant choice)
    pub fn with_rng<R>(loader: Arc<dyn AssetLoader>, base: Arc<Skeleton>, rng: R) -> Self
    where
        R: RngCore + Send + 'static,
    {
        Self {
            loader,
            base,
            overlays: Vec::new(),
            rng: Mutex::new(Box::new(rng)),
        }
    }

    /// Solver seeded from `config.rng_seed`, or from the OS when unset
    pub fn from_config(
        loader: Arc<dyn AssetLoader>,
        base: Arc<Skeleton>,
        config: &EngineConfig,
    ) -> Self {
        match config.rng_seed {
            Some(seed) => Self::with_rng(loader, base, StdRng::seed_from_u64(seed)),
            None => Self::new(loader, base),
        }
    }

    pub fn base(&self) -> &Arc<Skeleton> {
        &self.base
    }

    pub fn loader(&self) -> &Arc<dyn AssetLoader> {
        &self.loader
    }

    /// Overlays, bottom first
    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    pub fn push_overlay(&mut self, skeleton: Arc<Skeleton>, expiry: Option<u64>) {
        debug!("Push overlay '{}' (expiry {:?})", skeleton.name(), expiry);
        self.overlays.push(Overlay { skeleton, expiry });
    }

    /// Remove the most recently pushed overlay named `name`
    pub fn pop_overlay(&mut self, name: &str) -> bool {
        match self
            .overlays
            .iter()
            .rposition(|o| o.skeleton.name().eq_ignore_ascii_case(name))
        {
            Some(pos) => {
                self.overlays.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn has_overlay(&self, name: &str) -> bool {
        self.overlays
            .iter()
            .any(|o| o.skeleton.name().eq_ignore_ascii_case(name))
    }

    /// Drop overlays whose expiry is at or before `now`
    pub fn expire_overlays(&mut self, now: u64) {
        self.overlays.retain(|o| {
            let keep = o.is_live(now);
            if !keep {
                debug!("Overlay '{}' expired at {}", o.skeleton.name(), now);
            }
            keep
        });
    }

    /// Resolve a clip by exact name through the overlay stack
    pub fn solve_frm(&self, name: &str) -> Option<Arc<Sequence>> {
        self.lookup(name, None)
    }

    /// Like [`solve_frm`](Self::solve_frm), skipping overlays expired at `now`
    /// even if [`expire_overlays`](Self::expire_overlays) has not run yet
    pub fn solve_frm_at(&self, name: &str, now: u64) -> Option<Arc<Sequence>> {
        self.lookup(name, Some(now))
    }

    /// Resolve the successor of `seq`
    pub fn solve_next(&self, seq: &Sequence) -> Option<Arc<Sequence>> {
        self.solve_frm(seq.next()?)
    }

    /// Resolve the successor of `seq` against the overlays live at `now`
    pub fn solve_next_at(&self, seq: &Sequence, now: u64) -> Option<Arc<Sequence>> {
        self.solve_frm_at(seq.next()?, now)
    }

    fn lookup(&self, name: &str, now: Option<u64>) -> Option<Arc<Sequence>> {
        self.overlays
            .iter()
            .rev()
            .filter(|o| now.is_none_or(|now| o.is_live(now)))
            .find_map(|o| self.loader.load_animation(&o.skeleton, name))
            .or_else(|| self.loader.load_animation(&self.base, name))
    }

    /// Candidate names for `request` in the order they are tried
    ///
    /// Every variant of a variant set is listed; duplicates are dropped.
    pub fn candidates(&self, request: &SolveRequest) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for candidate in matching(request) {
            for template in candidate.templates() {
                if let Some(name) = template.render(request) {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
        }
        names
    }

    /// Resolve `request` to a clip, `None` if no candidate resolves
    pub fn solve_anim(&self, request: &SolveRequest) -> Option<Arc<Sequence>> {
        for candidate in matching(request) {
            let found = match candidate {
                Candidate::Single(template) => self.solve_template(template, request),
                Candidate::Variants(variants) => self.solve_variants(variants, request),
            };
            if found.is_some() {
                return found;
            }
        }
        debug!("No clip for {:?}", request);
        None
    }

    fn solve_template(
        &self,
        template: &NameTemplate,
        request: &SolveRequest,
    ) -> Option<Arc<Sequence>> {
        let name = template.render(request)?;
        let found = self.solve_frm(&name);
        trace!("Candidate '{}' -> {}", name, found.is_some());
        found
    }

    fn solve_variants(
        &self,
        variants: &[NameTemplate],
        request: &SolveRequest,
    ) -> Option<Arc<Sequence>> {
        let first = variants.first()?;
        let pick = {
            let mut guard = self.rng.lock();
            let mut rng: &mut (dyn RngCore + Send) = &mut **guard;
            Rng::random_range(&mut rng, 0..variants.len())
        };
        self.solve_template(&variants[pick], request)
            .or_else(|| self.solve_template(first, request))
    }
}

fn matching(request: &SolveRequest) -> impl Iterator<Item = &'static Candidate> + '_ {
    table::RULES
        .iter()
        .filter(move |rule| rule.matches(request))
        .flat_map(|rule| rule.candidates.iter())
}
