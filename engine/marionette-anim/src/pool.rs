//! Shared cache of single-clip poses
//!
//! Static props and crowds frequently display the same clip at the same
//! phase. [`PosePool`] hands out one immutable [`Pose`] per
//! (skeleton, clip, phase) key so they share the computed matrices.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::trace;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::pose::Pose;
use crate::sequence::Sequence;
use crate::skeleton::Skeleton;

/// Statistics for monitoring pose pool effectiveness
#[derive(Debug, Default)]
pub struct PoolStatistics {
    /// Lookups answered from the pool
    pub hits: AtomicU64,
    /// Lookups that computed a new pose
    pub misses: AtomicU64,
    /// Entries dropped to respect `max_entries`
    pub evictions: AtomicU64,
}

impl PoolStatistics {
    /// Hit rate in `0.0..=1.0`
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Configuration for pose pool behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of cached poses, oldest evicted first; `None` is unbounded
    pub max_entries: Option<usize>,
    /// Whether to enable pool statistics collection
    pub collect_stats: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_entries: None,
            collect_stats: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PoseKey {
    skeleton: String,
    sequence: String,
    phase: u64,
}

#[derive(Debug, Default)]
struct PoolState {
    entries: HashMap<PoseKey, Arc<Pose>>,
    /// Insertion order, for eviction
    order: VecDeque<PoseKey>,
}

/// Thread-safe cache of immutable single-clip poses
#[derive(Debug, Default)]
pub struct PosePool {
    state: Mutex<PoolState>,
    stats: PoolStatistics,
    config: PoolConfig,
}

impl PosePool {
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
            stats: PoolStatistics::default(),
            config,
        }
    }

    /// Pose of `seq` on `skeleton`, `phase` ms into playback
    ///
    /// `phase` is reduced modulo the clip's total time. A missing entry is
    /// computed outside the lock; if another thread inserted the same key in
    /// the meantime, its pose is returned and the local one discarded.
    pub fn get(&self, skeleton: &Arc<Skeleton>, seq: &Arc<Sequence>, phase: u64) -> Arc<Pose> {
        let total = seq.total_time();
        let phase = if total == 0 { 0 } else { phase % total };
        let key = PoseKey {
            skeleton: skeleton.name().to_string(),
            sequence: seq.name().to_string(),
            phase,
        };

        if let Some(pose) = self.state.lock().entries.get(&key) {
            self.count(&self.stats.hits);
            return Arc::clone(pose);
        }
        self.count(&self.stats.misses);

        let pose = Arc::new(Pose::snapshot(Arc::clone(skeleton), Arc::clone(seq), phase));

        let mut state = self.state.lock();
        if let Some(existing) = state.entries.get(&key) {
            return Arc::clone(existing);
        }
        if let Some(max) = self.config.max_entries {
            while state.entries.len() >= max.max(1) {
                let Some(oldest) = state.order.pop_front() else {
                    break;
                };
                trace!("Evicting pooled pose {}/{}@{}", oldest.skeleton, oldest.sequence, oldest.phase);
                state.entries.remove(&oldest);
                self.count(&self.stats.evictions);
            }
        }
        state.order.push_back(key.clone());
        state.entries.insert(key, Arc::clone(&pose));
        pose
    }

    fn count(&self, counter: &AtomicU64) {
        if self.config.collect_stats {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached pose; poses already handed out stay valid
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.order.clear();
    }

    pub fn statistics(&self) -> &PoolStatistics {
        &self.stats
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}
