//! Clip model
//!
//! A [`Sequence`] is an immutable, named clip: per-bone keyframe samples plus
//! the timing metadata that combat and AI code reads (hit, combo, defence and
//! parry windows, timed events, root-motion displacement). Sequences are
//! produced by an [`AssetLoader`](crate::loader::AssetLoader), owned by its
//! cache and shared by every layer that plays them.
//!
//! All times are milliseconds relative to the start of the layer that plays
//! the clip.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Playback class of a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceClass {
    /// Runs indefinitely, frame indices wrap
    #[default]
    Loop,
    /// Runs once, holds its last frame, then advances to `next`
    Transition,
}

bitflags::bitflags! {
    /// Behavioural flags carried by a clip
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct SequenceFlags: u32 {
        /// Clip translates the character (root motion is consumed)
        const MOVE = 0x01;
        /// Clip rotates the character
        const ROTATE = 0x02;
        /// Idle-class clip (standing, swimming in place, ...)
        const IDLE = 0x04;
        /// Clip may be cut at any time
        const INTERRUPTIBLE = 0x08;
        /// Character is airborne during the clip
        const FLY = 0x10;
    }
}

/// Half-open time interval `[start, end)` in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: u64,
    pub end: u64,
}

impl TimeWindow {
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: u64) -> bool {
        self.start <= t && t < self.end
    }
}

/// Payload of a timed clip event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Gameplay marker (draw weapon, insert item, ...)
    Tag { tag: String },
    /// Sound effect, optionally resolved against the ground material
    Sound {
        name: String,
        #[serde(default)]
        ground: bool,
    },
    /// Particle effect attached to a bone slot
    Effect { name: String, slot: String },
    /// Stops the particle effect on a slot
    EffectStop { slot: String },
    /// Facial or mesh morph
    Morph { name: String },
}

/// Event fired when playback crosses `time`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub time: u64,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Events extracted over one `(barrier, now]` interval
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventBatch {
    /// Timed events in the order they were found
    pub timed: Vec<TimedEvent>,
    /// Number of hit moments crossed
    pub hits: u32,
}

impl EventBatch {
    pub fn clear(&mut self) {
        self.timed.clear();
        self.hits = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.timed.is_empty() && self.hits == 0
    }
}

/// Local transform sample of one bone in one frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoneSample {
    pub position: Vec3,
    pub rotation: Quat,
}

impl BoneSample {
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Component-wise linear blend, rotation renormalized
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            position: self.position.lerp(other.position, t),
            rotation: self.rotation.lerp(other.rotation, t),
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }
}

/// Immutable clip metadata and keyframe data
#[derive(Debug, Clone)]
pub struct Sequence {
    pub(crate) name: String,
    pub(crate) layer: u32,
    pub(crate) class: SequenceClass,
    pub(crate) flags: SequenceFlags,
    pub(crate) fps: f32,
    pub(crate) frame_count: u32,
    pub(crate) reverse: bool,
    pub(crate) next: Option<String>,
    /// Frame-major: `samples[frame * node_index.len() + i]`
    pub(crate) samples: Vec<BoneSample>,
    pub(crate) node_index: Vec<usize>,
    pub(crate) events: Vec<TimedEvent>,
    pub(crate) hit_windows: Vec<TimeWindow>,
    pub(crate) combo_windows: Vec<TimeWindow>,
    pub(crate) defence_windows: Vec<TimeWindow>,
    pub(crate) parry_windows: Vec<TimeWindow>,
    pub(crate) root_motion: Vec3,
}

impl Sequence {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without the `S_` state prefix; transition clips have none
    pub fn short_name(&self) -> Option<&str> {
        let prefix = self.name.get(..2)?;
        if prefix.eq_ignore_ascii_case("S_") && self.name.len() > 2 {
            Some(&self.name[2..])
        } else {
            None
        }
    }

    pub fn layer(&self) -> u32 {
        self.layer
    }

    pub fn class(&self) -> SequenceClass {
        self.class
    }

    pub fn flags(&self) -> SequenceFlags {
        self.flags
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    /// Name of the clip that follows this one
    pub fn next(&self) -> Option<&str> {
        self.next.as_deref()
    }

    /// Transition clip whose successor is itself
    pub fn is_self_looping(&self) -> bool {
        self.next
            .as_deref()
            .is_some_and(|n| n.eq_ignore_ascii_case(&self.name))
    }

    pub fn is_idle(&self) -> bool {
        self.flags.contains(SequenceFlags::IDLE)
    }

    pub fn is_move(&self) -> bool {
        self.flags.contains(SequenceFlags::MOVE)
    }

    pub fn is_attack(&self) -> bool {
        !self.hit_windows.is_empty()
    }

    /// Bones written by this clip
    pub fn node_index(&self) -> &[usize] {
        &self.node_index
    }

    pub fn samples(&self) -> &[BoneSample] {
        &self.samples
    }

    pub fn events(&self) -> &[TimedEvent] {
        &self.events
    }

    pub fn hit_windows(&self) -> &[TimeWindow] {
        &self.hit_windows
    }

    pub fn combo_windows(&self) -> &[TimeWindow] {
        &self.combo_windows
    }

    pub fn defence_windows(&self) -> &[TimeWindow] {
        &self.defence_windows
    }

    pub fn parry_windows(&self) -> &[TimeWindow] {
        &self.parry_windows
    }

    /// Root displacement over one full playback
    pub fn root_motion(&self) -> Vec3 {
        self.root_motion
    }

    /// Playback length in milliseconds
    pub fn total_time(&self) -> u64 {
        if self.fps <= 0.0 || self.frame_count == 0 {
            return 0;
        }
        (f64::from(self.frame_count) * 1000.0 / f64::from(self.fps)) as u64
    }

    /// Whether playback is over after `elapsed` ms at combo stage `combo_len`
    ///
    /// An attack clip ends at the end of its current combo stage; anything
    /// else ends after its total time.
    pub fn is_finished(&self, elapsed: u64, combo_len: u16) -> bool {
        match self.hit_windows.get(usize::from(combo_len)) {
            Some(stage) => elapsed > stage.end,
            None => elapsed > self.total_time(),
        }
    }

    /// Whether a layer playing this clip may be replaced now
    pub fn can_interrupt(&self, elapsed: u64, combo_len: u16) -> bool {
        self.class == SequenceClass::Loop
            || self.flags.contains(SequenceFlags::INTERRUPTIBLE)
            || self.is_finished(elapsed, combo_len)
            || self.combo_window_at(elapsed).is_some()
    }

    /// Index of the combo window containing `t`
    pub fn combo_window_at(&self, t: u64) -> Option<usize> {
        self.combo_windows.iter().position(|w| w.contains(t))
    }

    pub fn is_defence_window(&self, t: u64) -> bool {
        self.defence_windows.iter().any(|w| w.contains(t))
    }

    pub fn is_parry_window(&self, t: u64) -> bool {
        self.parry_windows.iter().any(|w| w.contains(t))
    }

    /// True until the first hit of the clip lands
    pub fn is_prehit(&self, start: u64, now: u64) -> bool {
        match self.hit_windows.first() {
            Some(first) => now.saturating_sub(start) < first.start,
            None => false,
        }
    }

    /// Root-motion displacement between `at` and `at + dt`
    pub fn speed(&self, at: u64, dt: u64) -> Vec3 {
        let total = self.total_time();
        if total == 0 {
            return Vec3::ZERO;
        }
        self.displacement(at.saturating_add(dt), total) - self.displacement(at, total)
    }

    fn displacement(&self, t: u64, total: u64) -> Vec3 {
        let progress = match self.class {
            SequenceClass::Loop => (t / total) as f32 + (t % total) as f32 / total as f32,
            SequenceClass::Transition => t.min(total) as f32 / total as f32,
        };
        self.root_motion * progress
    }

    /// Append events whose time falls in `(barrier, now]`, measured from `start`
    ///
    /// Events at time 0 (and at each cycle start of a Loop clip) fire in the
    /// first call whose interval extends past that instant, including a call
    /// whose barrier equals `start`. Loop clips repeat
    /// their events every [`total_time`](Self::total_time); each event fires at
    /// most once per call.
    pub fn process_events(&self, barrier: u64, start: u64, now: u64, out: &mut EventBatch) {
        let lo = barrier as i64 - start as i64;
        let hi = now as i64 - start as i64;
        if hi < 0 || hi <= lo {
            return;
        }

        let total = self.total_time() as i64;
        let period = (self.class == SequenceClass::Loop && total > 0).then_some(total);

        for event in &self.events {
            if occurs_in(event.time as i64, lo, hi, period) {
                out.timed.push(event.clone());
            }
        }
        for window in &self.hit_windows {
            if occurs_in(window.start as i64, lo, hi, period) {
                out.hits += 1;
            }
        }
    }

    /// Frame pair and blend factor for `elapsed` ms of playback
    ///
    /// `frame = elapsed * fps` in milli-frames; Loop clips wrap both indices,
    /// Transition clips clamp them to the last frame. Reverse clips mirror
    /// both indices afterwards.
    pub fn frame_pair(&self, elapsed: u64) -> Option<(usize, usize, f32)> {
        let count = u64::from(self.frame_count);
        if count == 0 {
            return None;
        }

        let frame = (elapsed as f64 * f64::from(self.fps)) as u64;
        let mut a = frame / 1000;
        let mut b = a + 1;
        let blend = (frame % 1000) as f32 / 1000.0;

        match self.class {
            SequenceClass::Loop => {
                a %= count;
                b %= count;
            }
            SequenceClass::Transition => {
                a = a.min(count - 1);
                b = b.min(count - 1);
            }
        }

        if self.reverse {
            a = count - 1 - a;
            b = count - 1 - b;
        }

        Some((a as usize, b as usize, blend))
    }

    /// Write the local transforms of every bone this clip animates
    pub fn sample_into(&self, elapsed: u64, base: &mut [Mat4]) {
        let bones = self.node_index.len();
        if bones == 0 || self.samples.len() != bones * self.frame_count as usize {
            return;
        }
        let Some((a, b, t)) = self.frame_pair(elapsed) else {
            return;
        };

        let frame_a = &self.samples[a * bones..(a + 1) * bones];
        let frame_b = &self.samples[b * bones..(b + 1) * bones];
        for (i, &node) in self.node_index.iter().enumerate() {
            if let Some(slot) = base.get_mut(node) {
                *slot = frame_a[i].lerp(&frame_b[i], t).to_matrix();
            }
        }
    }
}

/// Whether `ts` (repeated every `period` if given) lies in `(lo, hi]`
fn occurs_in(ts: i64, lo: i64, hi: i64, period: Option<i64>) -> bool {
    // Cycle-start events belong to the first interval after the cycle begins,
    // so a drain on the start tick itself neither loses nor repeats them
    if ts == 0 {
        let at = match period {
            Some(period) if lo > 0 => (lo + period - 1).div_euclid(period) * period,
            _ => 0,
        };
        return lo <= at && at < hi;
    }

    let at = match period {
        Some(period) if ts <= lo => ts + ((lo - ts).div_euclid(period) + 1) * period,
        _ => ts,
    };
    lo < at && at <= hi
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(class: SequenceClass, frame_count: u32, fps: f32) -> Sequence {
        Sequence {
            name: "S_TEST".to_string(),
            layer: 1,
            class,
            flags: SequenceFlags::empty(),
            fps,
            frame_count,
            reverse: false,
            next: None,
            samples: Vec::new(),
            node_index: Vec::new(),
            events: Vec::new(),
            hit_windows: Vec::new(),
            combo_windows: Vec::new(),
            defence_windows: Vec::new(),
            parry_windows: Vec::new(),
            root_motion: Vec3::ZERO,
        }
    }

    #[test]
    fn test_total_time() {
        assert_eq!(clip(SequenceClass::Loop, 25, 25.0).total_time(), 1000);
        assert_eq!(clip(SequenceClass::Loop, 10, 0.0).total_time(), 0);
        assert_eq!(clip(SequenceClass::Loop, 0, 25.0).total_time(), 0);
    }

    #[test]
    fn test_short_name() {
        let mut seq = clip(SequenceClass::Loop, 1, 25.0);
        seq.name = "S_1HRUNL".to_string();
        assert_eq!(seq.short_name(), Some("1HRUNL"));
        seq.name = "T_1HRUN_2_1HRUNL".to_string();
        assert_eq!(seq.short_name(), None);
        seq.name = "S_".to_string();
        assert_eq!(seq.short_name(), None);
    }

    #[test]
    fn test_transition_frames_clamp() {
        let seq = clip(SequenceClass::Transition, 10, 100.0);
        let (a, b, t) = seq.frame_pair(15).unwrap();
        assert_eq!((a, b), (1, 2));
        assert!((t - 0.5).abs() < 0.001);

        // Past the end: hold the last frame, never wrap
        let (a, b, _) = seq.frame_pair(150).unwrap();
        assert_eq!((a, b), (9, 9));
        let (a, b, _) = seq.frame_pair(95).unwrap();
        assert_eq!((a, b), (9, 9));
    }

    #[test]
    fn test_loop_frames_wrap() {
        let seq = clip(SequenceClass::Loop, 10, 100.0);
        let (a, b, _) = seq.frame_pair(95).unwrap();
        assert_eq!((a, b), (9, 0));
        let (a, b, _) = seq.frame_pair(125).unwrap();
        assert_eq!((a, b), (2, 3));
    }

    #[test]
    fn test_reverse_mirrors_frames() {
        let mut seq = clip(SequenceClass::Transition, 10, 100.0);
        seq.reverse = true;
        let (a, b, _) = seq.frame_pair(15).unwrap();
        assert_eq!((a, b), (8, 7));
    }

    #[test]
    fn test_is_finished_uses_combo_stage() {
        let mut seq = clip(SequenceClass::Transition, 100, 25.0);
        seq.hit_windows = vec![TimeWindow::new(300, 800), TimeWindow::new(1400, 2000)];
        assert!(!seq.is_finished(800, 0));
        assert!(seq.is_finished(801, 0));
        assert!(!seq.is_finished(801, 1));
        // Beyond the staged hits the clip length decides
        assert!(!seq.is_finished(4000, 2));
        assert!(seq.is_finished(4001, 2));
    }

    #[test]
    fn test_can_interrupt() {
        let looping = clip(SequenceClass::Loop, 10, 25.0);
        assert!(looping.can_interrupt(0, 0));

        let mut attack = clip(SequenceClass::Transition, 50, 25.0);
        attack.combo_windows = vec![TimeWindow::new(500, 700)];
        assert!(!attack.can_interrupt(100, 0));
        assert!(attack.can_interrupt(600, 0));
        assert!(attack.can_interrupt(2001, 0));

        attack.flags = SequenceFlags::INTERRUPTIBLE;
        assert!(attack.can_interrupt(100, 0));
    }

    #[test]
    fn test_prehit() {
        let mut seq = clip(SequenceClass::Transition, 50, 25.0);
        assert!(!seq.is_prehit(0, 0));
        seq.hit_windows = vec![TimeWindow::new(400, 900)];
        assert!(seq.is_prehit(1000, 1399));
        assert!(!seq.is_prehit(1000, 1400));
    }

    #[test]
    fn test_speed_from_root_motion() {
        let mut seq = clip(SequenceClass::Loop, 25, 25.0);
        seq.root_motion = Vec3::new(0.0, 0.0, 100.0);
        let v = seq.speed(0, 500);
        assert!((v.z - 50.0).abs() < 0.001);
        // Across the loop boundary the displacement keeps accumulating
        let v = seq.speed(900, 200);
        assert!((v.z - 20.0).abs() < 0.001);

        seq.class = SequenceClass::Transition;
        let v = seq.speed(900, 200);
        assert!((v.z - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_events_fire_once_per_interval() {
        let mut seq = clip(SequenceClass::Transition, 25, 25.0);
        seq.events = vec![
            TimedEvent {
                time: 0,
                kind: EventKind::Tag {
                    tag: "DRAWSOUND".to_string(),
                },
            },
            TimedEvent {
                time: 400,
                kind: EventKind::Sound {
                    name: "WHOOSH".to_string(),
                    ground: false,
                },
            },
        ];
        seq.hit_windows = vec![TimeWindow::new(400, 600)];

        let mut out = EventBatch::default();
        seq.process_events(90, 100, 300, &mut out);
        assert_eq!(out.timed.len(), 1);
        assert_eq!(out.hits, 0);

        out.clear();
        seq.process_events(300, 100, 500, &mut out);
        assert_eq!(out.timed.len(), 1);
        assert_eq!(out.timed[0].time, 400);
        assert_eq!(out.hits, 1);

        out.clear();
        seq.process_events(500, 100, 900, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_start_events_survive_drain_on_start_tick() {
        let mut seq = clip(SequenceClass::Transition, 25, 25.0);
        seq.events = vec![TimedEvent {
            time: 0,
            kind: EventKind::Tag {
                tag: "FIGHTMODE".to_string(),
            },
        }];

        // Drained on the start tick before anything elapsed
        let mut out = EventBatch::default();
        seq.process_events(90, 100, 100, &mut out);
        assert!(out.is_empty());

        out.clear();
        seq.process_events(100, 100, 140, &mut out);
        assert_eq!(out.timed.len(), 1);

        out.clear();
        seq.process_events(140, 100, 180, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_loop_cycle_start_events_fire_each_cycle() {
        let mut seq = clip(SequenceClass::Loop, 10, 10.0);
        seq.events = vec![TimedEvent {
            time: 0,
            kind: EventKind::Tag {
                tag: "STEP".to_string(),
            },
        }];

        let mut fired = 0;
        let mut barrier = 0;
        for now in (50..=3000).step_by(50) {
            let mut out = EventBatch::default();
            seq.process_events(barrier, 0, now, &mut out);
            fired += out.timed.len();
            barrier = now;
        }
        // Cycles begin at 0, 1000 and 2000; the one at 3000 has not elapsed yet
        assert_eq!(fired, 3);
    }

    #[test]
    fn test_loop_events_repeat_each_cycle() {
        let mut seq = clip(SequenceClass::Loop, 10, 10.0);
        seq.events = vec![TimedEvent {
            time: 200,
            kind: EventKind::Sound {
                name: "STEP".to_string(),
                ground: true,
            },
        }];

        let mut out = EventBatch::default();
        seq.process_events(1100, 0, 1300, &mut out);
        assert_eq!(out.timed.len(), 1);

        out.clear();
        seq.process_events(1300, 0, 2100, &mut out);
        assert!(out.timed.is_empty());

        // A window longer than one cycle still reports the event once
        out.clear();
        seq.process_events(0, 0, 5000, &mut out);
        assert_eq!(out.timed.len(), 1);
    }

    #[test]
    fn test_time_window_half_open() {
        let w = TimeWindow::new(10, 20);
        assert!(w.contains(10));
        assert!(w.contains(19));
        assert!(!w.contains(20));
    }
}
