//! Action to clip-name rule table
//!
//! Each [`Rule`] names the actions, weapon states and locomotion modes it
//! applies to and the clip names it proposes. The solver collects the
//! candidates of every matching rule in table order and plays the first one
//! that resolves, so more specific rules (water, weapon-tagged names) come
//! before their fallbacks.

use super::action::{Action, SolveRequest, WalkSet, WeaponSet};
use super::template::{Candidate, NameTemplate, Slot};

use Action as A;
use Slot::{FromState, Lit, Scheme, Spell, ToState, Weapon as W};

/// One entry of the rule table
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub actions: &'static [Action],
    pub weapons: WeaponSet,
    pub walks: WalkSet,
    /// `Some` restricts the rule to moving (or standing) characters
    pub moving: Option<bool>,
    pub candidates: &'static [Candidate],
}

impl Rule {
    pub fn matches(&self, request: &SolveRequest) -> bool {
        self.actions.contains(&request.action)
            && self.weapons.contains(request.weapon.set())
            && self.walks.contains(request.walk.set())
            && self.moving.is_none_or(|m| m == request.moving)
    }
}

macro_rules! name {
    ($($slot:expr),+ $(,)?) => {
        Candidate::Single(NameTemplate(&[$($slot),+]))
    };
}

macro_rules! variants {
    ($([$($slot:expr),+]),+ $(,)?) => {
        Candidate::Variants(&[$(NameTemplate(&[$($slot),+])),+])
    };
}

const fn rule(
    actions: &'static [Action],
    weapons: WeaponSet,
    walks: WalkSet,
    candidates: &'static [Candidate],
) -> Rule {
    Rule {
        actions,
        weapons,
        walks,
        moving: None,
        candidates,
    }
}

const fn when_moving(mut rule: Rule, moving: bool) -> Rule {
    rule.moving = Some(moving);
    rule
}

const ANY: WeaponSet = WeaponSet::ANY;
const SUBMERGED: WalkSet = WalkSet::SWIM.union(WalkSet::DIVE);
const GROUND: WalkSet = WalkSet::GROUND;
const CLOSE: WeaponSet = WeaponSet::FIST.union(WeaponSet::MELEE);
const SLOW: WalkSet = WalkSet::WALK.union(WalkSet::WATER);

pub static RULES: &[Rule] = &[
    // Swimming and diving take precedence over every weapon state
    rule(&[A::Idle], ANY, WalkSet::DIVE, &[name![Lit("S_DIVE")]]),
    rule(&[A::Idle], ANY, WalkSet::SWIM, &[name![Lit("S_SWIM")]]),
    rule(&[A::Move], ANY, WalkSet::DIVE, &[name![Lit("S_DIVEF")]]),
    rule(&[A::Move], ANY, WalkSet::SWIM, &[name![Lit("S_SWIMF")]]),
    rule(&[A::MoveBack], ANY, SUBMERGED, &[name![Lit("S_SWIMB")]]),
    rule(&[A::RotL], ANY, WalkSet::DIVE, &[name![Lit("T_DIVETURNL")]]),
    rule(&[A::RotR], ANY, WalkSet::DIVE, &[name![Lit("T_DIVETURNR")]]),
    rule(&[A::RotL], ANY, WalkSet::SWIM, &[name![Lit("T_SWIMTURNL")]]),
    rule(&[A::RotR], ANY, WalkSet::SWIM, &[name![Lit("T_SWIMTURNR")]]),
    rule(
        &[A::DeadA, A::DeadB],
        ANY,
        SUBMERGED,
        &[name![Lit("T_DIVE_2_DROWNED")], name![Lit("S_DROWNED")]],
    ),
    // Melee and fist combat
    rule(&[A::Attack], WeaponSet::FIST, GROUND, &[name![Lit("S_FISTATTACK")]]),
    when_moving(
        rule(&[A::Attack], WeaponSet::MELEE, GROUND, &[name![Lit("T_"), W, Lit("ATTACKMOVE")]]),
        true,
    ),
    rule(&[A::Attack], WeaponSet::MELEE, GROUND, &[name![Lit("S_"), W, Lit("ATTACK")]]),
    rule(&[A::AttackL], CLOSE, GROUND, &[name![Lit("T_"), W, Lit("ATTACKL")]]),
    rule(&[A::AttackR], CLOSE, GROUND, &[name![Lit("T_"), W, Lit("ATTACKR")]]),
    rule(&[A::AttackBlock], WeaponSet::FIST, GROUND, &[name![Lit("T_FISTPARADE_0")]]),
    rule(
        &[A::AttackBlock],
        WeaponSet::MELEE,
        GROUND,
        &[variants![
            [Lit("T_"), W, Lit("PARADE_0")],
            [Lit("T_"), W, Lit("PARADE_0_A2")],
            [Lit("T_"), W, Lit("PARADE_0_A3")],
        ]],
    ),
    rule(&[A::AttackFinish], WeaponSet::MELEE, GROUND, &[name![Lit("T_"), W, Lit("SFINISH")]]),
    // Ranged combat
    rule(&[A::Attack], WeaponSet::RANGED, GROUND, &[name![Lit("S_"), W, Lit("SHOOT")]]),
    rule(
        &[A::AimBow],
        WeaponSet::RANGED,
        GROUND,
        &[name![Lit("T_"), W, Lit("RUN_2_"), W, Lit("AIM")], name![Lit("S_"), W, Lit("AIM")]],
    ),
    // Magic
    rule(
        &[A::Attack, A::CastSpell],
        WeaponSet::MAGE,
        GROUND,
        &[
            name![Lit("T_MAGRUN_2_"), Spell, Lit("SHOOT")],
            name![Lit("S_"), Spell, Lit("SHOOT")],
            name![Lit("S_"), Spell, Lit("CAST")],
        ],
    ),
    rule(
        &[A::CastSpellEnd],
        ANY,
        GROUND,
        &[
            name![Lit("T_"), Spell, Lit("SHOOT_2_STAND")],
            name![Lit("T_"), Spell, Lit("CAST_2_STAND")],
        ],
    ),
    // Hit reactions
    rule(
        &[A::StumbleA],
        ANY,
        GROUND,
        &[name![Lit("T_"), W, Lit("STUMBLE")], name![Lit("T_STUMBLE")]],
    ),
    rule(
        &[A::StumbleB],
        ANY,
        GROUND,
        &[name![Lit("T_"), W, Lit("STUMBLEB")], name![Lit("T_STUMBLEB")]],
    ),
    // Items
    rule(&[A::ItemGet], ANY, GROUND, &[name![Lit("T_STAND_2_IGET")], name![Lit("S_IGET")]]),
    rule(&[A::ItemDrop], ANY, GROUND, &[name![Lit("T_STAND_2_IDROP")], name![Lit("S_IDROP")]]),
    rule(
        &[A::UseItem],
        ANY,
        GROUND,
        &[
            name![Lit("T_"), Scheme, Lit("_"), FromState, Lit("_2_"), ToState],
            name![Lit("S_"), Scheme, Lit("_"), ToState],
        ],
    ),
    rule(
        &[A::UseItemEnd],
        ANY,
        GROUND,
        &[
            name![Lit("T_"), Scheme, Lit("_"), FromState, Lit("_2_STAND")],
            name![Lit("T_"), Scheme, Lit("_S0_2_STAND")],
        ],
    ),
    // Death and unconsciousness
    rule(
        &[A::DeadA],
        ANY,
        GROUND,
        &[name![Lit("T_"), W, Lit("DEAD")], name![Lit("T_DEAD")], name![Lit("S_DEAD")]],
    ),
    rule(
        &[A::DeadB],
        ANY,
        GROUND,
        &[name![Lit("T_"), W, Lit("DEADB")], name![Lit("T_DEADB")], name![Lit("S_DEADB")]],
    ),
    rule(
        &[A::UnconsciousA],
        ANY,
        GROUND,
        &[
            name![Lit("T_"), W, Lit("STAND_2_WOUNDED")],
            name![Lit("T_STAND_2_WOUNDED")],
            name![Lit("S_WOUNDED")],
        ],
    ),
    rule(
        &[A::UnconsciousB],
        ANY,
        GROUND,
        &[
            name![Lit("T_"), W, Lit("STAND_2_WOUNDEDB")],
            name![Lit("T_STAND_2_WOUNDEDB")],
            name![Lit("S_WOUNDEDB")],
        ],
    ),
    rule(
        &[A::WakeUp],
        ANY,
        WalkSet::ANY,
        &[name![Lit("T_WOUNDED_2_STAND")], name![Lit("T_WOUNDEDB_2_STAND")]],
    ),
    // Locomotion
    rule(&[A::Idle], ANY, WalkSet::RUN, &[name![Lit("S_"), W, Lit("RUN")], name![Lit("S_RUN")]]),
    rule(&[A::Idle], ANY, SLOW, &[name![Lit("S_"), W, Lit("WALK")], name![Lit("S_WALK")]]),
    rule(
        &[A::Idle],
        ANY,
        WalkSet::SNEAK,
        &[name![Lit("S_"), W, Lit("SNEAK")], name![Lit("S_SNEAK")], name![Lit("S_WALK")]],
    ),
    rule(&[A::Move], ANY, WalkSet::RUN, &[name![Lit("S_"), W, Lit("RUNL")], name![Lit("S_RUNL")]]),
    rule(&[A::Move], ANY, WalkSet::WALK, &[name![Lit("S_"), W, Lit("WALKL")], name![Lit("S_WALKL")]]),
    rule(
        &[A::Move],
        ANY,
        WalkSet::SNEAK,
        &[name![Lit("S_"), W, Lit("SNEAKL")], name![Lit("S_SNEAKL")]],
    ),
    rule(
        &[A::Move],
        ANY,
        WalkSet::WATER,
        &[name![Lit("S_"), W, Lit("WALKWL")], name![Lit("S_WALKWL")]],
    ),
    rule(&[A::MoveBack], ANY, WalkSet::RUN, &[name![Lit("T_"), W, Lit("JUMPB")], name![Lit("T_JUMPB")]]),
    rule(
        &[A::MoveBack],
        ANY,
        SLOW.union(WalkSet::SNEAK),
        &[name![Lit("S_"), W, Lit("WALKBL")], name![Lit("S_WALKBL")]],
    ),
    rule(
        &[A::MoveL],
        ANY,
        WalkSet::RUN,
        &[name![Lit("T_"), W, Lit("RUNSTRAFEL")], name![Lit("T_RUNSTRAFEL")]],
    ),
    rule(
        &[A::MoveR],
        ANY,
        WalkSet::RUN,
        &[name![Lit("T_"), W, Lit("RUNSTRAFER")], name![Lit("T_RUNSTRAFER")]],
    ),
    rule(
        &[A::MoveL],
        ANY,
        SLOW.union(WalkSet::SNEAK),
        &[name![Lit("T_"), W, Lit("WALKWSTRAFEL")], name![Lit("T_WALKWSTRAFEL")]],
    ),
    rule(
        &[A::MoveR],
        ANY,
        SLOW.union(WalkSet::SNEAK),
        &[name![Lit("T_"), W, Lit("WALKWSTRAFER")], name![Lit("T_WALKWSTRAFER")]],
    ),
    rule(
        &[A::RotL],
        ANY,
        WalkSet::RUN,
        &[name![Lit("T_"), W, Lit("RUNTURNL")], name![Lit("T_RUNTURNL")]],
    ),
    rule(
        &[A::RotR],
        ANY,
        WalkSet::RUN,
        &[name![Lit("T_"), W, Lit("RUNTURNR")], name![Lit("T_RUNTURNR")]],
    ),
    rule(
        &[A::RotL],
        ANY,
        SLOW,
        &[name![Lit("T_"), W, Lit("WALKWTURNL")], name![Lit("T_WALKWTURNL")]],
    ),
    rule(
        &[A::RotR],
        ANY,
        SLOW,
        &[name![Lit("T_"), W, Lit("WALKWTURNR")], name![Lit("T_WALKWTURNR")]],
    ),
    rule(
        &[A::RotL],
        ANY,
        WalkSet::SNEAK,
        &[name![Lit("T_"), W, Lit("SNEAKTURNL")], name![Lit("T_SNEAKTURNL")]],
    ),
    rule(
        &[A::RotR],
        ANY,
        WalkSet::SNEAK,
        &[name![Lit("T_"), W, Lit("SNEAKTURNR")], name![Lit("T_SNEAKTURNR")]],
    ),
    rule(&[A::WhirlL], ANY, GROUND, &[name![Lit("T_SURPRISE_CCW")]]),
    rule(&[A::WhirlR], ANY, GROUND, &[name![Lit("T_SURPRISE_CW")]]),
    // Jumping and falling
    when_moving(
        rule(&[A::Jump], ANY, GROUND, &[name![Lit("T_RUNL_2_JUMP")]]),
        true,
    ),
    rule(&[A::Jump], ANY, GROUND, &[name![Lit("T_STAND_2_JUMP")], name![Lit("S_JUMP")]]),
    rule(
        &[A::JumpUpLow],
        ANY,
        GROUND,
        &[name![Lit("T_STAND_2_JUMPUPLOW")], name![Lit("S_JUMPUPLOW")]],
    ),
    rule(
        &[A::JumpUpMid],
        ANY,
        GROUND,
        &[name![Lit("T_STAND_2_JUMPUPMID")], name![Lit("S_JUMPUPMID")]],
    ),
    rule(&[A::JumpUp], ANY, GROUND, &[name![Lit("T_STAND_2_JUMPUP")], name![Lit("S_JUMPUP")]]),
    rule(&[A::Fall], ANY, WalkSet::ANY, &[name![Lit("S_FALLDN")]]),
    rule(&[A::FallDeep], ANY, WalkSet::ANY, &[name![Lit("S_FALL")], name![Lit("S_FALLDN")]]),
    rule(&[A::Fallen], ANY, WalkSet::ANY, &[name![Lit("S_FALLEN")], name![Lit("T_FALLDN_2_STAND")]]),
];
