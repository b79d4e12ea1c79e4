//! Semantic action requests
//!
//! Gameplay code describes *what* a character should do with an [`Action`]
//! plus its equipment ([`WeaponState`]) and locomotion ([`WalkMode`]); the
//! solver turns that into a clip name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Semantic animation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Idle,
    Move,
    MoveBack,
    MoveL,
    MoveR,
    RotL,
    RotR,
    WhirlL,
    WhirlR,
    Jump,
    JumpUpLow,
    JumpUpMid,
    JumpUp,
    Fall,
    FallDeep,
    Fallen,
    Attack,
    AttackL,
    AttackR,
    AttackBlock,
    AttackFinish,
    StumbleA,
    StumbleB,
    AimBow,
    CastSpell,
    CastSpellEnd,
    UseItem,
    UseItemEnd,
    ItemGet,
    ItemDrop,
    DeadA,
    DeadB,
    UnconsciousA,
    UnconsciousB,
    WakeUp,
}

impl Action {
    pub const ALL: [Self; 35] = [
        Self::Idle,
        Self::Move,
        Self::MoveBack,
        Self::MoveL,
        Self::MoveR,
        Self::RotL,
        Self::RotR,
        Self::WhirlL,
        Self::WhirlR,
        Self::Jump,
        Self::JumpUpLow,
        Self::JumpUpMid,
        Self::JumpUp,
        Self::Fall,
        Self::FallDeep,
        Self::Fallen,
        Self::Attack,
        Self::AttackL,
        Self::AttackR,
        Self::AttackBlock,
        Self::AttackFinish,
        Self::StumbleA,
        Self::StumbleB,
        Self::AimBow,
        Self::CastSpell,
        Self::CastSpellEnd,
        Self::UseItem,
        Self::UseItemEnd,
        Self::ItemGet,
        Self::ItemDrop,
        Self::DeadA,
        Self::DeadB,
        Self::UnconsciousA,
        Self::UnconsciousB,
        Self::WakeUp,
    ];

    /// Stable snake_case name, as used by the serde representation
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Move => "move",
            Self::MoveBack => "move_back",
            Self::MoveL => "move_l",
            Self::MoveR => "move_r",
            Self::RotL => "rot_l",
            Self::RotR => "rot_r",
            Self::WhirlL => "whirl_l",
            Self::WhirlR => "whirl_r",
            Self::Jump => "jump",
            Self::JumpUpLow => "jump_up_low",
            Self::JumpUpMid => "jump_up_mid",
            Self::JumpUp => "jump_up",
            Self::Fall => "fall",
            Self::FallDeep => "fall_deep",
            Self::Fallen => "fallen",
            Self::Attack => "attack",
            Self::AttackL => "attack_l",
            Self::AttackR => "attack_r",
            Self::AttackBlock => "attack_block",
            Self::AttackFinish => "attack_finish",
            Self::StumbleA => "stumble_a",
            Self::StumbleB => "stumble_b",
            Self::AimBow => "aim_bow",
            Self::CastSpell => "cast_spell",
            Self::CastSpellEnd => "cast_spell_end",
            Self::UseItem => "use_item",
            Self::UseItemEnd => "use_item_end",
            Self::ItemGet => "item_get",
            Self::ItemDrop => "item_drop",
            Self::DeadA => "dead_a",
            Self::DeadB => "dead_b",
            Self::UnconsciousA => "unconscious_a",
            Self::UnconsciousB => "unconscious_b",
            Self::WakeUp => "wake_up",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| format!("unknown action '{s}'"))
    }
}

bitflags::bitflags! {
    /// Set of weapon states a rule applies to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WeaponSet: u8 {
        const UNARMED = 0x01;
        const FIST = 0x02;
        const ONE_HANDED = 0x04;
        const TWO_HANDED = 0x08;
        const BOW = 0x10;
        const CROSSBOW = 0x20;
        const MAGE = 0x40;

        const MELEE = Self::ONE_HANDED.bits() | Self::TWO_HANDED.bits();
        const RANGED = Self::BOW.bits() | Self::CROSSBOW.bits();
        const ANY = 0x7f;
    }
}

bitflags::bitflags! {
    /// Set of locomotion modes a rule applies to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WalkSet: u8 {
        const RUN = 0x01;
        const WALK = 0x02;
        const SNEAK = 0x04;
        const WATER = 0x08;
        const SWIM = 0x10;
        const DIVE = 0x20;

        const GROUND = Self::RUN.bits() | Self::WALK.bits() | Self::SNEAK.bits() | Self::WATER.bits();
        const ANY = 0x3f;
    }
}

/// Current equipment of the character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponState {
    #[default]
    NoWeapon,
    Fist,
    OneHanded,
    TwoHanded,
    Bow,
    Crossbow,
    Mage,
}

impl WeaponState {
    pub const ALL: [Self; 7] = [
        Self::NoWeapon,
        Self::Fist,
        Self::OneHanded,
        Self::TwoHanded,
        Self::Bow,
        Self::Crossbow,
        Self::Mage,
    ];

    /// Tag spliced into clip names (`S_<tag>RUN`)
    pub const fn tag(self) -> &'static str {
        match self {
            Self::NoWeapon => "",
            Self::Fist => "FIST",
            Self::OneHanded => "1H",
            Self::TwoHanded => "2H",
            Self::Bow => "BOW",
            Self::Crossbow => "CBOW",
            Self::Mage => "MAG",
        }
    }

    pub const fn set(self) -> WeaponSet {
        match self {
            Self::NoWeapon => WeaponSet::UNARMED,
            Self::Fist => WeaponSet::FIST,
            Self::OneHanded => WeaponSet::ONE_HANDED,
            Self::TwoHanded => WeaponSet::TWO_HANDED,
            Self::Bow => WeaponSet::BOW,
            Self::Crossbow => WeaponSet::CROSSBOW,
            Self::Mage => WeaponSet::MAGE,
        }
    }
}

impl FromStr for WeaponState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "no_weapon" | "" => Ok(Self::NoWeapon),
            "fist" => Ok(Self::Fist),
            "1h" | "one_handed" => Ok(Self::OneHanded),
            "2h" | "two_handed" => Ok(Self::TwoHanded),
            "bow" => Ok(Self::Bow),
            "cbow" | "crossbow" => Ok(Self::Crossbow),
            "mag" | "mage" => Ok(Self::Mage),
            _ => Err(format!("unknown weapon state '{s}'")),
        }
    }
}

/// Current locomotion mode of the character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkMode {
    #[default]
    Run,
    Walk,
    Sneak,
    /// Wading through shallow water
    Water,
    Swim,
    Dive,
}

impl WalkMode {
    pub const fn set(self) -> WalkSet {
        match self {
            Self::Run => WalkSet::RUN,
            Self::Walk => WalkSet::WALK,
            Self::Sneak => WalkSet::SNEAK,
            Self::Water => WalkSet::WATER,
            Self::Swim => WalkSet::SWIM,
            Self::Dive => WalkSet::DIVE,
        }
    }
}

impl FromStr for WalkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "run" => Ok(Self::Run),
            "walk" => Ok(Self::Walk),
            "sneak" => Ok(Self::Sneak),
            "water" => Ok(Self::Water),
            "swim" => Ok(Self::Swim),
            "dive" => Ok(Self::Dive),
            _ => Err(format!("unknown walk mode '{s}'")),
        }
    }
}

/// Item interaction parameters for `UseItem` / `UseItemEnd`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemUse {
    /// Interaction scheme (`POTION`, `MAP`, ...)
    pub scheme: String,
    /// Current item state, `None` before the stance has been entered
    #[serde(default)]
    pub from: Option<u32>,
    /// Requested item state
    #[serde(default)]
    pub to: u32,
}

impl ItemUse {
    pub fn new(scheme: impl Into<String>, from: Option<u32>, to: u32) -> Self {
        Self {
            scheme: scheme.into(),
            from,
            to,
        }
    }
}

/// Everything the solver needs to pick a clip
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SolveRequest {
    pub action: Action,
    #[serde(default)]
    pub weapon: WeaponState,
    #[serde(default)]
    pub walk: WalkMode,
    /// Character is currently moving (selects attack-while-running etc.)
    #[serde(default)]
    pub moving: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spell: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemUse>,
}

impl SolveRequest {
    pub fn new(action: Action, weapon: WeaponState, walk: WalkMode) -> Self {
        Self {
            action,
            weapon,
            walk,
            moving: false,
            spell: None,
            item: None,
        }
    }

    #[must_use]
    pub fn with_action(&self, action: Action) -> Self {
        Self {
            action,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn moving(mut self, moving: bool) -> Self {
        self.moving = moving;
        self
    }

    #[must_use]
    pub fn with_spell(mut self, spell: impl Into<String>) -> Self {
        self.spell = Some(spell.into());
        self
    }

    #[must_use]
    pub fn with_item(mut self, item: ItemUse) -> Self {
        self.item = Some(item);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(WeaponState::NoWeapon, "")]
    #[test_case(WeaponState::Fist, "FIST")]
    #[test_case(WeaponState::OneHanded, "1H")]
    #[test_case(WeaponState::TwoHanded, "2H")]
    #[test_case(WeaponState::Bow, "BOW")]
    #[test_case(WeaponState::Crossbow, "CBOW")]
    #[test_case(WeaponState::Mage, "MAG")]
    fn test_weapon_tags(weapon: WeaponState, tag: &str) {
        assert_eq!(weapon.tag(), tag);
    }

    #[test]
    fn test_action_names_round_trip() {
        for action in Action::ALL {
            assert_eq!(action.name().parse::<Action>(), Ok(action));
        }
        assert_eq!("Attack-Block".parse::<Action>(), Ok(Action::AttackBlock));
        assert!("dance".parse::<Action>().is_err());
    }

    #[test]
    fn test_sets_cover_every_state() {
        for weapon in WeaponState::ALL {
            assert!(WeaponSet::ANY.contains(weapon.set()));
        }
        assert!(WalkSet::GROUND.contains(WalkMode::Water.set()));
        assert!(!WalkSet::GROUND.contains(WalkMode::Swim.set()));
    }

    #[test]
    fn test_serde_names() {
        let request: SolveRequest =
            serde_json::from_str(r#"{"action":"attack_l","weapon":"two_handed"}"#).unwrap();
        assert_eq!(request.action, Action::AttackL);
        assert_eq!(request.weapon, WeaponState::TwoHanded);
        assert_eq!(request.walk, WalkMode::Run);
    }
}
