//! Structured clip name templates

use std::fmt;

use super::action::SolveRequest;

/// One piece of a clip name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Lit(&'static str),
    /// Weapon tag of the request (`FIST`, `1H`, ..., empty when unarmed)
    Weapon,
    /// Spell animation code; the template does not render without one
    Spell,
    /// Item interaction scheme
    Scheme,
    /// Current item state: `STAND` before the stance, `S<n>` inside it
    FromState,
    /// Requested item state `S<n>`
    ToState,
}

/// Clip name built from literal and request-dependent slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameTemplate(pub(crate) &'static [Slot]);

impl NameTemplate {
    pub const fn new(slots: &'static [Slot]) -> Self {
        Self(slots)
    }

    pub fn slots(&self) -> &'static [Slot] {
        self.0
    }

    /// Concrete name for `request`, `None` if a slot has no value
    pub fn render(&self, request: &SolveRequest) -> Option<String> {
        let mut name = String::with_capacity(24);
        for slot in self.0 {
            match slot {
                Slot::Lit(text) => name.push_str(text),
                Slot::Weapon => name.push_str(request.weapon.tag()),
                Slot::Spell => name.push_str(request.spell.as_deref()?),
                Slot::Scheme => name.push_str(&request.item.as_ref()?.scheme),
                Slot::FromState => match request.item.as_ref()?.from {
                    Some(state) => {
                        name.push('S');
                        name.push_str(&state.to_string());
                    }
                    None => name.push_str("STAND"),
                },
                Slot::ToState => {
                    name.push('S');
                    name.push_str(&request.item.as_ref()?.to.to_string());
                }
            }
        }
        Some(name.to_ascii_uppercase())
    }
}

impl fmt::Display for NameTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for slot in self.0 {
            match slot {
                Slot::Lit(text) => f.write_str(text)?,
                Slot::Weapon => f.write_str("{weapon}")?,
                Slot::Spell => f.write_str("{spell}")?,
                Slot::Scheme => f.write_str("{scheme}")?,
                Slot::FromState => f.write_str("{from}")?,
                Slot::ToState => f.write_str("{to}")?,
            }
        }
        Ok(())
    }
}

/// A candidate of a rule: one name or a set of interchangeable variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    Single(NameTemplate),
    /// One variant is picked at random; variant 0 is the fallback
    Variants(&'static [NameTemplate]),
}

impl Candidate {
    /// All templates of this candidate in declaration order
    pub fn templates(&self) -> &[NameTemplate] {
        match self {
            Self::Single(template) => std::slice::from_ref(template),
            Self::Variants(variants) => variants,
        }
    }
}
