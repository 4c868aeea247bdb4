use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::hex::HexPos;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid or unsupported element name: '{0}'")]
pub struct ParseElementError(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid bond kind string: '{0}'")]
pub struct ParseBondKindError(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown glyph kind: '{0}'")]
pub struct ParseGlyphError(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mechanism kind: '{0}'")]
pub struct ParseMechanismError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Element {
    Salt = 1,
    Air,
    Earth,
    Fire,
    Water,
    Quicksilver,
    Gold,
    Silver,
    Copper,
    Iron,
    Tin,
    Lead,
    Vitae,
    Mors,
    Repeat,
    Quintessence = 16,
}

impl Element {
    pub const ALL: [Element; 16] = [
        Element::Salt,
        Element::Air,
        Element::Earth,
        Element::Fire,
        Element::Water,
        Element::Quicksilver,
        Element::Gold,
        Element::Silver,
        Element::Copper,
        Element::Iron,
        Element::Tin,
        Element::Lead,
        Element::Vitae,
        Element::Mors,
        Element::Repeat,
        Element::Quintessence,
    ];

    pub const CARDINALS: [Element; 4] =
        [Element::Air, Element::Earth, Element::Fire, Element::Water];

    /// Metals from lowest to highest rank.
    pub const METALS: [Element; 6] = [
        Element::Lead,
        Element::Tin,
        Element::Iron,
        Element::Copper,
        Element::Silver,
        Element::Gold,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Element::Salt => "salt",
            Element::Air => "air",
            Element::Earth => "earth",
            Element::Fire => "fire",
            Element::Water => "water",
            Element::Quicksilver => "quicksilver",
            Element::Gold => "gold",
            Element::Silver => "silver",
            Element::Copper => "copper",
            Element::Iron => "iron",
            Element::Tin => "tin",
            Element::Lead => "lead",
            Element::Vitae => "vitae",
            Element::Mors => "mors",
            Element::Repeat => "repeat",
            Element::Quintessence => "quintessence",
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn is_cardinal(&self) -> bool {
        Self::CARDINALS.contains(self)
    }

    pub fn is_metal(&self) -> bool {
        Self::METALS.contains(self)
    }

    /// Rank of a metal, `0` for lead up to `5` for gold.
    pub fn metal_rank(&self) -> Option<usize> {
        Self::METALS.iter().position(|m| m == self)
    }

    pub fn metal_of_rank(rank: usize) -> Option<Element> {
        Self::METALS.get(rank).copied()
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Element {
    type Err = ParseElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Element::ALL
            .into_iter()
            .find(|e| e.name() == lower)
            .ok_or_else(|| ParseElementError(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondKind {
    #[default]
    None,
    Single,
    Triplex,
}

impl BondKind {
    pub fn is_bond(&self) -> bool {
        !matches!(self, BondKind::None)
    }
}

impl fmt::Display for BondKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BondKind::None => write!(f, "None"),
            BondKind::Single => write!(f, "Single"),
            BondKind::Triplex => write!(f, "Triplex"),
        }
    }
}

impl FromStr for BondKind {
    type Err = ParseBondKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" | "normal" | "1" => Ok(BondKind::Single),
            "triplex" | "3" => Ok(BondKind::Triplex),
            _ => Err(ParseBondKindError(s.to_string())),
        }
    }
}

/// Stationary glyph kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GlyphKind {
    Bonding,
    MultiBonding,
    TriplexBonding,
    Unbonding,
    Calcification,
    Projection,
    Purification,
    Duplication,
    Unification,
    Animismus,
    Dispersion,
    Disposal,
    Equilibrium,
}

impl GlyphKind {
    pub const ALL: [GlyphKind; 13] = [
        GlyphKind::Bonding,
        GlyphKind::MultiBonding,
        GlyphKind::TriplexBonding,
        GlyphKind::Unbonding,
        GlyphKind::Calcification,
        GlyphKind::Projection,
        GlyphKind::Purification,
        GlyphKind::Duplication,
        GlyphKind::Unification,
        GlyphKind::Animismus,
        GlyphKind::Dispersion,
        GlyphKind::Disposal,
        GlyphKind::Equilibrium,
    ];

    /// Name used in puzzle descriptions.
    pub fn name(&self) -> &'static str {
        match self {
            GlyphKind::Bonding => "bonding",
            GlyphKind::MultiBonding => "multi-bonding",
            GlyphKind::TriplexBonding => "triplex-bonding",
            GlyphKind::Unbonding => "unbonding",
            GlyphKind::Calcification => "calcification",
            GlyphKind::Projection => "projection",
            GlyphKind::Purification => "purification",
            GlyphKind::Duplication => "duplication",
            GlyphKind::Unification => "unification",
            GlyphKind::Animismus => "animismus",
            GlyphKind::Dispersion => "dispersion",
            GlyphKind::Disposal => "disposal",
            GlyphKind::Equilibrium => "equilibrium",
        }
    }

    /// Object type name in the solution file format.
    pub fn type_name(&self) -> &'static str {
        match self {
            GlyphKind::Bonding => "bonder",
            GlyphKind::MultiBonding => "bonder-speed",
            GlyphKind::TriplexBonding => "bonder-prisma",
            GlyphKind::Unbonding => "unbonder",
            GlyphKind::Calcification => "glyph-calcification",
            GlyphKind::Projection => "glyph-projection",
            GlyphKind::Purification => "glyph-purification",
            GlyphKind::Duplication => "glyph-duplication",
            GlyphKind::Unification => "glyph-unification",
            GlyphKind::Animismus => "glyph-life-and-death",
            GlyphKind::Dispersion => "glyph-dispersion",
            GlyphKind::Disposal => "glyph-disposal",
            GlyphKind::Equilibrium => "glyph-marker",
        }
    }

    pub fn from_type_name(name: &str) -> Option<GlyphKind> {
        GlyphKind::ALL.into_iter().find(|g| g.type_name() == name)
    }

    /// Cells covered by the glyph at rotation zero, relative to its origin.
    pub fn footprint(&self) -> &'static [HexPos] {
        const SINGLE: &[HexPos] = &[HexPos::new(0, 0)];
        const PAIR: &[HexPos] = &[HexPos::new(0, 0), HexPos::new(1, 0)];
        const TRIANGLE: &[HexPos] = &[HexPos::new(0, 0), HexPos::new(1, 0), HexPos::new(0, 1)];
        const MULTI: &[HexPos] = &[
            HexPos::new(0, 0),
            HexPos::new(1, 0),
            HexPos::new(0, -1),
            HexPos::new(-1, 1),
        ];
        const UNIFICATION: &[HexPos] = &[
            HexPos::new(0, 0),
            HexPos::new(0, 1),
            HexPos::new(-1, 1),
            HexPos::new(0, -1),
            HexPos::new(1, -1),
        ];
        const ANIMISMUS: &[HexPos] = &[
            HexPos::new(0, 0),
            HexPos::new(1, 0),
            HexPos::new(0, 1),
            HexPos::new(1, -1),
        ];
        const DISPERSION: &[HexPos] = &[
            HexPos::new(0, 0),
            HexPos::new(1, 0),
            HexPos::new(1, -1),
            HexPos::new(0, -1),
            HexPos::new(-1, 0),
        ];
        const DISPOSAL: &[HexPos] = &[
            HexPos::new(0, 0),
            HexPos::new(1, 0),
            HexPos::new(0, 1),
            HexPos::new(-1, 1),
            HexPos::new(-1, 0),
            HexPos::new(0, -1),
            HexPos::new(1, -1),
        ];
        match self {
            GlyphKind::Calcification | GlyphKind::Equilibrium => SINGLE,
            GlyphKind::Bonding
            | GlyphKind::Unbonding
            | GlyphKind::Projection
            | GlyphKind::Duplication => PAIR,
            GlyphKind::Purification | GlyphKind::TriplexBonding => TRIANGLE,
            GlyphKind::MultiBonding => MULTI,
            GlyphKind::Unification => UNIFICATION,
            GlyphKind::Animismus => ANIMISMUS,
            GlyphKind::Dispersion => DISPERSION,
            GlyphKind::Disposal => DISPOSAL,
        }
    }

    pub fn cost(&self) -> u32 {
        match self {
            GlyphKind::Bonding | GlyphKind::Unbonding | GlyphKind::Calcification => 10,
            GlyphKind::MultiBonding => 30,
            GlyphKind::Disposal | GlyphKind::Equilibrium => 0,
            _ => 20,
        }
    }

    /// Glyphs whose use is checked after synthesis rather than at construction.
    pub fn is_bonder(&self) -> bool {
        matches!(
            self,
            GlyphKind::Bonding
                | GlyphKind::MultiBonding
                | GlyphKind::TriplexBonding
                | GlyphKind::Unbonding
        )
    }
}

impl fmt::Display for GlyphKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for GlyphKind {
    type Err = ParseGlyphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        GlyphKind::ALL
            .into_iter()
            .find(|g| g.name() == lower || g.type_name() == lower)
            .ok_or_else(|| ParseGlyphError(s.to_string()))
    }
}

/// Moving actuator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MechanismKind {
    Arm1,
    Arm2,
    Arm3,
    Arm6,
    Piston,
    Track,
    VanBerlo,
}

impl MechanismKind {
    pub const ALL: [MechanismKind; 7] = [
        MechanismKind::Arm1,
        MechanismKind::Arm2,
        MechanismKind::Arm3,
        MechanismKind::Arm6,
        MechanismKind::Piston,
        MechanismKind::Track,
        MechanismKind::VanBerlo,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MechanismKind::Arm1 => "arm1",
            MechanismKind::Arm2 => "arm2",
            MechanismKind::Arm3 => "arm3",
            MechanismKind::Arm6 => "arm6",
            MechanismKind::Piston => "piston",
            MechanismKind::Track => "track",
            MechanismKind::VanBerlo => "van-berlo",
        }
    }

    /// Object type name in the solution file format.
    pub fn type_name(&self) -> &'static str {
        match self {
            MechanismKind::VanBerlo => "baron",
            other => other.name(),
        }
    }

    pub fn from_type_name(name: &str) -> Option<MechanismKind> {
        MechanismKind::ALL
            .into_iter()
            .find(|m| m.type_name() == name)
    }

    /// Base cost; tracks are charged per cell instead.
    pub fn cost(&self) -> u32 {
        match self {
            MechanismKind::Arm1 => 20,
            MechanismKind::Arm2 | MechanismKind::Arm3 | MechanismKind::Arm6 => 30,
            MechanismKind::VanBerlo => 30,
            MechanismKind::Piston => 40,
            MechanismKind::Track => 5,
        }
    }

    pub fn is_arm(&self) -> bool {
        !matches!(self, MechanismKind::Track)
    }
}

impl fmt::Display for MechanismKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for MechanismKind {
    type Err = ParseMechanismError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        MechanismKind::ALL
            .into_iter()
            .find(|m| m.name() == lower || m.type_name() == lower)
            .ok_or_else(|| ParseMechanismError(s.to_string()))
    }
}
