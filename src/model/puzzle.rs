use std::collections::BTreeSet;

use super::molecule::Molecule;
use super::types::{Element, GlyphKind, MechanismKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puzzle {
    pub name: String,
    pub reagents: Vec<Molecule>,
    pub products: Vec<Molecule>,
    pub allowed_mechanisms: BTreeSet<MechanismKind>,
    pub allowed_glyphs: BTreeSet<GlyphKind>,
}

impl Puzzle {
    /// A puzzle that permits every mechanism and glyph.
    pub fn new(name: impl Into<String>, reagents: Vec<Molecule>, products: Vec<Molecule>) -> Self {
        Self {
            name: name.into(),
            reagents,
            products,
            allowed_mechanisms: MechanismKind::ALL.into_iter().collect(),
            allowed_glyphs: GlyphKind::ALL.into_iter().collect(),
        }
    }

    #[inline]
    pub fn allows_glyph(&self, glyph: GlyphKind) -> bool {
        self.allowed_glyphs.contains(&glyph)
    }

    #[inline]
    pub fn allows_mechanism(&self, mechanism: MechanismKind) -> bool {
        self.allowed_mechanisms.contains(&mechanism)
    }

    /// Elements that some reagent supplies directly.
    pub fn reagent_elements(&self) -> BTreeSet<Element> {
        self.reagents
            .iter()
            .flat_map(|m| m.atoms().iter().map(|a| a.element))
            .collect()
    }

    pub fn product_elements(&self) -> BTreeSet<Element> {
        self.products
            .iter()
            .flat_map(|m| m.atoms().iter().map(|a| a.element))
            .collect()
    }

    pub fn has_repeating_products(&self) -> bool {
        self.products.iter().any(Molecule::has_repeats)
    }
}
