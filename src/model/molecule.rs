use std::collections::{BTreeMap, HashMap, VecDeque};
use thiserror::Error;

use super::hex::{HexPos, Pose, Rotation};
use super::types::{BondKind, Element};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoleculeError {
    #[error("two atoms share the cell {0}")]
    DuplicateAtom(HexPos),

    #[error("bond endpoint {0} has no atom")]
    MissingAtom(HexPos),

    #[error("cells {0} and {1} are not adjacent")]
    NotAdjacent(HexPos, HexPos),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub element: Element,
    pub position: HexPos,
    /// Bond slots indexed by direction, see [`Rotation::unit`].
    pub bonds: [BondKind; 6],
}

impl Atom {
    pub fn new(element: Element, position: HexPos) -> Self {
        Self {
            element,
            position,
            bonds: [BondKind::None; 6],
        }
    }

    pub fn bond(&self, direction: Rotation) -> BondKind {
        self.bonds[direction.steps() as usize]
    }

    pub fn bonded_directions(&self) -> impl Iterator<Item = Rotation> + '_ {
        Rotation::ALL
            .into_iter()
            .filter(|d| self.bond(*d).is_bond())
    }

    fn rotate(&mut self, rotation: Rotation) {
        self.position = self.position.rotate(rotation);
        let old = self.bonds;
        for (i, kind) in old.into_iter().enumerate() {
            let target = Rotation::new(i as i32) + rotation;
            self.bonds[target.steps() as usize] = kind;
        }
    }
}

/// A rigid cluster of atoms kept in normalized coordinates.
///
/// Atoms are translated so that the smallest `q` and the smallest `r` are
/// both zero. [`placement`](Molecule::placement) maps the coordinates the
/// molecule was built with onto the normalized ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Molecule {
    atoms: Vec<Atom>,
    index: HashMap<HexPos, usize>,
    width: i32,
    height: i32,
    diagonal: i32,
    placement: Pose,
}

impl Molecule {
    pub fn new(atoms: Vec<Atom>) -> Result<Self, MoleculeError> {
        let mut molecule = Self {
            atoms,
            index: HashMap::new(),
            width: 0,
            height: 0,
            diagonal: 0,
            placement: Pose::IDENTITY,
        };
        molecule.reindex()?;
        molecule.normalize_origin();
        Ok(molecule)
    }

    pub fn from_elements(cells: &[(Element, HexPos)]) -> Result<Self, MoleculeError> {
        Self::new(
            cells
                .iter()
                .map(|&(element, pos)| Atom::new(element, pos))
                .collect(),
        )
    }

    /// Records a reciprocal bond between two adjacent atoms.
    ///
    /// Positions are in the molecule's current (normalized) frame.
    pub fn add_bond(&mut self, a: HexPos, b: HexPos, kind: BondKind) -> Result<(), MoleculeError> {
        let direction = a.direction_to(b).ok_or(MoleculeError::NotAdjacent(a, b))?;
        let ia = *self.index.get(&a).ok_or(MoleculeError::MissingAtom(a))?;
        let ib = *self.index.get(&b).ok_or(MoleculeError::MissingAtom(b))?;
        self.atoms[ia].bonds[direction.steps() as usize] = kind;
        self.atoms[ib].bonds[direction.opposite().steps() as usize] = kind;
        Ok(())
    }

    /// Adds a bond given in the coordinates the molecule was built with.
    pub fn add_bond_original(
        &mut self,
        a: HexPos,
        b: HexPos,
        kind: BondKind,
    ) -> Result<(), MoleculeError> {
        let a = self.placement.apply(a);
        let b = self.placement.apply(b);
        self.add_bond(a, b, kind)
    }

    fn reindex(&mut self) -> Result<(), MoleculeError> {
        self.index.clear();
        for (i, atom) in self.atoms.iter().enumerate() {
            if self.index.insert(atom.position, i).is_some() {
                return Err(MoleculeError::DuplicateAtom(atom.position));
            }
        }
        Ok(())
    }

    fn normalize_origin(&mut self) {
        if self.atoms.is_empty() {
            return;
        }
        let min_q = self.atoms.iter().map(|a| a.position.q).min().unwrap_or(0);
        let min_r = self.atoms.iter().map(|a| a.position.r).min().unwrap_or(0);
        let shift = HexPos::new(-min_q, -min_r);
        for atom in &mut self.atoms {
            atom.position += shift;
        }
        self.placement = Pose::at(shift).compose(self.placement);
        self.index = self
            .atoms
            .iter()
            .enumerate()
            .map(|(i, a)| (a.position, i))
            .collect();

        let extent = |f: fn(&HexPos) -> i32| {
            let lo = self.atoms.iter().map(|a| f(&a.position)).min().unwrap_or(0);
            let hi = self.atoms.iter().map(|a| f(&a.position)).max().unwrap_or(0);
            hi - lo + 1
        };
        self.width = extent(|p| p.q);
        self.height = extent(|p| p.r);
        self.diagonal = extent(|p| p.q + p.r);
    }

    /// Rotates every atom and bond about the origin, then re-normalizes.
    pub fn rotate(&mut self, rotation: Rotation) {
        for atom in &mut self.atoms {
            atom.rotate(rotation);
        }
        self.placement = Pose::new(HexPos::ORIGIN, rotation).compose(self.placement);
        self.normalize_origin();
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn atom_at(&self, pos: HexPos) -> Option<&Atom> {
        self.index.get(&pos).map(|&i| &self.atoms[i])
    }

    pub fn index_of(&self, pos: HexPos) -> Option<usize> {
        self.index.get(&pos).copied()
    }

    pub fn set_element(&mut self, index: usize, element: Element) {
        if let Some(atom) = self.atoms.get_mut(index) {
            atom.element = element;
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn diagonal(&self) -> i32 {
        self.diagonal
    }

    pub fn placement(&self) -> Pose {
        self.placement
    }

    pub fn has_repeats(&self) -> bool {
        self.atoms.iter().any(|a| a.element == Element::Repeat)
    }

    pub fn has_triplex(&self) -> bool {
        self.atoms
            .iter()
            .any(|a| a.bonds.contains(&BondKind::Triplex))
    }

    /// Bond between the atom at `pos` and its neighbor in `direction`.
    pub fn bond(&self, pos: HexPos, direction: Rotation) -> BondKind {
        self.atom_at(pos)
            .map(|a| a.bond(direction))
            .unwrap_or_default()
    }

    /// Every bond once, as `(from, to, kind)` with `from < to`.
    pub fn bonds(&self) -> Vec<(HexPos, HexPos, BondKind)> {
        let mut out = Vec::new();
        for atom in &self.atoms {
            for d in atom.bonded_directions() {
                let other = atom.position.neighbor(d);
                if atom.position < other {
                    out.push((atom.position, other, atom.bond(d)));
                }
            }
        }
        out
    }

    /// Atom indices grouped by row `r`, each row sorted by `q`.
    pub fn rows(&self) -> BTreeMap<i32, Vec<usize>> {
        let mut rows: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (i, atom) in self.atoms.iter().enumerate() {
            rows.entry(atom.position.r).or_default().push(i);
        }
        for row in rows.values_mut() {
            row.sort_by_key(|&i| self.atoms[i].position.q);
        }
        rows
    }

    /// Atom indices from the top row down, left to right within a row.
    pub fn top_down_order(&self) -> Vec<usize> {
        self.rows().into_values().rev().flatten().collect()
    }

    /// Atom indices from the bottom row up, left to right within a row.
    pub fn bottom_up_order(&self) -> Vec<usize> {
        self.rows().into_values().flatten().collect()
    }

    /// Whether the atoms of a single-row molecule fill a contiguous run of cells.
    pub fn is_contiguous_row(&self) -> bool {
        self.height == 1 && self.width as usize == self.atoms.len()
    }

    /// Connected components over bonds accepted by `follow`.
    pub fn components(&self, follow: impl Fn(BondKind) -> bool) -> Vec<Vec<usize>> {
        let mut seen = vec![false; self.atoms.len()];
        let mut out = Vec::new();
        for start in 0..self.atoms.len() {
            if seen[start] {
                continue;
            }
            seen[start] = true;
            let mut component = Vec::new();
            let mut queue = VecDeque::from([start]);
            while let Some(i) = queue.pop_front() {
                component.push(i);
                let atom = &self.atoms[i];
                for d in Rotation::ALL {
                    if !follow(atom.bond(d)) {
                        continue;
                    }
                    if let Some(j) = self.index_of(atom.position.neighbor(d)) {
                        if !seen[j] {
                            seen[j] = true;
                            queue.push_back(j);
                        }
                    }
                }
            }
            out.push(component);
        }
        out
    }

    pub fn element_counts(&self) -> BTreeMap<Element, usize> {
        let mut counts = BTreeMap::new();
        for atom in &self.atoms {
            *counts.entry(atom.element).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn water_chain() -> Molecule {
        let mut m = Molecule::from_elements(&[
            (Element::Water, HexPos::new(2, 3)),
            (Element::Fire, HexPos::new(3, 3)),
            (Element::Air, HexPos::new(3, 4)),
        ])
        .unwrap();
        m.add_bond(HexPos::new(0, 0), HexPos::new(1, 0), BondKind::Single)
            .unwrap();
        m.add_bond(HexPos::new(1, 0), HexPos::new(1, 1), BondKind::Single)
            .unwrap();
        m
    }

    #[test]
    fn construction_normalizes_origin_and_extents() {
        let m = water_chain();
        assert_eq!(m.atoms()[0].position, HexPos::new(0, 0));
        assert_eq!(m.width(), 2);
        assert_eq!(m.height(), 2);
        assert_eq!(m.diagonal(), 2);
        assert_eq!(m.placement().apply(HexPos::new(3, 4)), HexPos::new(1, 1));
    }

    #[test]
    fn bonds_are_reciprocal() {
        let m = water_chain();
        let origin = m.atom_at(HexPos::new(0, 0)).unwrap();
        let right = m.atom_at(HexPos::new(1, 0)).unwrap();
        assert_eq!(origin.bond(Rotation::new(0)), BondKind::Single);
        assert_eq!(right.bond(Rotation::new(3)), BondKind::Single);
        assert_eq!(m.bonds().len(), 2);
    }

    #[test]
    fn duplicate_and_non_adjacent_are_rejected() {
        let dup = Molecule::from_elements(&[
            (Element::Salt, HexPos::new(0, 0)),
            (Element::Salt, HexPos::new(0, 0)),
        ]);
        assert_eq!(dup.unwrap_err(), MoleculeError::DuplicateAtom(HexPos::ORIGIN));

        let mut m = Molecule::from_elements(&[
            (Element::Salt, HexPos::new(0, 0)),
            (Element::Salt, HexPos::new(2, 0)),
        ])
        .unwrap();
        assert!(matches!(
            m.add_bond(HexPos::new(0, 0), HexPos::new(2, 0), BondKind::Single),
            Err(MoleculeError::NotAdjacent(_, _))
        ));
    }

    #[test]
    fn clockwise_rotation_cycles_extents() {
        let mut m = Molecule::from_elements(&[
            (Element::Salt, HexPos::new(0, 0)),
            (Element::Salt, HexPos::new(1, 0)),
            (Element::Salt, HexPos::new(2, 0)),
        ])
        .unwrap();
        let before = (m.width(), m.height(), m.diagonal());
        m.rotate(Rotation::CLOCKWISE);
        assert_eq!((m.width(), m.height(), m.diagonal()), (before.2, before.0, before.1));
    }

    #[test]
    fn rotation_tracks_placement() {
        let mut m = water_chain();
        m.rotate(Rotation::COUNTERCLOCKWISE);
        let air = m
            .atoms()
            .iter()
            .find(|a| a.element == Element::Air)
            .unwrap();
        assert_eq!(m.placement().apply(HexPos::new(3, 4)), air.position);
    }

    #[test]
    fn row_orders() {
        let m = water_chain();
        let top: Vec<_> = m
            .top_down_order()
            .into_iter()
            .map(|i| m.atoms()[i].element)
            .collect();
        assert_eq!(top, vec![Element::Air, Element::Water, Element::Fire]);
        let bottom: Vec<_> = m
            .bottom_up_order()
            .into_iter()
            .map(|i| m.atoms()[i].element)
            .collect();
        assert_eq!(bottom, vec![Element::Water, Element::Fire, Element::Air]);
    }

    #[test]
    fn components_respect_bond_filter() {
        let mut m = Molecule::from_elements(&[
            (Element::Fire, HexPos::new(0, 0)),
            (Element::Fire, HexPos::new(1, 0)),
            (Element::Salt, HexPos::new(2, 0)),
        ])
        .unwrap();
        m.add_bond(HexPos::new(0, 0), HexPos::new(1, 0), BondKind::Triplex)
            .unwrap();
        m.add_bond(HexPos::new(1, 0), HexPos::new(2, 0), BondKind::Single)
            .unwrap();
        assert!(m.has_triplex());
        assert_eq!(m.components(|k| k.is_bond()).len(), 1);
        assert_eq!(m.components(|k| k == BondKind::Single).len(), 2);
    }

    fn arbitrary_molecule() -> impl Strategy<Value = Molecule> {
        proptest::collection::btree_set((-3i32..3, -3i32..3), 1..8).prop_map(|cells| {
            let mut m = Molecule::from_elements(
                &cells
                    .iter()
                    .map(|&(q, r)| (Element::Salt, HexPos::new(q, r)))
                    .collect::<Vec<_>>(),
            )
            .unwrap();
            let positions: Vec<HexPos> = m.atoms().iter().map(|a| a.position).collect();
            for &a in &positions {
                for &b in &positions {
                    if a < b && a.distance(b) == 1 {
                        m.add_bond(a, b, BondKind::Single).unwrap();
                    }
                }
            }
            m
        })
    }

    fn assert_reciprocal(m: &Molecule) {
        for atom in m.atoms() {
            for d in Rotation::ALL {
                let kind = atom.bond(d);
                if !kind.is_bond() {
                    continue;
                }
                let neighbor = m.atom_at(atom.position.neighbor(d)).unwrap();
                assert_eq!(neighbor.bond(d.opposite()), kind);
            }
        }
    }

    proptest! {
        #[test]
        fn six_rotations_restore_molecule(m in arbitrary_molecule(), ccw in any::<bool>()) {
            let step = if ccw { Rotation::COUNTERCLOCKWISE } else { Rotation::CLOCKWISE };
            let mut rotated = m.clone();
            for _ in 0..6 {
                rotated.rotate(step);
                assert_reciprocal(&rotated);
            }
            prop_assert_eq!(rotated.atoms(), m.atoms());
        }

        #[test]
        fn bonds_stay_reciprocal(m in arbitrary_molecule(), k in 0i32..6) {
            let mut rotated = m.clone();
            rotated.rotate(Rotation::new(k));
            assert_reciprocal(&rotated);
            prop_assert_eq!(rotated.bonds().len(), m.bonds().len());
        }
    }
}
