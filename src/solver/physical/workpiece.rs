//! A molecule in the middle of being built or taken apart.
//!
//! The workpiece tracks where each atom of a target molecule currently
//! sits and which of its bonds currently exist, so assembly and
//! disassembly plans can be simulated before any instruction is written.

use std::collections::{BTreeSet, VecDeque};

use crate::model::hex::{HexPos, Pose, RotationSense};
use crate::model::molecule::Molecule;
use crate::model::types::{BondKind, Element};
use crate::solver::collision::GridState;

#[derive(Debug, Clone)]
pub struct Workpiece<'m> {
    molecule: &'m Molecule,
    cells: Vec<Option<HexPos>>,
    bonds: BTreeSet<(usize, usize)>,
    grid: GridState,
}

fn key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

impl<'m> Workpiece<'m> {
    /// A workpiece with no atoms placed yet.
    pub fn empty(molecule: &'m Molecule) -> Self {
        Self {
            molecule,
            cells: vec![None; molecule.atom_count()],
            bonds: BTreeSet::new(),
            grid: GridState::new(),
        }
    }

    /// The whole molecule, intact, with its origin on `offset`.
    pub fn assembled(molecule: &'m Molecule, offset: HexPos) -> Self {
        let mut workpiece = Self::empty(molecule);
        for (i, atom) in molecule.atoms().iter().enumerate() {
            workpiece.place(i, offset + atom.position);
        }
        for (a, b, _) in molecule.bonds() {
            if let (Some(ia), Some(ib)) = (molecule.index_of(a), molecule.index_of(b)) {
                workpiece.bonds.insert(key(ia, ib));
            }
        }
        workpiece
    }

    pub fn molecule(&self) -> &'m Molecule {
        self.molecule
    }

    pub fn element(&self, atom: usize) -> Element {
        self.molecule.atoms()[atom].element
    }

    pub fn place(&mut self, atom: usize, cell: HexPos) {
        if let Some(slot) = self.cells.get_mut(atom) {
            if let Some(old) = slot.replace(cell) {
                self.grid.release(old);
            }
            self.grid.occupy(cell);
        }
    }

    /// Removes an atom along with every bond it had.
    pub fn take(&mut self, atom: usize) -> Option<HexPos> {
        let cell = self.cells.get_mut(atom)?.take()?;
        self.grid.release(cell);
        self.bonds.retain(|&(a, b)| a != atom && b != atom);
        Some(cell)
    }

    pub fn cell(&self, atom: usize) -> Option<HexPos> {
        self.cells.get(atom).copied().flatten()
    }

    pub fn atom_at(&self, cell: HexPos) -> Option<usize> {
        self.cells.iter().position(|c| *c == Some(cell))
    }

    pub fn present(&self) -> impl Iterator<Item = (usize, HexPos)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|c| (i, c)))
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    /// Bond the molecule has between two placed atoms, provided they sit
    /// in the same relative position as in the molecule.
    pub fn desired(&self, a: usize, b: usize) -> BondKind {
        let (Some(ca), Some(cb)) = (self.cell(a), self.cell(b)) else {
            return BondKind::None;
        };
        let atoms = self.molecule.atoms();
        let (pa, pb) = (atoms[a].position, atoms[b].position);
        if cb - ca != pb - pa {
            return BondKind::None;
        }
        pa.direction_to(pb)
            .map(|d| atoms[a].bond(d))
            .unwrap_or_default()
    }

    pub fn is_bonded(&self, a: usize, b: usize) -> bool {
        self.bonds.contains(&key(a, b))
    }

    /// Forms a bond, returning whether it is new.
    pub fn bond(&mut self, a: usize, b: usize) -> bool {
        self.bonds.insert(key(a, b))
    }

    pub fn unbond(&mut self, a: usize, b: usize) -> bool {
        self.bonds.remove(&key(a, b))
    }

    /// Number of bonds currently formed.
    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    /// Pairs of placed atoms on neighboring cells, lower cell first.
    pub fn adjacent_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (a, ca) in self.present() {
            for (b, cb) in self.present() {
                if ca < cb && ca.distance(cb) == 1 {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }

    /// Groups of placed atoms held together by formed bonds.
    ///
    /// Groups are ordered by their lowest atom index and list atoms in
    /// breadth-first order.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut seen = vec![false; self.cells.len()];
        let mut out = Vec::new();
        for (start, _) in self.present() {
            if seen[start] {
                continue;
            }
            seen[start] = true;
            let mut component = Vec::new();
            let mut queue = VecDeque::from([start]);
            while let Some(i) = queue.pop_front() {
                component.push(i);
                for &(a, b) in &self.bonds {
                    let other = if a == i {
                        b
                    } else if b == i {
                        a
                    } else {
                        continue;
                    };
                    if !seen[other] && self.cell(other).is_some() {
                        seen[other] = true;
                        queue.push_back(other);
                    }
                }
            }
            out.push(component);
        }
        out
    }

    pub fn shift(&mut self, atoms: &[usize], delta: HexPos) {
        let cells: Vec<HexPos> = atoms.iter().filter_map(|&a| self.cell(a)).collect();
        self.grid.translate(&cells, delta);
        for &atom in atoms {
            if let Some(Some(cell)) = self.cells.get_mut(atom) {
                *cell += delta;
            }
        }
    }

    /// Index of the first group in `groups` that can move by `delta`
    /// without sweeping through another placed atom.
    ///
    /// With `check` off the first group is always chosen.
    pub fn next_clear_move(&self, groups: &[Vec<usize>], delta: HexPos, check: bool) -> Option<usize> {
        if groups.is_empty() {
            return None;
        }
        if !check {
            return Some(0);
        }
        groups.iter().position(|group| {
            let cells: Vec<HexPos> = group.iter().filter_map(|&a| self.cell(a)).collect();
            !self.grid.will_atoms_collide(
                &cells,
                Pose::IDENTITY,
                Pose::at(delta),
                RotationSense::Clockwise,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bent() -> Molecule {
        let mut m = Molecule::from_elements(&[
            (Element::Fire, HexPos::new(0, 0)),
            (Element::Water, HexPos::new(1, 0)),
            (Element::Air, HexPos::new(0, 1)),
        ])
        .unwrap();
        m.add_bond(HexPos::new(0, 0), HexPos::new(1, 0), BondKind::Single)
            .unwrap();
        m.add_bond(HexPos::new(0, 0), HexPos::new(0, 1), BondKind::Single)
            .unwrap();
        m
    }

    #[test]
    fn assembled_workpiece_is_one_component() {
        let m = bent();
        let wp = Workpiece::assembled(&m, HexPos::new(1, 2));
        assert_eq!(wp.components().len(), 1);
        assert_eq!(wp.bond_count(), 2);
        assert_eq!(wp.atom_at(HexPos::new(1, 3)), m.index_of(HexPos::new(0, 1)));
    }

    #[test]
    fn desired_bond_needs_matching_offset() {
        let m = bent();
        let fire = m.index_of(HexPos::new(0, 0)).unwrap();
        let water = m.index_of(HexPos::new(1, 0)).unwrap();
        let mut wp = Workpiece::empty(&m);
        wp.place(fire, HexPos::new(1, 1));
        wp.place(water, HexPos::new(2, 1));
        assert_eq!(wp.desired(fire, water), BondKind::Single);
        wp.shift(&[water], HexPos::new(0, 1));
        assert_eq!(wp.desired(fire, water), BondKind::None);
    }

    #[test]
    fn take_drops_bonds_and_splits_components() {
        let m = bent();
        let mut wp = Workpiece::assembled(&m, HexPos::ORIGIN);
        let fire = m.index_of(HexPos::new(0, 0)).unwrap();
        assert_eq!(wp.take(fire), Some(HexPos::ORIGIN));
        assert_eq!(wp.bond_count(), 0);
        assert_eq!(wp.components().len(), 2);
        assert_eq!(wp.adjacent_pairs().len(), 1);
    }

    #[test]
    fn blocked_groups_wait_their_turn() {
        let column = Molecule::from_elements(&[
            (Element::Salt, HexPos::new(0, 0)),
            (Element::Salt, HexPos::new(0, 1)),
        ])
        .unwrap();
        let lower = column.index_of(HexPos::new(0, 0)).unwrap();
        let upper = column.index_of(HexPos::new(0, 1)).unwrap();
        let wp = Workpiece::assembled(&column, HexPos::new(1, 1));
        let up = HexPos::new(0, 1);
        let groups = vec![vec![lower], vec![upper]];
        assert_eq!(wp.next_clear_move(&groups, up, true), Some(1));
        assert_eq!(wp.next_clear_move(&groups, up, false), Some(0));
        assert_eq!(wp.next_clear_move(&[vec![lower]], up, true), None);
    }
}
