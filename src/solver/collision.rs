//! Swept-motion collision checks on the hex lattice.
//!
//! A rigid group of atoms moves from a start pose to an end pose: first a
//! straight translation at the start orientation, then a rotation about
//! the end position through every intermediate 60° step. Each atom sweeps
//! the hex line of the translation and the ring cells at its own radius
//! during the rotation.

use std::collections::HashSet;

use crate::model::hex::{HexPos, Pose, RotationSense, hex_line, ring_step};

/// Registry of lattice cells occupied by stationary atoms and arm bases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridState {
    occupied: HashSet<HexPos>,
}

impl GridState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn occupy(&mut self, cell: HexPos) -> bool {
        self.occupied.insert(cell)
    }

    pub fn release(&mut self, cell: HexPos) -> bool {
        self.occupied.remove(&cell)
    }

    pub fn is_occupied(&self, cell: HexPos) -> bool {
        self.occupied.contains(&cell)
    }

    pub fn len(&self) -> usize {
        self.occupied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    /// Moves a set of occupied cells by `delta`.
    pub fn translate(&mut self, cells: &[HexPos], delta: HexPos) {
        for cell in cells {
            self.occupied.remove(cell);
        }
        for cell in cells {
            self.occupied.insert(*cell + delta);
        }
    }

    /// Every cell the moving `atoms` pass through, start footprint excluded.
    ///
    /// `atoms` are offsets in the moving frame; a pose maps them onto the
    /// lattice.
    pub fn swept_cells(
        atoms: &[HexPos],
        start: Pose,
        end: Pose,
        sense: RotationSense,
    ) -> HashSet<HexPos> {
        let footprint: HashSet<HexPos> = atoms.iter().map(|a| start.apply(*a)).collect();
        let turns = sense.steps_between(start.rotation, end.rotation);
        let mut swept = HashSet::new();
        for &atom in atoms {
            let from = start.apply(atom);
            let moved = Pose::new(end.position, start.rotation).apply(atom);
            swept.extend(hex_line(from, moved));

            let mut offset = moved - end.position;
            swept.insert(moved);
            for _ in 0..turns {
                // One 60° step walks the ring once per unit of radius.
                for _ in 0..offset.length() {
                    offset = ring_step(offset, sense);
                    swept.insert(end.position + offset);
                }
            }
        }
        swept.retain(|c| !footprint.contains(c));
        swept
    }

    /// Whether moving `atoms` from `start` to `end` in `sense` would pass
    /// through an occupied cell outside their own starting footprint.
    pub fn will_atoms_collide(
        &self,
        atoms: &[HexPos],
        start: Pose,
        end: Pose,
        sense: RotationSense,
    ) -> bool {
        Self::swept_cells(atoms, start, end, sense)
            .into_iter()
            .any(|c| self.is_occupied(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::hex::Rotation;

    fn diagonal_cluster() -> Vec<HexPos> {
        (-4..=4).map(|k| HexPos::new(0, k)).collect()
    }

    fn cells(list: &[(i32, i32)]) -> HashSet<HexPos> {
        list.iter().map(|&(q, r)| HexPos::new(q, r)).collect()
    }

    /// The column `(0, -4..=4)` turned one step clockwise about the origin
    /// lands on row zero, sweeping each ring between the two.
    const CLOCKWISE_SWEEP: [(i32, i32); 20] = [
        (1, 0),
        (1, 1),
        (2, 0),
        (1, 2),
        (2, 1),
        (3, 0),
        (1, 3),
        (2, 2),
        (3, 1),
        (4, 0),
        (-1, 0),
        (-1, -1),
        (-2, 0),
        (-1, -2),
        (-2, -1),
        (-3, 0),
        (-1, -3),
        (-2, -2),
        (-3, -1),
        (-4, 0),
    ];

    /// The same column turned counterclockwise lands on the `q = -r`
    /// diagonal.
    const COUNTERCLOCKWISE_SWEEP: [(i32, i32); 20] = [
        (-1, 1),
        (-1, 2),
        (-2, 2),
        (-1, 3),
        (-2, 3),
        (-3, 3),
        (-1, 4),
        (-2, 4),
        (-3, 4),
        (-4, 4),
        (1, -1),
        (1, -2),
        (2, -2),
        (1, -3),
        (2, -3),
        (3, -3),
        (1, -4),
        (2, -4),
        (3, -4),
        (4, -4),
    ];

    fn check_table(sense: RotationSense, table: &[(i32, i32)]) {
        let cluster = diagonal_cluster();
        let end = Pose::new(HexPos::ORIGIN, sense.step());
        let expected = cells(table);
        assert_eq!(
            GridState::swept_cells(&cluster, Pose::IDENTITY, end, sense),
            expected
        );
        for q in -6..=6 {
            for r in -6..=6 {
                let cell = HexPos::new(q, r);
                let mut grid = GridState::new();
                grid.occupy(cell);
                let hit = grid.will_atoms_collide(&cluster, Pose::IDENTITY, end, sense);
                assert_eq!(
                    hit,
                    expected.contains(&cell),
                    "{:?} sweep misclassified {}",
                    sense,
                    cell
                );
            }
        }
    }

    #[test]
    fn clockwise_sweep_table() {
        check_table(RotationSense::Clockwise, &CLOCKWISE_SWEEP);
    }

    #[test]
    fn counterclockwise_sweep_table() {
        check_table(RotationSense::Counterclockwise, &COUNTERCLOCKWISE_SWEEP);
    }

    #[test]
    fn move_then_turn() {
        // A pair slides two rows up, then swings its right atom to the top.
        let pair = [HexPos::ORIGIN, HexPos::new(1, 0)];
        let end = Pose::new(HexPos::new(0, 2), Rotation::COUNTERCLOCKWISE);
        let swept = GridState::swept_cells(&pair, Pose::IDENTITY, end, RotationSense::Counterclockwise);
        assert_eq!(swept, cells(&[(0, 1), (0, 2), (1, 1), (1, 2), (0, 3)]));

        let mut grid = GridState::new();
        grid.occupy(HexPos::new(1, 3));
        grid.occupy(HexPos::new(-1, 3));
        assert!(!grid.will_atoms_collide(&pair, Pose::IDENTITY, end, RotationSense::Counterclockwise));
        grid.occupy(HexPos::new(0, 3));
        assert!(grid.will_atoms_collide(&pair, Pose::IDENTITY, end, RotationSense::Counterclockwise));
    }

    #[test]
    fn reference_cells() {
        let cluster = diagonal_cluster();
        let end = Pose::new(HexPos::ORIGIN, Rotation::CLOCKWISE);
        let hits = |cell: HexPos| {
            let mut grid = GridState::new();
            grid.occupy(cell);
            grid.will_atoms_collide(&cluster, Pose::IDENTITY, end, RotationSense::Clockwise)
        };
        assert!(hits(HexPos::new(2, 1)));
        assert!(!hits(HexPos::new(1, -3)));
        assert!(!hits(HexPos::new(-3, 1)));
        assert!(hits(HexPos::new(-1, -1)));
    }

    #[test]
    fn results_are_deterministic() {
        let cluster = diagonal_cluster();
        let mut grid = GridState::new();
        grid.occupy(HexPos::new(2, 1));
        grid.occupy(HexPos::new(-5, 5));
        let end = Pose::new(HexPos::ORIGIN, Rotation::CLOCKWISE);
        let first = grid.will_atoms_collide(&cluster, Pose::IDENTITY, end, RotationSense::Clockwise);
        for _ in 0..5 {
            assert_eq!(
                grid.will_atoms_collide(&cluster, Pose::IDENTITY, end, RotationSense::Clockwise),
                first
            );
        }
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn translation_sweeps_the_line() {
        let mut grid = GridState::new();
        grid.occupy(HexPos::new(2, 0));
        let start = Pose::IDENTITY;
        let end = Pose::at(HexPos::new(3, 0));
        assert!(grid.will_atoms_collide(&[HexPos::ORIGIN], start, end, RotationSense::Clockwise));
        assert!(!grid.will_atoms_collide(
            &[HexPos::new(0, 1)],
            start,
            end,
            RotationSense::Clockwise
        ));
    }

    #[test]
    fn translate_moves_occupancy() {
        let mut grid = GridState::new();
        grid.occupy(HexPos::new(1, 1));
        grid.occupy(HexPos::new(2, 1));
        grid.translate(&[HexPos::new(1, 1), HexPos::new(2, 1)], HexPos::new(0, 1));
        assert!(grid.is_occupied(HexPos::new(1, 2)));
        assert!(grid.is_occupied(HexPos::new(2, 2)));
        assert!(!grid.is_occupied(HexPos::new(1, 1)));
    }
}
