use log::debug;

use super::error::Error;
use crate::model::hex::Rotation;
use crate::model::molecule::Molecule;
use crate::model::puzzle::Puzzle;
use crate::model::types::{BondKind, Element};

/// Rejects puzzles the solver cannot build at all.
pub fn check_preconditions(puzzle: &Puzzle) -> Result<(), Error> {
    if puzzle.products.is_empty() {
        return Err(Error::Precondition("puzzle has no products".into()));
    }
    if puzzle.reagents.is_empty() {
        return Err(Error::Precondition("puzzle has no reagents".into()));
    }
    for (i, product) in puzzle.products.iter().enumerate() {
        if product.atom_count() == 0 {
            return Err(Error::Precondition(format!("product {} is empty", i)));
        }
        for atom in product.atoms() {
            if atom.bonds.contains(&BondKind::Triplex) && atom.element != Element::Fire {
                return Err(Error::Precondition(format!(
                    "product {} has a triplex bond on {} at {}",
                    i, atom.element, atom.position
                )));
            }
        }
    }
    for (i, reagent) in puzzle.reagents.iter().enumerate() {
        if reagent.atom_count() == 0 {
            return Err(Error::Precondition(format!("reagent {} is empty", i)));
        }
        if reagent.has_repeats() {
            return Err(Error::Precondition(format!(
                "reagent {} contains a repeat placeholder",
                i
            )));
        }
    }
    Ok(())
}

/// Turns the molecule clockwise until its height is its smallest extent.
///
/// Molecules carrying repeat placeholders keep their orientation.
pub fn normalize_rotation(molecule: &mut Molecule) {
    if molecule.has_repeats() {
        return;
    }
    for _ in 0..2 {
        if molecule.height() <= molecule.width() && molecule.height() <= molecule.diagonal() {
            return;
        }
        molecule.rotate(Rotation::CLOCKWISE);
    }
}

/// Replaces each repeat placeholder with the element of the left-most atom
/// in its row.
pub fn resolve_repeats(molecule: &mut Molecule) -> Result<(), Error> {
    for row in molecule.rows().into_values() {
        let Some(source) = row
            .iter()
            .map(|&i| molecule.atoms()[i].element)
            .find(|e| *e != Element::Repeat)
        else {
            if row.is_empty() {
                continue;
            }
            return Err(Error::Precondition(
                "a product row consists only of repeat placeholders".into(),
            ));
        };
        for i in row {
            if molecule.atoms()[i].element == Element::Repeat {
                molecule.set_element(i, source);
            }
        }
    }
    Ok(())
}

/// Returns the puzzle with every molecule normalized, plus a flag per
/// product recording whether it repeated before resolution.
pub fn normalize_puzzle(puzzle: &Puzzle) -> Result<(Puzzle, Vec<bool>), Error> {
    let mut out = puzzle.clone();
    let repeating: Vec<bool> = out.products.iter().map(Molecule::has_repeats).collect();
    for molecule in out.reagents.iter_mut().chain(out.products.iter_mut()) {
        normalize_rotation(molecule);
        resolve_repeats(molecule)?;
    }
    debug!(
        "normalized {} reagent(s) and {} product(s); repeating products: {:?}",
        out.reagents.len(),
        out.products.len(),
        repeating
    );
    Ok((out, repeating))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::hex::HexPos;

    #[test]
    fn repeat_row_resolves_to_leftmost_real_atom() {
        let mut m = Molecule::from_elements(&[
            (Element::Repeat, HexPos::new(0, 0)),
            (Element::Repeat, HexPos::new(1, 0)),
            (Element::Water, HexPos::new(2, 0)),
        ])
        .unwrap();
        resolve_repeats(&mut m).unwrap();
        assert!(m.atoms().iter().all(|a| a.element == Element::Water));
    }

    #[test]
    fn repeats_use_their_own_row() {
        let mut m = Molecule::from_elements(&[
            (Element::Salt, HexPos::new(0, 0)),
            (Element::Repeat, HexPos::new(1, 0)),
            (Element::Fire, HexPos::new(0, 1)),
            (Element::Repeat, HexPos::new(1, 1)),
        ])
        .unwrap();
        resolve_repeats(&mut m).unwrap();
        assert_eq!(m.atom_at(HexPos::new(1, 0)).unwrap().element, Element::Salt);
        assert_eq!(m.atom_at(HexPos::new(1, 1)).unwrap().element, Element::Fire);
    }

    #[test]
    fn vertical_line_is_laid_flat() {
        let mut m = Molecule::from_elements(&[
            (Element::Air, HexPos::new(0, 0)),
            (Element::Air, HexPos::new(0, 1)),
            (Element::Air, HexPos::new(0, 2)),
        ])
        .unwrap();
        normalize_rotation(&mut m);
        assert_eq!(m.height(), 1);
        assert_eq!(m.width(), 3);
    }

    #[test]
    fn repeating_molecules_keep_orientation() {
        let mut m = Molecule::from_elements(&[
            (Element::Repeat, HexPos::new(0, 0)),
            (Element::Air, HexPos::new(0, 1)),
        ])
        .unwrap();
        normalize_rotation(&mut m);
        assert_eq!(m.height(), 2);
    }

    #[test]
    fn triplex_on_non_fire_is_rejected() {
        let mut product = Molecule::from_elements(&[
            (Element::Fire, HexPos::new(0, 0)),
            (Element::Air, HexPos::new(1, 0)),
        ])
        .unwrap();
        product
            .add_bond(HexPos::new(0, 0), HexPos::new(1, 0), BondKind::Triplex)
            .unwrap();
        let reagent = Molecule::from_elements(&[(Element::Fire, HexPos::ORIGIN)]).unwrap();
        let puzzle = Puzzle::new("bad", vec![reagent], vec![product]);
        assert!(matches!(
            check_preconditions(&puzzle),
            Err(Error::Precondition(_))
        ));
    }
}
