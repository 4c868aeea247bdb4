use crate::io::{Format, error::Error};
use crate::model::hex::HexPos;
use crate::model::molecule::{Atom, Molecule};
use crate::model::puzzle::Puzzle;
use crate::model::types::{BondKind, Element, GlyphKind, MechanismKind};
use serde::Deserialize;
use std::io::Read;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PuzzleFile {
    name: String,
    allowed_mechanisms: Option<Vec<String>>,
    allowed_glyphs: Option<Vec<String>>,
    #[serde(default)]
    reagents: Vec<MoleculeTable>,
    #[serde(default)]
    products: Vec<MoleculeTable>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MoleculeTable {
    #[serde(default)]
    atoms: Vec<AtomEntry>,
    #[serde(default)]
    bonds: Vec<BondEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AtomEntry {
    element: String,
    q: i32,
    r: i32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BondEntry {
    from: [i32; 2],
    to: [i32; 2],
    #[serde(default = "default_bond_kind")]
    kind: String,
}

fn default_bond_kind() -> String {
    "single".to_string()
}

/// Reads a puzzle description from TOML.
pub fn read_puzzle<R: Read>(mut reader: R) -> Result<Puzzle, Error> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse_puzzle(&text)
}

pub fn parse_puzzle(text: &str) -> Result<Puzzle, Error> {
    let file: PuzzleFile = toml::from_str(text)?;

    let reagents = file
        .reagents
        .iter()
        .enumerate()
        .map(|(i, table)| build_molecule(table, &format!("reagents[{}]", i)))
        .collect::<Result<Vec<_>, _>>()?;
    let products = file
        .products
        .iter()
        .enumerate()
        .map(|(i, table)| build_molecule(table, &format!("products[{}]", i)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut puzzle = Puzzle::new(file.name, reagents, products);
    if let Some(names) = file.allowed_mechanisms {
        puzzle.allowed_mechanisms = names
            .iter()
            .map(|n| MechanismKind::from_str(n))
            .collect::<Result<_, _>>()?;
    }
    if let Some(names) = file.allowed_glyphs {
        puzzle.allowed_glyphs = names
            .iter()
            .map(|n| GlyphKind::from_str(n))
            .collect::<Result<_, _>>()?;
    }
    Ok(puzzle)
}

fn build_molecule(table: &MoleculeTable, location: &str) -> Result<Molecule, Error> {
    let atoms = table
        .atoms
        .iter()
        .map(|a| {
            let element = Element::from_str(&a.element).map_err(|e| {
                Error::parse(Format::Puzzle, format!("{}.atoms", location), e.to_string())
            })?;
            Ok(Atom::new(element, HexPos::new(a.q, a.r)))
        })
        .collect::<Result<Vec<_>, Error>>()?;
    let mut molecule = Molecule::new(atoms).map_err(|e| Error::molecule(location, e))?;

    for (j, bond) in table.bonds.iter().enumerate() {
        let bond_location = format!("{}.bonds[{}]", location, j);
        let kind = BondKind::from_str(&bond.kind)
            .map_err(|e| Error::parse(Format::Puzzle, bond_location.as_str(), e.to_string()))?;
        let from = HexPos::new(bond.from[0], bond.from[1]);
        let to = HexPos::new(bond.to[0], bond.to[1]);
        molecule
            .add_bond_original(from, to, kind)
            .map_err(|e| Error::molecule(bond_location, e))?;
    }
    Ok(molecule)
}
