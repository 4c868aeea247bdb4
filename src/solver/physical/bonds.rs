//! Bond Programmer: decides where bonding glyphs go.
//!
//! Assembly is simulated first. Every stable state of the workpiece is
//! recorded as a snapshot of which atom pairs sit on which lattice edges
//! and whether the product wants a bond between them. A bonder can only be
//! placed on an edge when no snapshot puts an unwanted pair there, because
//! a glyph bonds whatever it finds.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use super::workpiece::Workpiece;
use crate::model::hex::{HexPos, Rotation};
use crate::model::types::{BondKind, Element};
use crate::solver::error::Error;

/// A lattice edge, lower cell first.
pub type Edge = (HexPos, HexPos);

pub fn edge(a: HexPos, b: HexPos) -> Edge {
    (a.min(b), a.max(b))
}

/// Whether `e` joins row one to itself or to row two, right of the
/// station's input column.
pub fn in_band(e: Edge) -> bool {
    let (a, b) = e;
    let rows = (a.r.min(b.r), a.r.max(b.r));
    a.q >= 1 && b.q >= 1 && a.distance(b) == 1 && (rows == (1, 1) || rows == (1, 2))
}

/// Band edges of a station `width` columns wide.
pub fn band_edges(width: i32) -> BTreeSet<Edge> {
    let mut band = BTreeSet::new();
    for x in 1..=width {
        let cell = HexPos::new(x, 1);
        if x < width {
            band.insert(edge(cell, HexPos::new(x + 1, 1)));
        }
        band.insert(edge(cell, HexPos::new(x, 2)));
        if x > 1 {
            band.insert(edge(cell, HexPos::new(x - 1, 2)));
        }
    }
    band
}

#[derive(Debug, Clone, Copy, Default)]
struct Votes {
    single: bool,
    triplex: bool,
    refused: bool,
    /// Two fire atoms met here without wanting a triplex bond.
    fire_conflict: bool,
}

/// Glyphs the programmer settled on, in station coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BondLayout {
    /// Bonder poses; each covers its cell and the neighbor in its direction.
    pub bonders: Vec<(HexPos, Rotation)>,
    /// Triplex bonder poses.
    pub triplex: Vec<(HexPos, Rotation)>,
}

#[derive(Debug, Clone, Default)]
pub struct BondProgrammer {
    votes: BTreeMap<Edge, Votes>,
    snapshots: usize,
}

impl BondProgrammer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one stable state and forms the wanted bonds lying on band
    /// edges.
    ///
    /// Returns the edges on which a bond formed in this state.
    pub fn record(&mut self, workpiece: &mut Workpiece<'_>) -> Vec<Edge> {
        self.snapshots += 1;
        let mut fired = Vec::new();
        for (a, b) in workpiece.adjacent_pairs() {
            let (Some(ca), Some(cb)) = (workpiece.cell(a), workpiece.cell(b)) else {
                continue;
            };
            let wanted = workpiece.desired(a, b);
            let both_fire =
                workpiece.element(a) == Element::Fire && workpiece.element(b) == Element::Fire;
            let e = edge(ca, cb);
            let votes = self.votes.entry(e).or_default();
            match wanted {
                BondKind::Triplex => votes.triplex = true,
                BondKind::Single => {
                    votes.single = true;
                    votes.fire_conflict |= both_fire;
                }
                BondKind::None => {
                    votes.refused = true;
                    votes.fire_conflict |= both_fire;
                }
            }
            if wanted.is_bond() && in_band(e) && workpiece.bond(a, b) {
                fired.push(e);
            }
        }
        fired
    }

    /// Fails on the first band edge the snapshots disagree about.
    ///
    /// # Errors
    ///
    /// Returns an [`Error::Assembly`] naming `label` when a band edge is
    /// wanted by one snapshot and refused by another, or wanted as both
    /// bond kinds.
    pub fn check(&self, label: &str) -> Result<(), Error> {
        for (e, votes) in self.votes.iter().filter(|(e, _)| in_band(**e)) {
            if votes.single && votes.triplex {
                return Err(Error::assembly(
                    label,
                    format!("edge {}-{} needs both a single and a triplex bond", e.0, e.1),
                ));
            }
            if (votes.single || votes.triplex) && votes.refused {
                return Err(Error::assembly(
                    label,
                    format!("edge {}-{} would bond an unrelated atom pair", e.0, e.1),
                ));
            }
        }
        Ok(())
    }

    /// Turns the recorded votes into a glyph layout for a station `width`
    /// columns wide.
    ///
    /// # Errors
    ///
    /// Fails as [`check`](Self::check) does, or when no triplex bonder
    /// placement inside the station leaves unwanted fire pairs alone.
    pub fn finish(self, width: i32, label: &str) -> Result<BondLayout, Error> {
        self.check(label)?;
        let mut layout = BondLayout::default();
        let mut triangles: BTreeSet<(HexPos, Rotation)> = BTreeSet::new();
        for (e, votes) in self.votes.iter().filter(|(e, _)| in_band(**e)) {
            if votes.single {
                let direction = e.0.direction_to(e.1).unwrap_or_default();
                layout.bonders.push((e.0, direction));
            } else if votes.triplex {
                let pose = self.triangle_for(*e, width).ok_or_else(|| {
                    Error::assembly(
                        label,
                        format!("no triplex bonder fits edge {}-{}", e.0, e.1),
                    )
                })?;
                triangles.insert(pose);
            }
        }
        layout.triplex = triangles.into_iter().collect();
        debug!(
            "{}: {} bonder(s), {} triplex bonder(s) from {} snapshot(s)",
            label,
            layout.bonders.len(),
            layout.triplex.len(),
            self.snapshots
        );
        Ok(layout)
    }

    fn triangle_for(&self, e: Edge, width: i32) -> Option<(HexPos, Rotation)> {
        let (a, b) = e;
        Rotation::ALL
            .into_iter()
            .map(|d| a.neighbor(d))
            .filter(|c| c.distance(b) == 1 && (1..=2).contains(&c.r) && (1..=width).contains(&c.q))
            .find(|&c| {
                [edge(a, c), edge(b, c)]
                    .iter()
                    .all(|side| self.votes.get(side).is_none_or(|v| !v.fire_conflict))
            })
            .and_then(|c| triangle_pose([a, b, c]))
    }
}

/// Pose of the three-cell glyph covering exactly `cells`.
pub fn triangle_pose(cells: [HexPos; 3]) -> Option<(HexPos, Rotation)> {
    let wanted: BTreeSet<HexPos> = cells.into_iter().collect();
    for corner in cells {
        for rotation in Rotation::ALL {
            let covered: BTreeSet<HexPos> = [
                corner,
                corner + rotation.unit(),
                corner + (rotation + Rotation::COUNTERCLOCKWISE).unit(),
            ]
            .into_iter()
            .collect();
            if covered == wanted {
                return Some((corner, rotation));
            }
        }
    }
    None
}
