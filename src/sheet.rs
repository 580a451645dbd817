use serde::Serialize;

use crate::types::{PieceInstance, PlacedPiece};

/// An axis-aligned rectangle of a sheet not yet occupied by any piece.
/// `width` is the X extent, `height` the Y extent, in sheet-local
/// coordinates.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FreeRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FreeRegion {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// A sheet instantiated during planning, in its chosen orientation.
///
/// Invariant: `free_regions` are pairwise disjoint and, together with the
/// kerf-inflated footprints of `pieces`, exactly tile the sheet rectangle.
/// The region list is an ordered sequence; scoring ties resolve by position
/// in it, so insertion order is part of the algorithm.
#[derive(Debug, Clone, Serialize)]
pub struct OpenSheet {
    pub id: u32,
    pub name: String,
    pub length: f64,
    pub width: f64,
    pub pieces: Vec<PlacedPiece>,
    pub free_regions: Vec<FreeRegion>,
}

#[derive(Debug, Clone, Copy)]
pub struct BestFit {
    pub region_idx: usize,
    pub rotated: bool,
    pub waste: f64,
}

impl OpenSheet {
    pub fn new(id: u32, name: String, length: f64, width: f64) -> Self {
        Self {
            id,
            name,
            length,
            width,
            pieces: Vec::new(),
            free_regions: vec![FreeRegion {
                x: 0.0,
                y: 0.0,
                width: length,
                height: width,
            }],
        }
    }

    pub fn area(&self) -> f64 {
        self.length * self.width
    }

    /// Net area handed to the customer; kerf loss counts as waste.
    pub fn used_area(&self) -> f64 {
        self.pieces.iter().map(|p| p.net_area()).sum()
    }

    pub fn efficiency(&self) -> f64 {
        self.used_area() / self.area() * 100.0
    }

    /// Best-area-fit search over the ordered free-region list. Ties keep the
    /// earliest candidate; within one region the unrotated orientation is
    /// scored first.
    pub fn find_best(&self, piece: &PieceInstance) -> Option<BestFit> {
        let mut best: Option<BestFit> = None;

        for (idx, region) in self.free_regions.iter().enumerate() {
            if piece.eff_length <= region.width && piece.eff_width <= region.height {
                let waste = region.area() - piece.eff_area();
                if best.is_none() || waste < best.unwrap().waste {
                    best = Some(BestFit {
                        region_idx: idx,
                        rotated: false,
                        waste,
                    });
                }
            }
            if piece.eff_width <= region.width && piece.eff_length <= region.height {
                let waste = region.area() - piece.eff_area();
                if best.is_none() || waste < best.unwrap().waste {
                    best = Some(BestFit {
                        region_idx: idx,
                        rotated: true,
                        waste,
                    });
                }
            }
        }

        best
    }

    /// Places `piece` into the best-fitting region, if any.
    pub fn try_place(&mut self, piece: &PieceInstance) -> bool {
        match self.find_best(piece) {
            Some(fit) => {
                self.place(piece, fit);
                true
            }
            None => false,
        }
    }

    fn place(&mut self, piece: &PieceInstance, fit: BestFit) {
        // Vec::remove, not swap_remove: later regions keep their rank.
        let region = self.free_regions.remove(fit.region_idx);

        let (placed_length, placed_width, eff_x, eff_y) = if fit.rotated {
            (piece.width, piece.length, piece.eff_width, piece.eff_length)
        } else {
            (piece.length, piece.width, piece.eff_length, piece.eff_width)
        };

        self.pieces.push(PlacedPiece {
            unique_id: piece.unique_id.clone(),
            demand_id: piece.demand_id.clone(),
            name: piece.name.clone(),
            x: region.x,
            y: region.y,
            placed_length,
            placed_width,
            original_length: piece.length,
            original_width: piece.width,
            rotated: fit.rotated,
        });

        self.split(region, eff_x, eff_y);
    }

    /// Guillotine split of the L-shaped leftover: form both straight-cut
    /// pairs, keep the pair whose larger rectangle has the greater area.
    fn split(&mut self, region: FreeRegion, pw: f64, ph: f64) {
        let FreeRegion {
            x,
            y,
            width: w,
            height: h,
        } = region;

        // Right remainder spans full height, bottom sits under the piece.
        let pair_a = [
            FreeRegion {
                x: x + pw,
                y,
                width: w - pw,
                height: h,
            },
            FreeRegion {
                x,
                y: y + ph,
                width: pw,
                height: h - ph,
            },
        ];
        // Bottom remainder spans full width, right sits beside the piece.
        let pair_b = [
            FreeRegion {
                x: x + pw,
                y,
                width: w - pw,
                height: ph,
            },
            FreeRegion {
                x,
                y: y + ph,
                width: w,
                height: h - ph,
            },
        ];

        let larger = |pair: &[FreeRegion; 2]| pair[0].area().max(pair[1].area());
        let chosen = if larger(&pair_a) >= larger(&pair_b) {
            pair_a
        } else {
            pair_b
        };

        for r in chosen {
            if r.width > 0.0 && r.height > 0.0 {
                self.free_regions.push(r);
            }
        }
    }
}
