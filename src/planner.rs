use serde::Serialize;

use crate::sheet::OpenSheet;
use crate::types::{PieceDemand, PieceInstance, StockSheet};

/// Default blade kerf in mm.
pub const DEFAULT_KERF: f64 = 3.0;

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("piece \"{name}\" (demand {index}): {reason}")]
    InvalidDemand {
        name: String,
        index: usize,
        reason: String,
    },

    #[error("no stock sheet types available")]
    EmptyCatalog,

    #[error("piece \"{name}\" ({length}x{width}) does not fit any available stock sheet")]
    InfeasiblePiece {
        name: String,
        length: f64,
        width: f64,
    },
}

/// The computed layout: every requested unit placed, or nothing at all.
#[derive(Debug, Clone, Serialize)]
pub struct CuttingPlan {
    pub sheets: Vec<OpenSheet>,
}

impl CuttingPlan {
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn piece_count(&self) -> usize {
        self.sheets.iter().map(|s| s.pieces.len()).sum()
    }

    pub fn total_efficiency(&self) -> f64 {
        let total: f64 = self.sheets.iter().map(|s| s.area()).sum();
        if total == 0.0 {
            return 0.0;
        }
        let used: f64 = self.sheets.iter().map(|s| s.used_area()).sum();
        used / total * 100.0
    }
}

pub struct Planner {
    stock: Vec<StockSheet>,
    kerf: f64,
}

impl Planner {
    pub fn new(stock: Vec<StockSheet>, kerf: f64) -> Self {
        Self { stock, kerf }
    }

    /// Packs every demanded unit onto sheets drawn from the catalog.
    ///
    /// Deterministic: identical input always yields the identical plan.
    /// Fails whole, never partially; the first unit that cannot be placed
    /// anywhere aborts the run, since a plan missing pieces is useless to
    /// the workshop.
    pub fn plan(&self, demands: &[PieceDemand]) -> Result<CuttingPlan, PlanError> {
        validate(demands)?;
        if self.stock.is_empty() {
            return Err(PlanError::EmptyCatalog);
        }

        let mut instances = Vec::new();
        for demand in demands {
            for k in 0..demand.qty {
                instances.push(PieceInstance::from_demand(demand, k, self.kerf));
            }
        }
        // Stable sort: equal areas keep explosion order.
        instances.sort_by(|a, b| b.eff_area().total_cmp(&a.eff_area()));

        let mut sheets: Vec<OpenSheet> = Vec::new();
        for piece in &instances {
            // First-fit across sheets already open, best-fit within each.
            if sheets.iter_mut().any(|s| s.try_place(piece)) {
                continue;
            }

            let (template, rotated) =
                self.select_template(piece)
                    .ok_or_else(|| PlanError::InfeasiblePiece {
                        name: piece.name.clone(),
                        length: piece.length,
                        width: piece.width,
                    })?;
            let mut sheet = open_sheet(sheets.len() as u32 + 1, template, rotated);
            let placed = sheet.try_place(piece);
            debug_assert!(placed, "empty sheet rejected a feasible piece");
            sheets.push(sheet);
        }

        Ok(CuttingPlan { sheets })
    }

    /// Picks the smallest-area template/orientation whose empty sheet accepts
    /// the piece. Strict comparison keeps the earliest candidate on ties, so
    /// a template's natural orientation always beats its own rotated variant.
    fn select_template(&self, piece: &PieceInstance) -> Option<(&StockSheet, bool)> {
        let mut best: Option<(&StockSheet, bool, f64)> = None;

        for template in &self.stock {
            for rotated in [false, true] {
                if rotated && template.is_square() {
                    continue;
                }
                let (length, width) = if rotated {
                    (template.width, template.length)
                } else {
                    (template.length, template.width)
                };
                if fits_empty(piece, length, width)
                    && (best.is_none() || template.area() < best.unwrap().2)
                {
                    best = Some((template, rotated, template.area()));
                }
            }
        }

        best.map(|(template, rotated, _)| (template, rotated))
    }
}

fn validate(demands: &[PieceDemand]) -> Result<(), PlanError> {
    for (index, demand) in demands.iter().enumerate() {
        let reason = if !(demand.length > 0.0 && demand.length.is_finite()) {
            Some(format!("length must be positive, got {}", demand.length))
        } else if !(demand.width > 0.0 && demand.width.is_finite()) {
            Some(format!("width must be positive, got {}", demand.width))
        } else if demand.qty < 1 {
            Some("quantity must be at least 1".to_string())
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(PlanError::InvalidDemand {
                name: demand.name.clone(),
                index,
                reason,
            });
        }
    }
    Ok(())
}

/// Whether the piece's kerf-inflated box fits an empty sheet of the given
/// dimensions, in either piece orientation.
fn fits_empty(piece: &PieceInstance, sheet_length: f64, sheet_width: f64) -> bool {
    (piece.eff_length <= sheet_length && piece.eff_width <= sheet_width)
        || (piece.eff_width <= sheet_length && piece.eff_length <= sheet_width)
}

fn open_sheet(id: u32, template: &StockSheet, rotated: bool) -> OpenSheet {
    if rotated {
        OpenSheet::new(
            id,
            format!("{} (Portrait)", template.name),
            template.width,
            template.length,
        )
    } else {
        OpenSheet::new(id, template.name.clone(), template.length, template.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demand(id: &str, length: f64, width: f64, qty: u32) -> PieceDemand {
        PieceDemand {
            id: id.into(),
            name: id.into(),
            length,
            width,
            qty,
        }
    }

    fn standard_catalog() -> Vec<StockSheet> {
        vec![StockSheet::new("MDF 18mm", 2750.0, 1850.0)]
    }

    /// Validates a complete plan:
    /// 1. Every placement stays within its sheet, kerf included
    /// 2. No two kerf-inflated footprints on the same sheet overlap
    /// 3. Each sheet tiles exactly into placements plus free regions
    fn assert_plan_valid(plan: &CuttingPlan, kerf: f64, expected_pieces: usize) {
        assert_eq!(
            plan.piece_count(),
            expected_pieces,
            "expected {} pieces placed, got {}",
            expected_pieces,
            plan.piece_count()
        );

        for sheet in &plan.sheets {
            assert!(!sheet.pieces.is_empty(), "sheet {} opened empty", sheet.id);

            for p in &sheet.pieces {
                assert!(
                    p.x + p.placed_length + kerf <= sheet.length + 1e-6,
                    "sheet {}: piece {} exceeds length",
                    sheet.id,
                    p.unique_id
                );
                assert!(
                    p.y + p.placed_width + kerf <= sheet.width + 1e-6,
                    "sheet {}: piece {} exceeds width",
                    sheet.id,
                    p.unique_id
                );
            }

            for i in 0..sheet.pieces.len() {
                for j in (i + 1)..sheet.pieces.len() {
                    let a = &sheet.pieces[i];
                    let b = &sheet.pieces[j];
                    let overlaps = a.x < b.x + b.placed_length + kerf
                        && b.x < a.x + a.placed_length + kerf
                        && a.y < b.y + b.placed_width + kerf
                        && b.y < a.y + a.placed_width + kerf;
                    assert!(
                        !overlaps,
                        "sheet {}: {} overlaps {}",
                        sheet.id, a.unique_id, b.unique_id
                    );
                }
            }

            let placed: f64 = sheet
                .pieces
                .iter()
                .map(|p| (p.placed_length + kerf) * (p.placed_width + kerf))
                .sum();
            let free: f64 = sheet.free_regions.iter().map(|r| r.area()).sum();
            assert!(
                (placed + free - sheet.area()).abs() < 1e-6,
                "sheet {} does not tile: {placed} + {free} != {}",
                sheet.id,
                sheet.area()
            );
        }
    }

    #[test]
    fn test_single_piece() {
        let planner = Planner::new(standard_catalog(), 3.0);
        let plan = planner.plan(&[demand("p1", 700.0, 400.0, 1)]).unwrap();
        assert_plan_valid(&plan, 3.0, 1);
        assert_eq!(plan.sheet_count(), 1);
        assert_eq!(plan.sheets[0].id, 1);
        assert_eq!(plan.sheets[0].name, "MDF 18mm");
    }

    #[test]
    fn test_conservation_of_quantities() {
        let planner = Planner::new(standard_catalog(), 3.0);
        let demands = vec![
            demand("side", 700.0, 400.0, 2),
            demand("door", 595.0, 397.0, 2),
            demand("shelf", 764.0, 300.0, 3),
            demand("back", 1500.0, 900.0, 1),
        ];
        let plan = planner.plan(&demands).unwrap();
        assert_plan_valid(&plan, 3.0, 8);
    }

    #[test]
    fn test_sheet_reuse_preference() {
        let planner = Planner::new(vec![StockSheet::new("sq", 200.0, 200.0)], 0.0);
        let plan = planner
            .plan(&[demand("a", 100.0, 100.0, 1), demand("b", 50.0, 50.0, 1)])
            .unwrap();
        assert_plan_valid(&plan, 0.0, 2);
        assert_eq!(plan.sheet_count(), 1);
    }

    #[test]
    fn test_infeasible_piece_aborts_whole_run() {
        let planner = Planner::new(standard_catalog(), 0.0);
        let demands = vec![demand("fits", 500.0, 500.0, 2), demand("long", 3000.0, 100.0, 1)];
        let err = planner.plan(&demands).unwrap_err();
        match err {
            PlanError::InfeasiblePiece { name, length, width } => {
                assert_eq!(name, "long");
                assert_eq!(length, 3000.0);
                assert_eq!(width, 100.0);
            }
            other => panic!("expected InfeasiblePiece, got {other:?}"),
        }
    }

    #[test]
    fn test_rotation_correctness() {
        let planner = Planner::new(vec![StockSheet::new("S", 1000.0, 2000.0)], 3.0);
        let plan = planner.plan(&[demand("beam", 1800.0, 500.0, 1)]).unwrap();
        assert_plan_valid(&plan, 3.0, 1);
        let p = &plan.sheets[0].pieces[0];
        assert!(p.rotated);
        assert_eq!(p.placed_length, 500.0);
        assert_eq!(p.placed_width, 1800.0);
        assert_eq!(p.original_length, 1800.0);
        assert_eq!(p.original_width, 500.0);
        // Natural orientation ties the rotated variant on area and wins.
        assert_eq!(plan.sheets[0].name, "S");
        assert_eq!(plan.sheets[0].length, 1000.0);
        assert_eq!(plan.sheets[0].width, 2000.0);
    }

    #[test]
    fn test_smallest_feasible_template_wins() {
        let planner = Planner::new(
            vec![
                StockSheet::new("big", 2750.0, 1850.0),
                StockSheet::new("offcut", 1000.0, 1000.0),
            ],
            0.0,
        );
        let plan = planner.plan(&[demand("p", 800.0, 800.0, 1)]).unwrap();
        assert_eq!(plan.sheet_count(), 1);
        assert_eq!(plan.sheets[0].name, "offcut");
    }

    #[test]
    fn test_template_order_breaks_area_ties() {
        let planner = Planner::new(
            vec![
                StockSheet::new("first", 2000.0, 1000.0),
                StockSheet::new("second", 1000.0, 2000.0),
            ],
            0.0,
        );
        let plan = planner.plan(&[demand("p", 900.0, 900.0, 1)]).unwrap();
        assert_eq!(plan.sheets[0].name, "first");
    }

    #[test]
    fn test_portrait_label() {
        let sheet = open_sheet(1, &StockSheet::new("MDF 18mm", 2750.0, 1850.0), true);
        assert_eq!(sheet.name, "MDF 18mm (Portrait)");
        assert_eq!(sheet.length, 1850.0);
        assert_eq!(sheet.width, 2750.0);

        let natural = open_sheet(2, &StockSheet::new("MDF 18mm", 2750.0, 1850.0), false);
        assert_eq!(natural.name, "MDF 18mm");
    }

    #[test]
    fn test_invalid_demand_rejected_first() {
        let planner = Planner::new(standard_catalog(), 3.0);
        let demands = vec![demand("good", 500.0, 300.0, 1), demand("bad", 0.0, 300.0, 1)];
        let err = planner.plan(&demands).unwrap_err();
        match err {
            PlanError::InvalidDemand { name, index, .. } => {
                assert_eq!(name, "bad");
                assert_eq!(index, 1);
            }
            other => panic!("expected InvalidDemand, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let planner = Planner::new(standard_catalog(), 3.0);
        let err = planner.plan(&[demand("none", 500.0, 300.0, 0)]).unwrap_err();
        assert!(matches!(err, PlanError::InvalidDemand { .. }));
    }

    #[test]
    fn test_empty_catalog() {
        let planner = Planner::new(vec![], 3.0);
        let err = planner.plan(&[demand("p", 100.0, 100.0, 1)]).unwrap_err();
        assert!(matches!(err, PlanError::EmptyCatalog));
    }

    #[test]
    fn test_determinism() {
        let planner = Planner::new(
            vec![
                StockSheet::new("MDF 18mm", 2750.0, 1850.0),
                StockSheet::new("MDF 15mm offcut", 1200.0, 800.0),
            ],
            3.0,
        );
        let demands = vec![
            demand("side", 700.0, 400.0, 4),
            demand("top", 900.0, 600.0, 2),
            demand("shelf", 764.0, 300.0, 6),
            demand("door", 595.0, 397.0, 2),
        ];
        let a = planner.plan(&demands).unwrap();
        let b = planner.plan(&demands).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_efficiency_bounds() {
        let planner = Planner::new(standard_catalog(), 3.0);
        let demands = vec![
            demand("side", 700.0, 400.0, 4),
            demand("shelf", 764.0, 300.0, 6),
            demand("strip", 2000.0, 80.0, 5),
        ];
        let plan = planner.plan(&demands).unwrap();
        for sheet in &plan.sheets {
            let e = sheet.efficiency();
            assert!(e > 0.0 && e <= 100.0, "sheet {} efficiency {e}", sheet.id);
        }
        let total = plan.total_efficiency();
        assert!(total > 0.0 && total <= 100.0);
    }

    #[test]
    fn test_unique_ids_trace_back_to_demand() {
        let planner = Planner::new(standard_catalog(), 3.0);
        let plan = planner.plan(&[demand("side", 700.0, 400.0, 3)]).unwrap();
        let mut ids: Vec<String> = plan
            .sheets
            .iter()
            .flat_map(|s| &s.pieces)
            .map(|p| {
                assert_eq!(p.demand_id, "side");
                p.unique_id.clone()
            })
            .collect();
        ids.sort();
        assert_eq!(ids, ["side#0", "side#1", "side#2"]);
    }

    #[test]
    fn test_larger_pieces_placed_first() {
        let planner = Planner::new(standard_catalog(), 0.0);
        let plan = planner
            .plan(&[demand("small", 100.0, 100.0, 1), demand("large", 1000.0, 1000.0, 1)])
            .unwrap();
        // Descending area order puts the large piece at the sheet origin.
        let first = &plan.sheets[0].pieces[0];
        assert_eq!(first.demand_id, "large");
        assert_eq!((first.x, first.y), (0.0, 0.0));
    }

    #[test]
    fn test_kerf_reduces_capacity() {
        let catalog = vec![StockSheet::new("s", 100.0, 100.0)];
        let tight = demand("half", 50.0, 100.0, 2);

        let plan = Planner::new(catalog.clone(), 0.0).plan(&[tight.clone()]).unwrap();
        assert_eq!(plan.sheet_count(), 1);

        // 50 + 5 kerf twice no longer fits side by side.
        let plan = Planner::new(catalog, 5.0).plan(&[demand("half", 50.0, 95.0, 2)]).unwrap();
        assert_eq!(plan.sheet_count(), 2);
    }
}
