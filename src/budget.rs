//! Quote math for a workshop job: sheet material priced by consumed area,
//! hardware by per-unit box price, edge banding by metre, all marked up by
//! the profit margin, then helper/delivery/discount applied on top.

use serde::{Deserialize, Serialize};

use crate::types::{StockSheet, deserialize_u32_from_number};

/// Markup the workshop applies to material cost by default.
pub const DEFAULT_PROFIT_MARGIN_PERCENT: f64 = 180.0;

/// A demand line priced against a catalog sheet, with the edges that
/// receive banding (two length sides, two width sides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricedPiece {
    pub name: String,
    pub length: f64,
    pub width: f64,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub qty: u32,
    /// Name of the stock sheet this piece is cut from.
    pub sheet: String,
    #[serde(default)]
    pub band_l1: bool,
    #[serde(default)]
    pub band_l2: bool,
    #[serde(default)]
    pub band_w1: bool,
    #[serde(default)]
    pub band_w2: bool,
}

impl PricedPiece {
    /// Banded edge length in mm for all units of this line.
    fn banded_mm(&self) -> f64 {
        let mut edge = 0.0;
        if self.band_l1 {
            edge += self.length;
        }
        if self.band_l2 {
            edge += self.length;
        }
        if self.band_w1 {
            edge += self.width;
        }
        if self.band_w2 {
            edge += self.width;
        }
        edge * self.qty as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareItem {
    pub name: String,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub box_qty: u32,
    pub box_price: f64,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub used_qty: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeTape {
    pub name: String,
    pub roll_price: f64,
    pub roll_length_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetInput {
    pub stock: Vec<StockSheet>,
    pub pieces: Vec<PricedPiece>,
    #[serde(default)]
    pub hardware: Vec<HardwareItem>,
    #[serde(default)]
    pub tape: Option<EdgeTape>,
    #[serde(default = "default_margin")]
    pub profit_margin_percent: f64,
    #[serde(default)]
    pub helper_cost: f64,
    #[serde(default)]
    pub delivery_fee: f64,
    #[serde(default)]
    pub discount: f64,
}

fn default_margin() -> f64 {
    DEFAULT_PROFIT_MARGIN_PERCENT
}

#[derive(Debug, Clone, Serialize)]
pub struct QuoteLine {
    pub name: String,
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub piece_lines: Vec<QuoteLine>,
    pub pieces_cost: f64,
    pub hardware_cost: f64,
    pub tape_meters: f64,
    pub tape_cost: f64,
    pub subtotal: f64,
    pub helper_cost: f64,
    pub delivery_fee: f64,
    pub discount: f64,
    pub grand_total: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    #[error("piece \"{0}\" references unknown stock sheet \"{1}\"")]
    UnknownSheet(String, String),

    #[error("stock sheet \"{0}\" has no usable area")]
    ZeroAreaSheet(String),

    #[error("hardware item \"{0}\" has zero box quantity")]
    ZeroBoxQty(String),

    #[error("edge tape \"{0}\" has zero roll length")]
    ZeroRollLength(String),

    #[error("pieces request edge banding but no tape is configured")]
    MissingTape,
}

pub fn quote(input: &BudgetInput) -> Result<Quote, BudgetError> {
    let margin = 1.0 + input.profit_margin_percent / 100.0;

    let mut piece_lines = Vec::with_capacity(input.pieces.len());
    let mut pieces_cost = 0.0;
    let mut tape_mm = 0.0;
    for piece in &input.pieces {
        let sheet = input
            .stock
            .iter()
            .find(|s| s.name == piece.sheet)
            .ok_or_else(|| BudgetError::UnknownSheet(piece.name.clone(), piece.sheet.clone()))?;
        if sheet.area() <= 0.0 {
            return Err(BudgetError::ZeroAreaSheet(sheet.name.clone()));
        }

        let price_per_mm2 = sheet.price / sheet.area();
        let cost = piece.length * piece.width * price_per_mm2 * piece.qty as f64 * margin;
        pieces_cost += cost;
        piece_lines.push(QuoteLine {
            name: piece.name.clone(),
            cost,
        });

        tape_mm += piece.banded_mm();
    }

    let mut hardware_cost = 0.0;
    for item in &input.hardware {
        if item.box_qty == 0 {
            return Err(BudgetError::ZeroBoxQty(item.name.clone()));
        }
        hardware_cost += item.box_price / item.box_qty as f64 * item.used_qty as f64 * margin;
    }

    let tape_meters = tape_mm / 1000.0;
    let tape_cost = match &input.tape {
        Some(tape) => {
            if tape.roll_length_m <= 0.0 {
                return Err(BudgetError::ZeroRollLength(tape.name.clone()));
            }
            tape_meters * (tape.roll_price / tape.roll_length_m) * margin
        }
        None if tape_meters > 0.0 => return Err(BudgetError::MissingTape),
        None => 0.0,
    };

    let subtotal = pieces_cost + hardware_cost + tape_cost;
    let grand_total = subtotal + input.helper_cost + input.delivery_fee - input.discount;

    Ok(Quote {
        piece_lines,
        pieces_cost,
        hardware_cost,
        tape_meters,
        tape_cost,
        subtotal,
        helper_cost: input.helper_cost,
        delivery_fee: input.delivery_fee,
        discount: input.discount,
        grand_total,
    })
}
