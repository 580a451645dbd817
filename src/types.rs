use serde::{Deserialize, Serialize};

/// One cut the customer needs, before quantity explosion.
///
/// Dimensions are net millimetres; the kerf margin is added only when the
/// demand is exploded into [`PieceInstance`]s. Axis convention throughout the
/// crate: `length` spans the X axis, `width` the Y axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceDemand {
    /// Opaque caller-supplied identifier, stable for one planning run.
    pub id: String,
    pub name: String,
    pub length: f64,
    pub width: f64,
    #[serde(deserialize_with = "deserialize_u32_from_number")]
    pub qty: u32,
}

/// Catalog entry describing a purchasable raw sheet size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSheet {
    pub name: String,
    pub length: f64,
    pub width: f64,
    /// Per-sheet price. The planner ignores it; the budget engine does not.
    #[serde(default)]
    pub price: f64,
}

impl StockSheet {
    pub fn new(name: impl Into<String>, length: f64, width: f64) -> Self {
        Self {
            name: name.into(),
            length,
            width,
            price: 0.0,
        }
    }

    pub fn area(&self) -> f64 {
        self.length * self.width
    }

    pub fn is_square(&self) -> bool {
        self.length == self.width
    }
}

/// One unit instance of a demand: the net dimensions the customer receives
/// plus the kerf-inflated footprint the saw actually consumes.
#[derive(Debug, Clone)]
pub struct PieceInstance {
    pub unique_id: String,
    pub demand_id: String,
    pub name: String,
    pub length: f64,
    pub width: f64,
    pub eff_length: f64,
    pub eff_width: f64,
}

impl PieceInstance {
    pub fn from_demand(demand: &PieceDemand, index: u32, kerf: f64) -> Self {
        Self {
            unique_id: format!("{}#{}", demand.id, index),
            demand_id: demand.id.clone(),
            name: demand.name.clone(),
            length: demand.length,
            width: demand.width,
            eff_length: demand.length + kerf,
            eff_width: demand.width + kerf,
        }
    }

    pub fn eff_area(&self) -> f64 {
        self.eff_length * self.eff_width
    }
}

/// A piece bound to a location on a sheet. Created once, never moved.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedPiece {
    pub unique_id: String,
    pub demand_id: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
    /// Net footprint in the chosen orientation; kerf is not included.
    pub placed_length: f64,
    pub placed_width: f64,
    pub original_length: f64,
    pub original_width: f64,
    pub rotated: bool,
}

impl PlacedPiece {
    pub fn net_area(&self) -> f64 {
        self.placed_length * self.placed_width
    }
}

/// Accepts integral JSON floats (`2.0`) for quantities, which is what masked
/// form inputs tend to send after unmasking.
pub fn deserialize_u32_from_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.fract() != 0.0 || !(0.0..=u32::MAX as f64).contains(&value) {
        return Err(serde::de::Error::custom(format!(
            "expected a whole non-negative number, got {value}"
        )));
    }
    Ok(value as u32)
}
