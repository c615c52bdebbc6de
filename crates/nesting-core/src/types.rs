use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of stock sizes accepted per request
pub const MAX_STOCK_SIZES: usize = 5;

/// Default part-to-part clearance in millimetres
pub const DEFAULT_GAP: f64 = 5.0;

/// Default safety ceiling on committed sheets
pub const DEFAULT_MAX_SHEETS: u32 = 100;

/// Upper bound on rectangle requests handed to one packing attempt
pub const MAX_SHEET_REQUESTS: usize = 4096;

/// Tolerance used for all dimension comparisons
pub const EPSILON: f64 = 1e-6;

/// One physical part occurrence to be cut
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartInstance {
    /// May carry a numeric suffix (`PL-12_3`) distinguishing duplicates
    pub identifier: String,
    pub thickness: String,
    pub width: f64,
    pub length: f64,
    /// Repeat count carried by the upstream list
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl PartInstance {
    pub fn new(
        identifier: impl Into<String>,
        thickness: impl Into<String>,
        width: f64,
        length: f64,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            thickness: thickness.into(),
            width,
            length,
            quantity: 1,
        }
    }
}

/// A purchasable stock sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSize {
    pub width: f64,
    pub length: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl StockSize {
    pub fn new(width: f64, length: f64) -> Self {
        Self {
            width,
            length,
            name: None,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.length
    }

    /// Display name, falling back to the 1-based position in the candidate list.
    pub fn display_name(&self, index: usize) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("Stock {}", index + 1),
        }
    }
}

/// Input: what the caller provides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestingRequest {
    pub parts: Vec<PartInstance>,
    pub stock_sizes: Vec<StockSize>,
    /// Clearance kept between any two parts on a sheet
    #[serde(default = "default_gap")]
    pub gap: f64,
    #[serde(default = "default_true")]
    pub allow_rotation: bool,
    /// Safety bound on the number of committed sheets
    #[serde(default = "default_max_sheets")]
    pub max_sheets: u32,
}

impl NestingRequest {
    pub fn new(parts: Vec<PartInstance>, stock_sizes: Vec<StockSize>) -> Self {
        Self {
            parts,
            stock_sizes,
            gap: DEFAULT_GAP,
            allow_rotation: true,
            max_sheets: DEFAULT_MAX_SHEETS,
        }
    }
}

fn default_quantity() -> u32 {
    1
}

fn default_gap() -> f64 {
    DEFAULT_GAP
}

fn default_true() -> bool {
    true
}

fn default_max_sheets() -> u32 {
    DEFAULT_MAX_SHEETS
}

/// Grouping identity of a part: base identifier, thickness and the unordered
/// dimension pair. Dimensions are quantized to micrometres so the key is hashable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShapeKey {
    pub base_identifier: String,
    pub thickness: String,
    pub short_side_um: i64,
    pub long_side_um: i64,
}

impl ShapeKey {
    pub fn new(base_identifier: &str, thickness: &str, width: f64, length: f64) -> Self {
        let (short, long) = if width <= length {
            (width, length)
        } else {
            (length, width)
        };
        Self {
            base_identifier: base_identifier.to_string(),
            thickness: thickness.to_string(),
            short_side_um: (short * 1000.0).round() as i64,
            long_side_um: (long * 1000.0).round() as i64,
        }
    }
}

impl fmt::Display for ShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}x{}",
            self.base_identifier,
            self.thickness,
            self.short_side_um as f64 / 1000.0,
            self.long_side_um as f64 / 1000.0
        )
    }
}

/// A count of identical parts still needing placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandGroup {
    pub key: ShapeKey,
    /// Canonical orientation, taken from the first instance seen
    pub width: f64,
    pub length: f64,
    pub thickness: String,
    pub original_quantity: u32,
    pub remaining_quantity: u32,
    pub unit_area: f64,
}

impl DemandGroup {
    pub fn base_identifier(&self) -> &str {
        &self.key.base_identifier
    }

    pub fn placed_quantity(&self) -> u32 {
        self.original_quantity - self.remaining_quantity
    }

    /// True if one unit fits on an empty sheet of `stock`.
    pub fn fits_stock(&self, stock: &StockSize, allow_rotation: bool) -> bool {
        let upright =
            self.width <= stock.width + EPSILON && self.length <= stock.length + EPSILON;
        let rotated = allow_rotation
            && self.length <= stock.width + EPSILON
            && self.width <= stock.length + EPSILON;
        upright || rotated
    }
}

/// Placement of one part on one sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub group_key: ShapeKey,
    pub part_name: String,
    pub x: f64,
    pub y: f64,
    pub placed_width: f64,
    pub placed_height: f64,
    pub rotated: bool,
}

impl Placement {
    pub fn area(&self) -> f64 {
        self.placed_width * self.placed_height
    }
}

/// Rectangle-packing heuristic used for one strategy.
/// Declaration order is the evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackingAlgorithm {
    BestShortSideFit,
    BestLongSideFit,
    BestAreaFit,
    BottomLeft,
    ContactPoint,
}

impl PackingAlgorithm {
    pub const ALL: [PackingAlgorithm; 5] = [
        PackingAlgorithm::BestShortSideFit,
        PackingAlgorithm::BestLongSideFit,
        PackingAlgorithm::BestAreaFit,
        PackingAlgorithm::BottomLeft,
        PackingAlgorithm::ContactPoint,
    ];
}

/// Order in which demand is fed to the packer.
/// Every order is descending; declaration order is the evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Area,
    LongSide,
    ShortSide,
    Width,
    Perimeter,
}

impl SortOrder {
    pub const ALL: [SortOrder; 5] = [
        SortOrder::Area,
        SortOrder::LongSide,
        SortOrder::ShortSide,
        SortOrder::Width,
        SortOrder::Perimeter,
    ];

    /// Sort key for a `width x length` rectangle; larger sorts first.
    pub fn key(&self, width: f64, length: f64) -> f64 {
        match self {
            SortOrder::Area => width * length,
            SortOrder::LongSide => width.max(length),
            SortOrder::ShortSide => width.min(length),
            SortOrder::Width => width,
            SortOrder::Perimeter => 2.0 * (width + length),
        }
    }
}

/// One committed stock sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    /// 1-based position in the output
    pub index: u32,
    pub stock_index: usize,
    pub stock_name: String,
    pub stock_size: StockSize,
    pub thickness: String,
    pub placements: Vec<Placement>,
    pub placed_area: f64,
    pub waste_area: f64,
    pub utilization: f64,
    /// Winning combination, serialized under its report name
    #[serde(rename = "algorithm_id")]
    pub algorithm: PackingAlgorithm,
    #[serde(rename = "sort_strategy_id")]
    pub sort_order: SortOrder,
}

/// One row of the procurement bill of materials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomEntry {
    pub group_key: ShapeKey,
    pub base_identifier: String,
    pub thickness: String,
    pub width: f64,
    pub length: f64,
    pub quantity: u32,
    pub placed_quantity: u32,
    pub unit_area: f64,
    pub total_area: f64,
}

/// How many sheets of one stock size the layout consumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockPurchase {
    pub stock_index: usize,
    pub stock_name: String,
    pub width: f64,
    pub length: f64,
    pub count: u32,
}

/// Why demand was left unplaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeftoverReason {
    /// Larger than every stock size, even rotated
    Unplaceable,
    /// The sheet-count ceiling was reached first
    CeilingReached,
    /// No stock size could take any of the remaining parts
    NoFit,
}

/// Demand that did not end up in any placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeftoverDemand {
    pub group_key: ShapeKey,
    pub base_identifier: String,
    pub thickness: String,
    pub width: f64,
    pub length: f64,
    pub quantity: u32,
    pub reason: LeftoverReason,
}

/// Summary statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_parts: u32,
    pub placed_parts: u32,
    pub leftover_parts: u32,
    pub sheets_used: u32,
    pub total_stock_area: f64,
    pub total_used_area: f64,
    pub waste_area: f64,
    pub overall_utilization: f64,
    pub waste_percentage: f64,
    pub total_stock_area_m2: f64,
    pub total_used_area_m2: f64,
}

/// Output: what the nester returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestingResult {
    pub sheets: Vec<Sheet>,
    pub bill_of_materials: Vec<BomEntry>,
    pub stock_purchase_summary: Vec<StockPurchase>,
    /// Every unit not placed on a sheet, with the reason
    #[serde(default)]
    pub leftover: Vec<LeftoverDemand>,
    /// Placed area over sheet area across all sheets, in `[0, 1]`
    pub overall_utilization: f64,
    pub summary: Summary,
}

impl NestingResult {
    /// True when every part was placed.
    pub fn is_complete(&self) -> bool {
        self.leftover.is_empty()
    }
}

/// Error type for nesting
#[derive(Debug, thiserror::Error)]
pub enum NestingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, NestingError>;
