//! Rectangular plate nesting.
//!
//! Collapses parts into demand groups, searches a fixed set of
//! maximal-rectangles strategies per sheet, commits the best sheet over all
//! candidate stock sizes until demand runs out, and reports the layout with a
//! bill of materials and a stock purchase summary.

pub mod demand;
pub mod maxrects;
mod nester;
mod types;

pub use nester::Nester;
pub use types::*;
