use super::*;
use crate::maxrects::{self, PackRect};
use rayon::prelude::*;
use std::cmp::Ordering;
use tracing::debug;

/// Utilization differences below this are treated as ties.
const UTILIZATION_TOLERANCE: f64 = 1e-12;

/// A part placed during a search, tied back to its demand group
#[derive(Debug, Clone)]
pub(super) struct PlacedPart {
    pub group: usize,
    pub placement: Placement,
}

/// Best single-sheet layout found for one stock size
#[derive(Debug, Clone)]
pub(super) struct SheetCandidate {
    pub stock_index: usize,
    pub algorithm: PackingAlgorithm,
    pub sort_order: SortOrder,
    pub parts: Vec<PlacedPart>,
    pub placed_area: f64,
    pub utilization: f64,
}

impl SheetCandidate {
    pub fn packed_count(&self) -> usize {
        self.parts.len()
    }

    /// More parts wins; on equal count, higher utilization wins.
    /// Anything else is a tie and the incumbent stays.
    pub fn outranks(&self, other: &SheetCandidate) -> bool {
        match self.packed_count().cmp(&other.packed_count()) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => self.utilization > other.utilization + UTILIZATION_TOLERANCE,
        }
    }
}

impl Nester {
    /// Tries every (algorithm, sort order) pair against one stock size and
    /// returns the best layout, or `None` when not a single part fits.
    ///
    /// `demand` is a read-only snapshot; nothing here touches quantities.
    pub(super) fn search_sheet(
        &self,
        demand: &[DemandGroup],
        stock_index: usize,
    ) -> Option<SheetCandidate> {
        let stock = &self.request.stock_sizes[stock_index];
        let requests = self.expand_requests(demand, stock);
        if requests.is_empty() {
            return None;
        }

        let strategies: Vec<(PackingAlgorithm, SortOrder)> = PackingAlgorithm::ALL
            .into_iter()
            .flat_map(|algorithm| SortOrder::ALL.into_iter().map(move |order| (algorithm, order)))
            .collect();

        // Collected in enumeration order so ties resolve to the first strategy
        let candidates: Vec<SheetCandidate> = strategies
            .par_iter()
            .map(|&(algorithm, order)| {
                self.try_strategy(demand, &requests, stock_index, algorithm, order)
            })
            .collect();

        let mut best: Option<SheetCandidate> = None;
        for candidate in candidates {
            let better = match &best {
                None => true,
                Some(current) => candidate.outranks(current),
            };
            if better {
                best = Some(candidate);
            }
        }

        let best = best.filter(|candidate| candidate.packed_count() > 0)?;

        debug!(
            stock = %stock.display_name(stock_index),
            algorithm = ?best.algorithm,
            sort_order = ?best.sort_order,
            packed = best.packed_count(),
            utilization = best.utilization,
            "Strategy search winner"
        );

        Some(best)
    }

    /// One request per remaining unit, inflated by the gap. A group never asks
    /// for more units than could fit on the sheet by area alone, and one attempt
    /// never sees more than `MAX_SHEET_REQUESTS` requests; demand order decides
    /// who gets in when that limit bites.
    pub(super) fn expand_requests(
        &self,
        demand: &[DemandGroup],
        stock: &StockSize,
    ) -> Vec<PackRect> {
        let gap = self.request.gap;
        let sheet_area = stock.area();
        let bin_area = (stock.width + gap) * (stock.length + gap);
        let mut requests = Vec::new();

        for (idx, group) in demand.iter().enumerate() {
            if requests.len() >= MAX_SHEET_REQUESTS {
                break;
            }
            if group.remaining_quantity == 0 {
                continue;
            }
            if !group.fits_stock(stock, self.request.allow_rotation) {
                continue;
            }

            let width = group.width + gap;
            let height = group.length + gap;

            let area_cap = (sheet_area / group.unit_area + EPSILON).floor();
            let inflated_cap = (bin_area / (width * height) + EPSILON).floor();
            let room = (MAX_SHEET_REQUESTS - requests.len()) as f64;
            let count = (group.remaining_quantity as f64)
                .min(area_cap)
                .min(inflated_cap)
                .min(room) as usize;

            requests.extend((0..count).map(|_| PackRect {
                id: idx,
                width,
                height,
            }));
        }

        requests
    }

    fn try_strategy(
        &self,
        demand: &[DemandGroup],
        requests: &[PackRect],
        stock_index: usize,
        algorithm: PackingAlgorithm,
        order: SortOrder,
    ) -> SheetCandidate {
        let stock = &self.request.stock_sizes[stock_index];
        let gap = self.request.gap;

        let mut sorted = requests.to_vec();
        sorted.sort_by(|a, b| {
            let ga = &demand[a.id];
            let gb = &demand[b.id];
            order
                .key(gb.width, gb.length)
                .partial_cmp(&order.key(ga.width, ga.length))
                .unwrap_or(Ordering::Equal)
        });

        let packed = maxrects::pack(
            stock.width + gap,
            stock.length + gap,
            &sorted,
            self.request.allow_rotation,
            algorithm,
        );

        let parts: Vec<PlacedPart> = packed
            .into_iter()
            .flatten()
            .map(|p| {
                let group = &demand[p.id];
                let (placed_width, placed_height) = if p.rotated {
                    (group.length, group.width)
                } else {
                    (group.width, group.length)
                };
                PlacedPart {
                    group: p.id,
                    placement: Placement {
                        group_key: group.key.clone(),
                        part_name: group.base_identifier().to_string(),
                        x: p.x,
                        y: p.y,
                        placed_width,
                        placed_height,
                        rotated: p.rotated,
                    },
                }
            })
            .collect();

        let placed_area: f64 = parts.iter().map(|p| p.placement.area()).sum();

        SheetCandidate {
            stock_index,
            algorithm,
            sort_order: order,
            parts,
            placed_area,
            utilization: placed_area / stock.area(),
        }
    }
}
