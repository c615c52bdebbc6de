use super::search::SheetCandidate;
use super::*;
use tracing::{debug, info};

/// Why the allocator stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum AllocationStop {
    /// All demand placed
    Done,
    /// Sheet budget used up with demand outstanding
    CeilingReached,
    /// No stock size could take any remaining part
    NoFit,
}

#[derive(Debug)]
pub(super) struct Allocation {
    pub sheets: Vec<Sheet>,
    pub stop: AllocationStop,
}

impl Nester {
    /// Commits sheets one at a time until `demand` is exhausted, the budget is
    /// spent, or nothing fits any more.
    ///
    /// Every iteration re-runs the strategy search for every stock size against
    /// the current remainder and commits the stock size that places the most
    /// parts (utilization breaks ties, then stock order). `demand` must hold a
    /// single thickness.
    pub(super) fn allocate(&self, demand: &mut [DemandGroup], budget: u32) -> Allocation {
        let mut sheets: Vec<Sheet> = Vec::new();

        loop {
            if demand.iter().all(|g| g.remaining_quantity == 0) {
                return Allocation {
                    sheets,
                    stop: AllocationStop::Done,
                };
            }

            if sheets.len() as u32 >= budget {
                return Allocation {
                    sheets,
                    stop: AllocationStop::CeilingReached,
                };
            }

            let Some(best) = self.best_stock_candidate(demand) else {
                debug!("No stock size accepts any remaining part");
                return Allocation {
                    sheets,
                    stop: AllocationStop::NoFit,
                };
            };

            let sheet = self.commit(demand, best);
            info!(
                stock = %sheet.stock_name,
                thickness = %sheet.thickness,
                parts = sheet.placements.len(),
                utilization = sheet.utilization,
                "Committed sheet"
            );
            sheets.push(sheet);
        }
    }

    fn best_stock_candidate(&self, demand: &[DemandGroup]) -> Option<SheetCandidate> {
        let mut best: Option<SheetCandidate> = None;

        for stock_index in 0..self.request.stock_sizes.len() {
            let Some(candidate) = self.search_sheet(demand, stock_index) else {
                continue;
            };
            let better = match &best {
                None => true,
                Some(current) => candidate.outranks(current),
            };
            if better {
                best = Some(candidate);
            }
        }

        best
    }

    /// Single commit point: decrements demand for every placed part.
    fn commit(&self, demand: &mut [DemandGroup], candidate: SheetCandidate) -> Sheet {
        let stock = &self.request.stock_sizes[candidate.stock_index];
        let thickness = candidate
            .parts
            .first()
            .map(|p| demand[p.group].thickness.clone())
            .unwrap_or_default();

        let mut placements = Vec::with_capacity(candidate.parts.len());
        for part in candidate.parts {
            let group = &mut demand[part.group];
            debug_assert!(group.remaining_quantity > 0);
            group.remaining_quantity = group.remaining_quantity.saturating_sub(1);
            placements.push(part.placement);
        }

        let sheet_area = stock.area();
        Sheet {
            index: 0,
            stock_index: candidate.stock_index,
            stock_name: stock.display_name(candidate.stock_index),
            stock_size: stock.clone(),
            thickness,
            placements,
            placed_area: candidate.placed_area,
            waste_area: sheet_area - candidate.placed_area,
            utilization: candidate.utilization,
            algorithm: candidate.algorithm,
            sort_order: candidate.sort_order,
        }
    }
}
