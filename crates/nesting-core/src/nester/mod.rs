use crate::demand::aggregate_demand;
use crate::types::*;
use tracing::{info, warn};

mod allocate;
mod report;
mod search;

use allocate::AllocationStop;

/// Lays rectangular parts out on the fewest stock sheets using a best-of-N
/// maximal-rectangles search per sheet.
pub struct Nester {
    request: NestingRequest,
}

impl Nester {
    /// Validates requests and builds a new nester instance.
    pub fn new(request: NestingRequest) -> Result<Self> {
        if request.parts.is_empty() && request.stock_sizes.is_empty() {
            return Err(NestingError::InvalidInput(
                "At least one part or stock size must be provided".to_string(),
            ));
        }

        if request.stock_sizes.len() > MAX_STOCK_SIZES {
            return Err(NestingError::InvalidInput(format!(
                "At most {} stock sizes may be configured, got {}",
                MAX_STOCK_SIZES,
                request.stock_sizes.len()
            )));
        }

        if !request.gap.is_finite() || request.gap < 0.0 {
            return Err(NestingError::InvalidInput(format!(
                "Gap must be a non-negative number, got {}",
                request.gap
            )));
        }

        if request.max_sheets == 0 {
            return Err(NestingError::InvalidInput(
                "Sheet ceiling must be at least 1".to_string(),
            ));
        }

        for (idx, stock) in request.stock_sizes.iter().enumerate() {
            if !is_positive(stock.width) || !is_positive(stock.length) {
                return Err(NestingError::InvalidInput(format!(
                    "Stock '{}' must have positive width and length",
                    stock.display_name(idx)
                )));
            }
        }

        for part in &request.parts {
            if !is_positive(part.width) || !is_positive(part.length) {
                return Err(NestingError::InvalidInput(format!(
                    "Part '{}' must have positive width and length",
                    part.identifier
                )));
            }

            if part.quantity == 0 {
                return Err(NestingError::InvalidInput(format!(
                    "Part '{}' has zero quantity",
                    part.identifier
                )));
            }
        }

        // Every count in the report is a u32, so the whole request must fit one
        request
            .parts
            .iter()
            .try_fold(0u32, |total, part| total.checked_add(part.quantity))
            .ok_or_else(|| {
                NestingError::InvalidInput("Total part quantity is too large".to_string())
            })?;

        Ok(Self { request })
    }

    pub fn request(&self) -> &NestingRequest {
        &self.request
    }

    /// Executes the full nesting flow: aggregate, allocate per thickness, report.
    pub fn nest(&self) -> Result<NestingResult> {
        let mut groups = aggregate_demand(&self.request.parts)?;
        let mut leftover = Vec::new();

        info!(
            parts = self.request.parts.len(),
            groups = groups.len(),
            stock_sizes = self.request.stock_sizes.len(),
            "Starting nesting run"
        );

        // Groups larger than every stock size never enter the allocator
        let placeable: Vec<bool> = groups
            .iter()
            .map(|group| {
                self.request
                    .stock_sizes
                    .iter()
                    .any(|stock| group.fits_stock(stock, self.request.allow_rotation))
            })
            .collect();

        for (group, _) in groups.iter().zip(&placeable).filter(|(_, ok)| !**ok) {
            warn!(
                group = %group.key,
                quantity = group.remaining_quantity,
                "Part fits no stock size"
            );
            leftover.push(leftover_entry(group, LeftoverReason::Unplaceable));
        }

        let mut sheets: Vec<Sheet> = Vec::new();

        for indices in self.thickness_partitions(&groups, &placeable) {
            let mut demand: Vec<DemandGroup> =
                indices.iter().map(|&i| groups[i].clone()).collect();
            let budget = self.request.max_sheets.saturating_sub(sheets.len() as u32);

            let allocation = self.allocate(&mut demand, budget);

            for mut sheet in allocation.sheets {
                sheet.index = sheets.len() as u32 + 1;
                sheets.push(sheet);
            }

            let reason = match allocation.stop {
                AllocationStop::Done => None,
                AllocationStop::CeilingReached => Some(LeftoverReason::CeilingReached),
                AllocationStop::NoFit => Some(LeftoverReason::NoFit),
            };

            for (&global, group) in indices.iter().zip(demand) {
                if group.remaining_quantity > 0 {
                    if let Some(reason) = reason {
                        leftover.push(leftover_entry(&group, reason));
                    }
                }
                groups[global] = group;
            }
        }

        if leftover.iter().any(|l| l.reason == LeftoverReason::CeilingReached) {
            warn!(
                max_sheets = self.request.max_sheets,
                "Sheet ceiling reached with demand outstanding"
            );
        }

        // Keep leftover rows in demand order regardless of which stage produced them
        leftover.sort_by_key(|entry| {
            groups
                .iter()
                .position(|g| g.key == entry.group_key)
                .unwrap_or(usize::MAX)
        });

        let result = self.build_result(sheets, &groups, leftover);

        info!(
            sheets = result.sheets.len(),
            utilization = result.overall_utilization,
            leftover = result.summary.leftover_parts,
            "Nesting complete"
        );

        Ok(result)
    }

    /// Splits placeable groups by thickness, in first-seen order.
    fn thickness_partitions(
        &self,
        groups: &[DemandGroup],
        placeable: &[bool],
    ) -> Vec<Vec<usize>> {
        let mut partitions: Vec<(String, Vec<usize>)> = Vec::new();

        for (idx, group) in groups.iter().enumerate() {
            if !placeable[idx] || group.remaining_quantity == 0 {
                continue;
            }
            match partitions.iter_mut().find(|(t, _)| *t == group.thickness) {
                Some((_, members)) => members.push(idx),
                None => partitions.push((group.thickness.clone(), vec![idx])),
            }
        }

        partitions.into_iter().map(|(_, members)| members).collect()
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn leftover_entry(group: &DemandGroup, reason: LeftoverReason) -> LeftoverDemand {
    LeftoverDemand {
        group_key: group.key.clone(),
        base_identifier: group.base_identifier().to_string(),
        thickness: group.thickness.clone(),
        width: group.width,
        length: group.length,
        quantity: group.remaining_quantity,
        reason,
    }
}
