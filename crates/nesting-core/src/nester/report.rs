use super::*;

const MM2_PER_M2: f64 = 1_000_000.0;

impl Nester {
    /// Assembles the final result from committed sheets and settled demand.
    /// Only aggregates numbers the allocator already produced.
    pub(super) fn build_result(
        &self,
        sheets: Vec<Sheet>,
        groups: &[DemandGroup],
        leftover: Vec<LeftoverDemand>,
    ) -> NestingResult {
        let bill_of_materials = self.bill_of_materials(groups);
        let stock_purchase_summary = self.count_stock(&sheets);
        let summary = self.calculate_summary(&sheets, groups, &leftover);

        NestingResult {
            overall_utilization: summary.overall_utilization,
            sheets,
            bill_of_materials,
            stock_purchase_summary,
            leftover,
            summary,
        }
    }

    /// One row per shape key with its original quantity.
    fn bill_of_materials(&self, groups: &[DemandGroup]) -> Vec<BomEntry> {
        groups
            .iter()
            .map(|group| BomEntry {
                group_key: group.key.clone(),
                base_identifier: group.base_identifier().to_string(),
                thickness: group.thickness.clone(),
                width: group.width,
                length: group.length,
                quantity: group.original_quantity,
                placed_quantity: group.placed_quantity(),
                unit_area: group.unit_area,
                total_area: group.unit_area * group.original_quantity as f64,
            })
            .collect()
    }

    /// Aggregates how many sheets of each stock size were consumed, in stock order.
    fn count_stock(&self, sheets: &[Sheet]) -> Vec<StockPurchase> {
        self.request
            .stock_sizes
            .iter()
            .enumerate()
            .filter_map(|(idx, stock)| {
                let count = sheets.iter().filter(|s| s.stock_index == idx).count() as u32;
                (count > 0).then(|| StockPurchase {
                    stock_index: idx,
                    stock_name: stock.display_name(idx),
                    width: stock.width,
                    length: stock.length,
                    count,
                })
            })
            .collect()
    }

    /// Computes utilization and waste totals.
    fn calculate_summary(
        &self,
        sheets: &[Sheet],
        groups: &[DemandGroup],
        leftover: &[LeftoverDemand],
    ) -> Summary {
        let total_stock_area: f64 = sheets.iter().map(|s| s.stock_size.area()).sum();
        let total_used_area: f64 = sheets.iter().map(|s| s.placed_area).sum();
        let waste_area = total_stock_area - total_used_area;

        let overall_utilization = if total_stock_area > 0.0 {
            total_used_area / total_stock_area
        } else {
            0.0
        };
        let waste_percentage = if total_stock_area > 0.0 {
            (waste_area / total_stock_area) * 100.0
        } else {
            0.0
        };

        Summary {
            total_parts: groups.iter().map(|g| g.original_quantity).sum(),
            placed_parts: sheets.iter().map(|s| s.placements.len() as u32).sum(),
            leftover_parts: leftover.iter().map(|l| l.quantity).sum(),
            sheets_used: sheets.len() as u32,
            total_stock_area,
            total_used_area,
            waste_area,
            overall_utilization,
            waste_percentage,
            total_stock_area_m2: total_stock_area / MM2_PER_M2,
            total_used_area_m2: total_used_area / MM2_PER_M2,
        }
    }
}
