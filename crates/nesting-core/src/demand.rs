use crate::types::{DemandGroup, NestingError, PartInstance, Result, ShapeKey};
use std::collections::HashMap;

/// Separators that introduce a duplicate counter, e.g. `PL-12_3` or `Plate #2`.
const SUFFIX_SEPARATORS: [char; 5] = ['_', '-', ' ', '#', '.'];

/// Strips a trailing duplicate counter from a part identifier.
///
/// `"PL-12_3"` becomes `"PL-12"`, `"Stiffener (2)"` becomes `"Stiffener"`.
/// Identifiers without a separated numeric tail are returned trimmed but
/// otherwise unchanged, so `"PL12"` stays `"PL12"`.
pub fn base_identifier(identifier: &str) -> &str {
    let trimmed = identifier.trim();

    if let Some(inner) = trimmed.strip_suffix(')') {
        if let Some(open) = inner.rfind('(') {
            let counter = &inner[open + 1..];
            let head = inner[..open].trim_end();
            if is_counter(counter) && !head.is_empty() {
                return head;
            }
        }
    }

    let Some((sep, separator)) = trimmed
        .char_indices()
        .rev()
        .find(|(_, c)| !c.is_ascii_digit())
    else {
        return trimmed;
    };
    let counter = &trimmed[sep + separator.len_utf8()..];
    let head = trimmed[..sep].trim_end();

    if SUFFIX_SEPARATORS.contains(&separator) && is_counter(counter) && !head.is_empty() {
        head
    } else {
        trimmed
    }
}

fn is_counter(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Collapses part instances into demand groups keyed by shape.
///
/// Groups come out in the order their shape key is first seen. A part and its
/// 90° twin land in the same group; the first instance fixes the canonical
/// orientation. Fails when a group's quantity no longer fits a `u32`.
pub fn aggregate_demand(parts: &[PartInstance]) -> Result<Vec<DemandGroup>> {
    let mut groups: Vec<DemandGroup> = Vec::new();
    let mut index: HashMap<ShapeKey, usize> = HashMap::new();

    for part in parts {
        let base = base_identifier(&part.identifier);
        let key = ShapeKey::new(base, &part.thickness, part.width, part.length);

        match index.get(&key) {
            Some(&idx) => {
                let group = &mut groups[idx];
                let total = group
                    .original_quantity
                    .checked_add(part.quantity)
                    .ok_or_else(|| {
                        NestingError::InvalidInput(format!(
                            "Total quantity of '{}' overflows",
                            group.key
                        ))
                    })?;
                group.original_quantity = total;
                group.remaining_quantity = total;
            }
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(DemandGroup {
                    key,
                    width: part.width,
                    length: part.length,
                    thickness: part.thickness.clone(),
                    original_quantity: part.quantity,
                    remaining_quantity: part.quantity,
                    unit_area: part.width * part.length,
                });
            }
        }
    }

    Ok(groups)
}
