//! Maximal-rectangles bin packing.
//!
//! A single bin tracks every maximal free rectangle. Each insert picks the
//! free rectangle (and orientation) with the lowest heuristic score, then
//! splits every free rectangle the new part overlaps and prunes the ones that
//! became contained in another. The packer is deterministic: ties keep the
//! first candidate in free-list order, upright before rotated.

use crate::types::{PackingAlgorithm, EPSILON};
use std::cmp::Ordering;

/// A rectangle request handed to the packer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackRect {
    pub id: usize,
    pub width: f64,
    pub height: f64,
}

/// Where a request ended up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackedRect {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FreeRect {
    fn right(&self) -> f64 {
        self.x + self.width
    }

    fn bottom(&self) -> f64 {
        self.y + self.height
    }

    fn area(&self) -> f64 {
        self.width * self.height
    }

    fn contains(&self, other: &FreeRect) -> bool {
        other.x >= self.x - EPSILON
            && other.y >= self.y - EPSILON
            && other.right() <= self.right() + EPSILON
            && other.bottom() <= self.bottom() + EPSILON
    }

    fn intersects(&self, other: &FreeRect) -> bool {
        self.x < other.right() - EPSILON
            && other.x < self.right() - EPSILON
            && self.y < other.bottom() - EPSILON
            && other.y < self.bottom() - EPSILON
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    rotated: bool,
    score: (f64, f64),
}

#[derive(Debug, Clone)]
pub struct MaxRectsBin {
    width: f64,
    height: f64,
    algorithm: PackingAlgorithm,
    pub free_rects: Vec<FreeRect>,
    pub used_rects: Vec<FreeRect>,
}

impl MaxRectsBin {
    pub fn new(width: f64, height: f64, algorithm: PackingAlgorithm) -> Self {
        Self {
            width,
            height,
            algorithm,
            free_rects: vec![FreeRect {
                x: 0.0,
                y: 0.0,
                width,
                height,
            }],
            used_rects: Vec::new(),
        }
    }

    /// Places `rect` if any free rectangle can take it.
    pub fn insert(&mut self, rect: PackRect, allow_rotation: bool) -> Option<PackedRect> {
        let best = self.find_best(rect.width, rect.height, allow_rotation)?;
        let placed = FreeRect {
            x: best.x,
            y: best.y,
            width: best.width,
            height: best.height,
        };
        self.split_free_rects(&placed);
        self.prune_free_rects();
        self.used_rects.push(placed);

        Some(PackedRect {
            id: rect.id,
            x: best.x,
            y: best.y,
            width: best.width,
            height: best.height,
            rotated: best.rotated,
        })
    }

    fn find_best(&self, width: f64, height: f64, allow_rotation: bool) -> Option<Candidate> {
        let try_rotated = allow_rotation && (width - height).abs() > EPSILON;
        let mut best: Option<Candidate> = None;

        let orientations = [(width, height, false), (height, width, true)];

        for free in &self.free_rects {
            for &(w, h, rotated) in orientations.iter().take(1 + try_rotated as usize) {
                if w > free.width + EPSILON || h > free.height + EPSILON {
                    continue;
                }
                let score = self.score(free, w, h);
                let better = match &best {
                    None => true,
                    Some(current) => compare_scores(score, current.score) == Ordering::Less,
                };
                if better {
                    best = Some(Candidate {
                        x: free.x,
                        y: free.y,
                        width: w,
                        height: h,
                        rotated,
                        score,
                    });
                }
            }
        }

        best
    }

    /// Lower is better.
    fn score(&self, free: &FreeRect, width: f64, height: f64) -> (f64, f64) {
        let leftover_w = free.width - width;
        let leftover_h = free.height - height;
        let short = leftover_w.min(leftover_h);
        let long = leftover_w.max(leftover_h);

        match self.algorithm {
            PackingAlgorithm::BestShortSideFit => (short, long),
            PackingAlgorithm::BestLongSideFit => (long, short),
            PackingAlgorithm::BestAreaFit => (free.area() - width * height, short),
            PackingAlgorithm::BottomLeft => (free.y + height, free.x),
            PackingAlgorithm::ContactPoint => {
                (-self.contact_score(free.x, free.y, width, height), free.y)
            }
        }
    }

    /// Edge length shared with the bin border and already placed rectangles.
    fn contact_score(&self, x: f64, y: f64, width: f64, height: f64) -> f64 {
        let mut contact = 0.0;

        if x.abs() < EPSILON || (x + width - self.width).abs() < EPSILON {
            contact += height;
        }
        if y.abs() < EPSILON || (y + height - self.height).abs() < EPSILON {
            contact += width;
        }

        for used in &self.used_rects {
            if (used.x - (x + width)).abs() < EPSILON || (used.right() - x).abs() < EPSILON {
                contact += overlap_1d(used.y, used.bottom(), y, y + height);
            }
            if (used.y - (y + height)).abs() < EPSILON || (used.bottom() - y).abs() < EPSILON {
                contact += overlap_1d(used.x, used.right(), x, x + width);
            }
        }

        contact
    }

    /// Replaces every free rectangle overlapped by `placed` with up to four
    /// maximal remainders.
    fn split_free_rects(&mut self, placed: &FreeRect) {
        let mut next = Vec::with_capacity(self.free_rects.len() + 4);

        for free in &self.free_rects {
            if !free.intersects(placed) {
                next.push(*free);
                continue;
            }

            if placed.x > free.x + EPSILON {
                next.push(FreeRect {
                    x: free.x,
                    y: free.y,
                    width: placed.x - free.x,
                    height: free.height,
                });
            }
            if placed.right() < free.right() - EPSILON {
                next.push(FreeRect {
                    x: placed.right(),
                    y: free.y,
                    width: free.right() - placed.right(),
                    height: free.height,
                });
            }
            if placed.y > free.y + EPSILON {
                next.push(FreeRect {
                    x: free.x,
                    y: free.y,
                    width: free.width,
                    height: placed.y - free.y,
                });
            }
            if placed.bottom() < free.bottom() - EPSILON {
                next.push(FreeRect {
                    x: free.x,
                    y: placed.bottom(),
                    width: free.width,
                    height: free.bottom() - placed.bottom(),
                });
            }
        }

        self.free_rects = next;
    }

    /// Drops free rectangles contained in another one. Of two identical
    /// rectangles the later survives.
    fn prune_free_rects(&mut self) {
        let n = self.free_rects.len();
        let mut keep = vec![true; n];

        for i in 0..n {
            for j in 0..n {
                if i == j || !keep[j] {
                    continue;
                }
                if self.free_rects[j].contains(&self.free_rects[i]) {
                    keep[i] = false;
                    break;
                }
            }
        }

        let mut idx = 0;
        self.free_rects.retain(|_| {
            let k = keep[idx];
            idx += 1;
            k
        });
    }
}

fn overlap_1d(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> f64 {
    (a_end.min(b_end) - a_start.max(b_start)).max(0.0)
}

fn compare_scores(a: (f64, f64), b: (f64, f64)) -> Ordering {
    a.0.partial_cmp(&b.0)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
}

/// Packs `rects` in the given order into one `width x height` bin.
///
/// Returns one entry per request, in request order: the placement, or `None`
/// when the request did not fit. Requests that do not fit are skipped and
/// packing continues with the next one.
pub fn pack(
    width: f64,
    height: f64,
    rects: &[PackRect],
    allow_rotation: bool,
    algorithm: PackingAlgorithm,
) -> Vec<Option<PackedRect>> {
    let mut bin = MaxRectsBin::new(width, height, algorithm);
    rects
        .iter()
        .map(|rect| bin.insert(*rect, allow_rotation))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(id: usize, width: f64, height: f64) -> PackRect {
        PackRect { id, width, height }
    }

    fn assert_disjoint(placed: &[PackedRect]) {
        for i in 0..placed.len() {
            for j in (i + 1)..placed.len() {
                let a = FreeRect {
                    x: placed[i].x,
                    y: placed[i].y,
                    width: placed[i].width,
                    height: placed[i].height,
                };
                let b = FreeRect {
                    x: placed[j].x,
                    y: placed[j].y,
                    width: placed[j].width,
                    height: placed[j].height,
                };
                assert!(!a.intersects(&b), "{:?} overlaps {:?}", placed[i], placed[j]);
            }
        }
    }

    #[test]
    fn test_place_single_rect() {
        let mut bin = MaxRectsBin::new(100.0, 100.0, PackingAlgorithm::BestAreaFit);
        let p = bin.insert(rect(0, 50.0, 30.0), false).unwrap();
        assert_eq!(p.x, 0.0);
        assert_eq!(p.y, 0.0);
        assert_eq!(p.width, 50.0);
        assert_eq!(p.height, 30.0);
        assert!(!p.rotated);
        assert!(!bin.free_rects.is_empty());
    }

    #[test]
    fn test_rect_too_large() {
        let result = pack(
            100.0,
            100.0,
            &[rect(0, 200.0, 50.0)],
            true,
            PackingAlgorithm::BestShortSideFit,
        );
        assert_eq!(result, vec![None]);
    }

    #[test]
    fn test_rotation_fit() {
        let upright = pack(
            100.0,
            50.0,
            &[rect(0, 50.0, 100.0)],
            false,
            PackingAlgorithm::BestAreaFit,
        );
        assert!(upright[0].is_none());

        let rotated = pack(
            100.0,
            50.0,
            &[rect(0, 50.0, 100.0)],
            true,
            PackingAlgorithm::BestAreaFit,
        );
        let p = rotated[0].unwrap();
        assert!(p.rotated);
        assert_eq!(p.width, 100.0);
        assert_eq!(p.height, 50.0);
    }

    #[test]
    fn test_fill_exact() {
        let mut bin = MaxRectsBin::new(100.0, 100.0, PackingAlgorithm::BestShortSideFit);
        bin.insert(rect(0, 100.0, 100.0), false).unwrap();
        assert!(bin.free_rects.is_empty());
    }

    #[test]
    fn test_every_algorithm_fills_a_grid() {
        for algorithm in PackingAlgorithm::ALL {
            let rects: Vec<PackRect> = (0..4).map(|i| rect(i, 50.0, 50.0)).collect();
            let result = pack(100.0, 100.0, &rects, false, algorithm);
            let placed: Vec<PackedRect> = result.iter().flatten().copied().collect();
            assert_eq!(placed.len(), 4, "{algorithm:?} did not fill the grid");
            assert_disjoint(&placed);
        }
    }

    #[test]
    fn test_unfit_rect_does_not_stop_packing() {
        let rects = vec![rect(0, 80.0, 80.0), rect(1, 80.0, 80.0), rect(2, 20.0, 20.0)];
        let result = pack(100.0, 100.0, &rects, false, PackingAlgorithm::BottomLeft);
        assert!(result[0].is_some());
        assert!(result[1].is_none());
        assert_eq!(result[2].map(|p| p.id), Some(2));
    }

    #[test]
    fn test_free_rects_stay_inside_bin_and_disjoint_from_used() {
        let rects = vec![
            rect(0, 37.0, 21.0),
            rect(1, 12.5, 48.0),
            rect(2, 30.0, 30.0),
            rect(3, 55.0, 9.0),
            rect(4, 18.0, 18.0),
        ];
        let mut bin = MaxRectsBin::new(100.0, 60.0, PackingAlgorithm::ContactPoint);
        for r in rects {
            bin.insert(r, true);
        }

        let border = FreeRect {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 60.0,
        };
        for free in &bin.free_rects {
            assert!(border.contains(free));
            for used in &bin.used_rects {
                assert!(!free.intersects(used));
            }
        }
    }
}
