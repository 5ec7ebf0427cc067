//! Uniform spatial hash over 2D space.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::aabb::Aabb;
use crate::types::ColliderId;

/// Sparse uniform grid. Buckets are keyed by integer cell coordinates and a
/// collider occupies every cell its AABB touches, so membership updates are
/// proportional to the covered area, not the world size.
pub struct SpatialGrid {
    cell_size: f64,
    cells: FxHashMap<(i32, i32), FxHashSet<ColliderId>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            // f64::max is NaN-safe here: NaN.max(x) == x.
            cell_size: cell_size.max(1e-3),
            cells: FxHashMap::default(),
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Inclusive cell range covered by an AABB.
    pub fn cell_range(&self, aabb: &Aabb) -> (i32, i32, i32, i32) {
        let cs = self.cell_size;
        let ix0 = (aabb.min.x / cs).floor() as i32;
        let iy0 = (aabb.min.y / cs).floor() as i32;
        let ix1 = (aabb.max.x / cs).floor() as i32;
        let iy1 = (aabb.max.y / cs).floor() as i32;
        (ix0, iy0, ix1, iy1)
    }

    pub fn insert(&mut self, id: ColliderId, aabb: &Aabb) {
        let (ix0, iy0, ix1, iy1) = self.cell_range(aabb);
        for iy in iy0..=iy1 {
            for ix in ix0..=ix1 {
                self.cells.entry((ix, iy)).or_default().insert(id);
            }
        }
    }

    /// Remove `id` from every cell covered by `aabb` (the box it was indexed
    /// under). Emptied buckets are dropped so stats stay meaningful.
    pub fn remove(&mut self, id: ColliderId, aabb: &Aabb) {
        let (ix0, iy0, ix1, iy1) = self.cell_range(aabb);
        for iy in iy0..=iy1 {
            for ix in ix0..=ix1 {
                if let Some(bucket) = self.cells.get_mut(&(ix, iy)) {
                    bucket.remove(&id);
                    if bucket.is_empty() {
                        self.cells.remove(&(ix, iy));
                    }
                }
            }
        }
    }

    /// Re-index a collider whose AABB moved. No-op when the covered cell
    /// range is unchanged, which is the common case for bodies moving less
    /// than a cell per tick.
    pub fn update(&mut self, id: ColliderId, old: &Aabb, new: &Aabb) {
        if self.cell_range(old) == self.cell_range(new) {
            return;
        }
        self.remove(id, old);
        self.insert(id, new);
    }

    /// Ids present in any cell the region touches, deduplicated and sorted
    /// ascending so iteration order never depends on hash state.
    pub fn query_region(&self, region: &Aabb) -> Vec<ColliderId> {
        let mut out = Vec::new();
        self.query_region_into(region, &mut out);
        out
    }

    /// Allocation-reusing variant of `query_region`.
    pub fn query_region_into(&self, region: &Aabb, out: &mut Vec<ColliderId>) {
        out.clear();
        let (ix0, iy0, ix1, iy1) = self.cell_range(region);
        for iy in iy0..=iy1 {
            for ix in ix0..=ix1 {
                if let Some(bucket) = self.cells.get(&(ix, iy)) {
                    out.extend(bucket.iter().copied());
                }
            }
        }
        out.sort_unstable();
        out.dedup();
    }

    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn largest_bucket(&self) -> usize {
        self.cells.values().map(|b| b.len()).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    fn unit_grid() -> SpatialGrid {
        SpatialGrid::new(1.0)
    }

    #[test]
    fn test_straddling_box_covers_four_cells() {
        let mut g = unit_grid();
        let b = Aabb::new(DVec2::new(-0.5, -0.5), DVec2::new(0.5, 0.5));
        g.insert(ColliderId(1), &b);
        assert_eq!(g.occupied_cells(), 4);
        assert_eq!(g.query_region(&b), vec![ColliderId(1)]);
    }

    #[test]
    fn test_query_is_sorted_and_deduplicated() {
        let mut g = unit_grid();
        let big = Aabb::new(DVec2::new(0.1, 0.1), DVec2::new(2.9, 0.9));
        let small = Aabb::new(DVec2::new(1.2, 0.2), DVec2::new(1.8, 0.8));
        g.insert(ColliderId(9), &big);
        g.insert(ColliderId(2), &small);
        // Region spanning all three of big's cells sees big once, small once.
        let hits = g.query_region(&Aabb::new(DVec2::ZERO, DVec2::new(3.0, 1.0)));
        assert_eq!(hits, vec![ColliderId(2), ColliderId(9)]);
    }

    #[test]
    fn test_remove_drops_empty_buckets() {
        let mut g = unit_grid();
        let b = Aabb::new(DVec2::new(0.1, 0.1), DVec2::new(1.9, 1.9));
        g.insert(ColliderId(4), &b);
        assert_eq!(g.occupied_cells(), 4);
        g.remove(ColliderId(4), &b);
        assert_eq!(g.occupied_cells(), 0);
        assert!(g.query_region(&b).is_empty());
    }

    #[test]
    fn test_update_within_same_cells_is_a_noop() {
        let mut g = unit_grid();
        let old = Aabb::new(DVec2::new(0.1, 0.1), DVec2::new(0.4, 0.4));
        let new = old.translated(DVec2::new(0.2, 0.2));
        g.insert(ColliderId(1), &old);
        g.update(ColliderId(1), &old, &new);
        assert_eq!(g.occupied_cells(), 1);
        assert_eq!(g.query_region(&new), vec![ColliderId(1)]);
    }

    #[test]
    fn test_update_across_cells_reindexes() {
        let mut g = unit_grid();
        let old = Aabb::new(DVec2::new(0.1, 0.1), DVec2::new(0.4, 0.4));
        let new = old.translated(DVec2::new(5.0, 0.0));
        g.insert(ColliderId(1), &old);
        g.update(ColliderId(1), &old, &new);
        assert!(g.query_region(&old).is_empty());
        assert_eq!(g.query_region(&new), vec![ColliderId(1)]);
        assert_eq!(g.occupied_cells(), 1);
    }

    #[test]
    fn test_largest_bucket_counts_shared_cells() {
        let mut g = unit_grid();
        let cell = Aabb::new(DVec2::new(0.2, 0.2), DVec2::new(0.8, 0.8));
        for i in 0..5 {
            g.insert(ColliderId(i), &cell);
        }
        assert_eq!(g.largest_bucket(), 5);
        assert_eq!(g.occupied_cells(), 1);
    }
}
