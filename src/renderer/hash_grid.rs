//! Spatial hash grid over photon positions supporting fixed-radius
//! range queries. Cells are sized to twice the query radius so any
//! query sphere is covered by a 2x2x2 block of cells. Built once per
//! pass with a counting sort, queried from every camera vertex.

use glam::Vec3;

#[derive(Default)]
pub struct HashGrid {
    inv_cell_size: f32,
    radius: f32,
    radius_sqr: f32,
    /// Exclusive prefix layout: bucket `h` occupies
    /// `indices[cell_starts[h]..cell_starts[h + 1]]`.
    cell_starts: Vec<u32>,
    indices: Vec<u32>,
    table_size: usize,
}

impl HashGrid {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell_hash(&self, x: i32, y: i32, z: i32) -> usize {
        let h = (x.wrapping_mul(73_856_093))
            ^ (y.wrapping_mul(19_349_663))
            ^ (z.wrapping_mul(83_492_791));
        (h as u32 as usize) % self.table_size
    }

    fn cell_of(&self, p: Vec3) -> (i32, i32, i32) {
        (
            (p.x * self.inv_cell_size).floor() as i32,
            (p.y * self.inv_cell_size).floor() as i32,
            (p.z * self.inv_cell_size).floor() as i32,
        )
    }

    /// Rebuild the grid over the given positions for queries of the
    /// given radius.
    pub fn build(&mut self, positions: &[Vec3], radius: f32) {
        self.radius = radius;
        self.radius_sqr = radius * radius;
        self.inv_cell_size = 1.0 / (2.0 * radius);
        self.table_size = positions.len().max(1);

        self.cell_starts.clear();
        self.cell_starts.resize(self.table_size + 1, 0);
        self.indices.clear();
        self.indices.resize(positions.len(), 0);

        // counting sort: count, exclusive prefix, place
        for p in positions {
            let (x, y, z) = self.cell_of(*p);
            let h = self.cell_hash(x, y, z);
            self.cell_starts[h + 1] += 1;
        }
        for h in 1..self.cell_starts.len() {
            self.cell_starts[h] += self.cell_starts[h - 1];
        }
        let mut cursor = self.cell_starts.clone();
        for (i, p) in positions.iter().enumerate() {
            let (x, y, z) = self.cell_of(*p);
            let h = self.cell_hash(x, y, z);
            self.indices[cursor[h] as usize] = i as u32;
            cursor[h] += 1;
        }
    }

    /// Visit every stored index within `radius` of `query`.
    pub fn for_each_in_radius<F: FnMut(u32)>(&self, positions: &[Vec3], query: Vec3, mut visit: F) {
        if self.indices.is_empty() {
            return;
        }

        // gather the up-to-8 bucket hashes, deduplicated so colliding
        // neighbor cells are not visited twice
        let min_cell = self.cell_of(query - Vec3::splat(self.radius));
        let mut buckets = [0usize; 8];
        let mut num_buckets = 0;
        for dx in 0..2 {
            for dy in 0..2 {
                for dz in 0..2 {
                    let h = self.cell_hash(min_cell.0 + dx, min_cell.1 + dy, min_cell.2 + dz);
                    if !buckets[..num_buckets].contains(&h) {
                        buckets[num_buckets] = h;
                        num_buckets += 1;
                    }
                }
            }
        }

        for &h in &buckets[..num_buckets] {
            let start = self.cell_starts[h] as usize;
            let end = self.cell_starts[h + 1] as usize;
            for &index in &self.indices[start..end] {
                let d = positions[index as usize] - query;
                if d.length_squared() <= self.radius_sqr {
                    visit(index);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, XorShiftRng};

    fn random_points(n: usize, seed: [u32; 4]) -> Vec<Vec3> {
        let mut rng = XorShiftRng::from_seed(seed);
        (0..n)
            .map(|_| {
                Vec3::new(
                    rng.next_f32() * 4.0 - 2.0,
                    rng.next_f32() * 4.0 - 2.0,
                    rng.next_f32() * 4.0 - 2.0,
                )
            })
            .collect()
    }

    #[test]
    fn range_query_matches_brute_force() {
        let points = random_points(500, [101, 102, 103, 104]);
        let radius = 0.25;
        let mut grid = HashGrid::new();
        grid.build(&points, radius);

        let queries = random_points(50, [7, 8, 9, 10]);
        for q in queries {
            let mut found = Vec::new();
            grid.for_each_in_radius(&points, q, |i| found.push(i));
            found.sort_unstable();

            let expected: Vec<u32> = points
                .iter()
                .enumerate()
                .filter(|(_, p)| (**p - q).length_squared() <= radius * radius)
                .map(|(i, _)| i as u32)
                .collect();
            assert_eq!(found, expected, "query at {:?}", q);
        }
    }

    #[test]
    fn empty_grid_visits_nothing() {
        let mut grid = HashGrid::new();
        grid.build(&[], 0.1);
        let mut count = 0;
        grid.for_each_in_radius(&[], Vec3::ZERO, |_| count += 1);
        assert_eq!(count, 0);
    }
}
