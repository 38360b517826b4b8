// grid.rs — Spatial hash grid over 3D positions.
//
// Cell size = separation radius → a query touches at most 3×3×3 = 27 cells.
// Hash: Fibonacci hashing (Knuth).  Unbounded space, fixed table.
// Rebuild: one O(N) counting pass plus one scatter pass, no sort.

use glam::Vec3;

/// Maximum number of cells a radius query can cover (r <= cell_size).
const MAX_QUERY_CELLS: usize = 27;

/// Spatial hash grid.  Rebuild every tick before neighborhood queries.
pub struct SpatialHashGrid {
    /// Flattened bucket list: each bucket is a contiguous run in `data`.
    counts: Vec<u32>,  // [table_size]  agents per bucket
    offsets: Vec<u32>, // [table_size]  start of each bucket in `data`
    data: Vec<u32>,    // [N]           agent indices, packed in index order
    table_size: usize, // power of two
    mask: usize,
    pub cell_size: f32,
}

impl SpatialHashGrid {
    /// Table is sized to ≥ 2× the agent count for a low collision rate.
    pub fn new(expected_agents: usize, cell_size: f32) -> Self {
        let table_size = (expected_agents * 2).next_power_of_two().max(64);
        SpatialHashGrid {
            counts: vec![0u32; table_size],
            offsets: vec![0u32; table_size],
            data: Vec::new(),
            table_size,
            mask: table_size - 1,
            cell_size,
        }
    }

    #[inline(always)]
    fn hash(&self, cell: (i32, i32, i32)) -> usize {
        let key = (cell.0 as u64).wrapping_mul(2654435761)
            ^ (cell.1 as u64).wrapping_mul(2246822519)
            ^ (cell.2 as u64).wrapping_mul(3266489917);
        (key.wrapping_mul(11400714819323198485) >> (64 - self.table_size.trailing_zeros())) as usize
            & self.mask
    }

    #[inline(always)]
    pub fn world_to_cell(&self, p: Vec3) -> (i32, i32, i32) {
        let c = (p / self.cell_size).floor();
        (c.x as i32, c.y as i32, c.z as i32)
    }

    /// Full O(N) rebuild.  Two-pass (count then scatter); bucket contents
    /// keep ascending agent order so queries visit neighbors deterministically.
    pub fn rebuild(&mut self, positions: &[Vec3]) {
        let n = positions.len();
        if self.data.len() < n {
            self.data.resize(n, 0);
        }

        // ── Pass 1: count ────────────────────────────────────────────────────
        self.counts.iter_mut().for_each(|c| *c = 0);
        for p in positions {
            let h = self.hash(self.world_to_cell(*p));
            self.counts[h] += 1;
        }

        // ── Prefix sum → offsets ─────────────────────────────────────────────
        let mut running = 0u32;
        for h in 0..self.table_size {
            self.offsets[h] = running;
            running += self.counts[h];
        }

        // ── Pass 2: scatter ──────────────────────────────────────────────────
        self.counts.iter_mut().for_each(|c| *c = 0); // reuse as cursor
        for (i, p) in positions.iter().enumerate() {
            let h = self.hash(self.world_to_cell(*p));
            let slot = (self.offsets[h] + self.counts[h]) as usize;
            self.data[slot] = i as u32;
            self.counts[h] += 1;
        }
    }

    /// Visit every candidate within radius `r` (≤ `cell_size`) of `q`.
    ///
    /// Each bucket is visited once even when several of the 27 cells hash to
    /// it, so no candidate is reported twice.  Callers MUST still perform the
    /// exact distance check; the grid only filters candidates.
    #[inline]
    pub fn query_radius<F>(&self, q: Vec3, r: f32, mut callback: F)
    where
        F: FnMut(u32),
    {
        debug_assert!(r <= self.cell_size, "query radius exceeds cell size");
        let (qx, qy, qz) = self.world_to_cell(q);

        let mut visited = [usize::MAX; MAX_QUERY_CELLS];
        let mut n_visited = 0usize;

        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let h = self.hash((qx.wrapping_add(dx), qy.wrapping_add(dy), qz.wrapping_add(dz)));
                    if visited[..n_visited].contains(&h) {
                        continue;
                    }
                    visited[n_visited] = h;
                    n_visited += 1;

                    let start = self.offsets[h] as usize;
                    let end = start + self.counts[h] as usize;
                    for &idx in &self.data[start..end] {
                        callback(idx);
                    }
                }
            }
        }
    }

    /// Same as `query_radius` but skips `self_idx`.
    #[inline]
    pub fn query_neighbors<F>(&self, self_idx: u32, q: Vec3, r: f32, mut callback: F)
    where
        F: FnMut(u32),
    {
        self.query_radius(q, r, |idx| {
            if idx != self_idx {
                callback(idx)
            }
        });
    }
}
