//! Cell mesh with periodic-X topology and CSR adjacency.
//!
//! The mesh is an external, immutable input: an irregular (Voronoi-like)
//! tessellation flattened into parallel arrays, with neighbor adjacency in
//! compressed sparse row form. All tectonic fields are defined per cell over
//! this structure. The mesh is periodic in X with period `wrap_width`; Y does
//! not wrap.

use glam::Vec2;

use crate::constants::EPS_LEN;

/// An immutable cell mesh: site positions, cell areas, and CSR adjacency.
///
/// Adjacency is expected to be symmetric (if B is a neighbor of A, A is a
/// neighbor of B); construction asserts array shapes but trusts the producer
/// for symmetry.
pub struct NeighborhoodMesh {
    /// Number of cells.
    pub cell_count: usize,

    /// Site X coordinate per cell, periodic with `wrap_width`.
    pub site_x: Vec<f32>,

    /// Site Y coordinate per cell (not periodic).
    pub site_y: Vec<f32>,

    /// Period of the X axis.
    pub wrap_width: f32,

    /// Cell area per cell.
    pub areas: Vec<f32>,

    /// CSR offsets into `neighbors`, length `cell_count + 1`.
    pub neighbor_offsets: Vec<u32>,

    /// Flattened neighbor cell ids.
    pub neighbors: Vec<u32>,

    /// Mean neighbor-to-neighbor distance, computed once at construction.
    /// Authored decay radii are expressed in multiples of this, so they stay
    /// comparable across mesh resolutions.
    mean_edge: f32,
}

impl NeighborhoodMesh {
    /// Build a mesh from externally produced parts.
    pub fn from_parts(
        site_x: Vec<f32>,
        site_y: Vec<f32>,
        wrap_width: f32,
        areas: Vec<f32>,
        neighbor_offsets: Vec<u32>,
        neighbors: Vec<u32>,
    ) -> Self {
        let cell_count = site_x.len();
        assert_eq!(site_y.len(), cell_count);
        assert_eq!(areas.len(), cell_count);
        assert_eq!(neighbor_offsets.len(), cell_count + 1);
        assert_eq!(neighbor_offsets[cell_count] as usize, neighbors.len());

        let mut mesh = Self {
            cell_count,
            site_x,
            site_y,
            wrap_width,
            areas,
            neighbor_offsets,
            neighbors,
            mean_edge: 1.0,
        };
        mesh.mean_edge = mesh.compute_mean_edge_length();
        mesh
    }

    /// Get the neighbors of a cell.
    pub fn neighbors(&self, cell: usize) -> &[u32] {
        let lo = self.neighbor_offsets[cell] as usize;
        let hi = self.neighbor_offsets[cell + 1] as usize;
        &self.neighbors[lo..hi]
    }

    /// Site position of a cell.
    pub fn site(&self, cell: usize) -> Vec2 {
        Vec2::new(self.site_x[cell], self.site_y[cell])
    }

    /// Area of a cell.
    pub fn area(&self, cell: usize) -> f32 {
        self.areas[cell]
    }

    /// Shortest signed X difference under periodic wrap.
    pub fn wrap_dx(&self, dx: f32) -> f32 {
        if self.wrap_width <= 0.0 {
            return dx;
        }
        let half = 0.5 * self.wrap_width;
        let mut d = dx % self.wrap_width;
        if d > half {
            d -= self.wrap_width;
        } else if d < -half {
            d += self.wrap_width;
        }
        d
    }

    /// Shortest displacement from one cell's site to another's, with the X
    /// component wrap-corrected.
    pub fn delta(&self, from: usize, to: usize) -> Vec2 {
        Vec2::new(
            self.wrap_dx(self.site_x[to] - self.site_x[from]),
            self.site_y[to] - self.site_y[from],
        )
    }

    /// Mean edge length over the whole mesh.
    pub fn mean_edge_length(&self) -> f32 {
        self.mean_edge
    }

    /// Number of neighbors of `cell` assigned to a different plate.
    pub fn boundary_degree(&self, cell: usize, cell_plate: &[u16]) -> u32 {
        let plate = cell_plate[cell];
        self.neighbors(cell)
            .iter()
            .filter(|&&nb| (nb as usize) < self.cell_count && cell_plate[nb as usize] != plate)
            .count() as u32
    }

    fn compute_mean_edge_length(&self) -> f32 {
        let mut total = 0.0f64;
        let mut count = 0usize;

        for i in 0..self.cell_count {
            for &j in self.neighbors(i) {
                let j = j as usize;
                if j > i && j < self.cell_count {
                    total += self.delta(i, j).length() as f64;
                    count += 1;
                }
            }
        }

        if count > 0 {
            ((total / count as f64) as f32).max(EPS_LEN)
        } else {
            1.0
        }
    }

    /// Regular periodic grid: `cols × rows` unit cells, X wrapping, 4-connected.
    ///
    /// The production mesh is an irregular tessellation supplied by the mesh
    /// builder; this constructor exists for tests and examples that need a
    /// predictable topology.
    pub fn grid(cols: usize, rows: usize, spacing: f32) -> Self {
        let cell_count = cols * rows;
        let mut site_x = Vec::with_capacity(cell_count);
        let mut site_y = Vec::with_capacity(cell_count);
        let mut areas = Vec::with_capacity(cell_count);
        let mut neighbor_offsets = Vec::with_capacity(cell_count + 1);
        let mut neighbors = Vec::with_capacity(cell_count * 4);

        neighbor_offsets.push(0u32);
        for r in 0..rows {
            for c in 0..cols {
                site_x.push((c as f32 + 0.5) * spacing);
                site_y.push((r as f32 + 0.5) * spacing);
                areas.push(spacing * spacing);

                let left = (c + cols - 1) % cols + r * cols;
                let right = (c + 1) % cols + r * cols;
                neighbors.push(left as u32);
                neighbors.push(right as u32);
                if r > 0 {
                    neighbors.push((c + (r - 1) * cols) as u32);
                }
                if r + 1 < rows {
                    neighbors.push((c + (r + 1) * cols) as u32);
                }
                neighbor_offsets.push(neighbors.len() as u32);
            }
        }

        Self::from_parts(
            site_x,
            site_y,
            cols as f32 * spacing,
            areas,
            neighbor_offsets,
            neighbors,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_adjacency_is_symmetric() {
        let mesh = NeighborhoodMesh::grid(8, 6, 1.0);

        for a in 0..mesh.cell_count {
            for &b in mesh.neighbors(a) {
                let back = mesh.neighbors(b as usize);
                assert!(
                    back.contains(&(a as u32)),
                    "cell {b} does not list {a} back"
                );
            }
        }
    }

    #[test]
    fn wrap_dx_picks_shortest_arc() {
        let mesh = NeighborhoodMesh::grid(10, 4, 1.0);
        // wrap_width = 10
        assert!((mesh.wrap_dx(9.0) - (-1.0)).abs() < 1e-6);
        assert!((mesh.wrap_dx(-9.0) - 1.0).abs() < 1e-6);
        assert!((mesh.wrap_dx(3.0) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn delta_crosses_the_seam() {
        let mesh = NeighborhoodMesh::grid(10, 4, 1.0);
        // Cells 0 and 9 are on the same row at opposite ends of the seam.
        let d = mesh.delta(0, 9);
        assert!((d.x - (-1.0)).abs() < 1e-6);
        assert!(d.y.abs() < 1e-6);
    }

    #[test]
    fn mean_edge_length_matches_spacing() {
        let mesh = NeighborhoodMesh::grid(12, 8, 2.5);
        assert!((mesh.mean_edge_length() - 2.5).abs() < 1e-4);
    }
}
