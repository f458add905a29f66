//! Tile geometry extraction
//!
//! Turns the tile-id grid into collision segments. Each tile adds its parity
//! and strength contributions to the half-resolution edge grids; a non-zero
//! accumulated strength becomes one straight segment. Neighbouring solids
//! cancel on their shared edge, so only exposed boundaries are materialized.

use glam::DVec2;

use super::grid::SpatialRegistry;
use super::segment::Segment;
use super::tables::{TILE_FULL, arc_shape, diagonal_shape, edge_contributions};
use crate::clamp_segment_cell;
use crate::consts::{
    CELL_SIZE, EDGE_GRID_HEIGHT, EDGE_GRID_WIDTH, GRID_HEIGHT, GRID_WIDTH, HALF_CELL_SIZE,
    MAP_TILES_WIDTH,
};

/// Tile ids plus the edge grids derived from them
#[derive(Debug, Clone)]
pub struct TileGeometry {
    tiles: Vec<u8>,
    hor_edges: Vec<u8>,
    ver_edges: Vec<u8>,
    hor_strength: Vec<i32>,
    ver_strength: Vec<i32>,
}

impl Default for TileGeometry {
    fn default() -> Self {
        Self::empty()
    }
}

impl TileGeometry {
    /// No tiles at all; only the outer frame edges are set
    pub fn empty() -> Self {
        let mut hor_edges = vec![0; EDGE_GRID_WIDTH * EDGE_GRID_HEIGHT];
        let mut ver_edges = vec![0; EDGE_GRID_WIDTH * EDGE_GRID_HEIGHT];
        for y in 0..EDGE_GRID_HEIGHT {
            for x in 0..EDGE_GRID_WIDTH {
                let idx = y * EDGE_GRID_WIDTH + x;
                if y == 0 || y == EDGE_GRID_HEIGHT - 1 {
                    hor_edges[idx] = 1;
                }
                if x == 0 || x == EDGE_GRID_WIDTH - 1 {
                    ver_edges[idx] = 1;
                }
            }
        }
        Self {
            tiles: vec![0; GRID_WIDTH * GRID_HEIGHT],
            hor_edges,
            ver_edges,
            hor_strength: vec![0; EDGE_GRID_WIDTH * EDGE_GRID_HEIGHT],
            ver_strength: vec![0; EDGE_GRID_WIDTH * EDGE_GRID_HEIGHT],
        }
    }

    /// Build the edge grids from the 42x23 interior tile ids (row-major).
    /// Missing trailing ids read as empty; the one-cell border is forced full.
    pub fn from_tiles(interior: &[u8]) -> Self {
        let mut geometry = Self::empty();
        for y in 0..GRID_HEIGHT {
            for x in 0..GRID_WIDTH {
                let border = x == 0 || y == 0 || x == GRID_WIDTH - 1 || y == GRID_HEIGHT - 1;
                let id = if border {
                    TILE_FULL
                } else {
                    interior
                        .get((x - 1) + (y - 1) * MAP_TILES_WIDTH)
                        .copied()
                        .unwrap_or(0)
                };
                geometry.tiles[y * GRID_WIDTH + x] = id;
            }
        }

        let mut unknown = 0usize;
        for x in 0..GRID_WIDTH {
            for y in 0..GRID_HEIGHT {
                let id = geometry.tiles[y * GRID_WIDTH + x];
                match edge_contributions(id) {
                    Some((edges, ortho)) => geometry.accumulate(x, y, edges, ortho),
                    None => unknown += 1,
                }
            }
        }
        if unknown > 0 {
            log::debug!("Ignored {unknown} tiles with unknown ids");
        }
        geometry
    }

    fn accumulate(&mut self, x: usize, y: usize, edges: &[u8; 12], ortho: &[i8; 12]) {
        // Horizontal edges: 2 wide, 3 tall
        for j in 0..3 {
            for i in 0..2 {
                let idx = Self::edge_index(2 * x + i, 2 * y + j);
                self.hor_edges[idx] = (self.hor_edges[idx] + edges[2 * j + i]) % 2;
                self.hor_strength[idx] += ortho[2 * j + i] as i32;
            }
        }
        // Vertical edges: 3 wide, 2 tall
        for i in 0..3 {
            for j in 0..2 {
                let idx = Self::edge_index(2 * x + i, 2 * y + j);
                self.ver_edges[idx] = (self.ver_edges[idx] + edges[6 + 2 * i + j]) % 2;
                self.ver_strength[idx] += ortho[6 + 2 * i + j] as i32;
            }
        }
    }

    #[inline]
    fn edge_index(x: usize, y: usize) -> usize {
        assert!(
            x < EDGE_GRID_WIDTH && y < EDGE_GRID_HEIGHT,
            "edge cell ({x}, {y}) outside {EDGE_GRID_WIDTH}x{EDGE_GRID_HEIGHT} grid"
        );
        y * EDGE_GRID_WIDTH + x
    }

    /// Tile id of a cell, border included
    pub fn tile(&self, x: usize, y: usize) -> u8 {
        assert!(x < GRID_WIDTH && y < GRID_HEIGHT, "tile cell ({x}, {y}) outside grid");
        self.tiles[y * GRID_WIDTH + x]
    }

    pub fn hor_edge(&self, x: usize, y: usize) -> u8 {
        self.hor_edges[Self::edge_index(x, y)]
    }

    pub fn ver_edge(&self, x: usize, y: usize) -> u8 {
        self.ver_edges[Self::edge_index(x, y)]
    }

    pub fn hor_strength(&self, x: usize, y: usize) -> i32 {
        self.hor_strength[Self::edge_index(x, y)]
    }

    pub fn ver_strength(&self, x: usize, y: usize) -> i32 {
        self.ver_strength[Self::edge_index(x, y)]
    }

    /// Push every tile segment into the registry and return how many were added.
    ///
    /// Slopes and arcs go to their own tile's cell first, then the straight
    /// boundaries in row-major half-cell order.
    pub fn register_segments(&self, registry: &mut SpatialRegistry) -> usize {
        let before = registry.segment_count();

        for x in 0..GRID_WIDTH {
            for y in 0..GRID_HEIGHT {
                let id = self.tiles[y * GRID_WIDTH + x];
                let origin = DVec2::new(x as f64, y as f64) * CELL_SIZE;
                if let Some(((ax, ay), (bx, by))) = diagonal_shape(id) {
                    let a = origin + DVec2::new(ax as f64, ay as f64);
                    let b = origin + DVec2::new(bx as f64, by as f64);
                    registry.add_segment((x, y), Segment::linear(a, b));
                }
                if let Some(((cx, cy), (qx, qy), convex)) = arc_shape(id) {
                    let center = origin + DVec2::new(cx as f64, cy as f64);
                    let quadrant = DVec2::new(qx as f64, qy as f64);
                    registry.add_segment((x, y), Segment::arc(center, quadrant, convex));
                }
            }
        }

        for y in 0..EDGE_GRID_HEIGHT {
            for x in 0..EDGE_GRID_WIDTH {
                let s = self.hor_strength(x, y);
                if s != 0 {
                    let mut a = DVec2::new(x as f64, y as f64) * HALF_CELL_SIZE;
                    let mut b = a + DVec2::new(HALF_CELL_SIZE, 0.0);
                    if s == -1 {
                        std::mem::swap(&mut a, &mut b);
                    }
                    let cell = clamp_segment_cell(
                        (x as f64 / 2.0).floor() as i32,
                        ((y as f64 - 0.1 * s as f64) / 2.0).floor() as i32,
                    );
                    registry.add_segment(cell, Segment::linear(a, b));
                }
            }
        }

        for y in 0..EDGE_GRID_HEIGHT {
            for x in 0..EDGE_GRID_WIDTH {
                let s = self.ver_strength(x, y);
                if s != 0 {
                    let mut a = DVec2::new(x as f64, y as f64 + 1.0) * HALF_CELL_SIZE;
                    let mut b = DVec2::new(x as f64, y as f64) * HALF_CELL_SIZE;
                    if s == -1 {
                        std::mem::swap(&mut a, &mut b);
                    }
                    let cell = clamp_segment_cell(
                        ((x as f64 - 0.1 * s as f64) / 2.0).floor() as i32,
                        (y as f64 / 2.0).floor() as i32,
                    );
                    registry.add_segment(cell, Segment::linear(a, b));
                }
            }
        }

        registry.segment_count() - before
    }
}
