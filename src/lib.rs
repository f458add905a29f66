//! Ninja Sim - a deterministic tile platformer physics engine
//!
//! Core modules:
//! - `sim`: Deterministic simulation (tile geometry, spatial registry, collisions, actor, entities)
//! - `settings`: Simulation configuration (animation, diagnostic logging)
//!
//! Given N++ style map bytes and one input per frame, the simulation advances
//! the world one tick at a time. Identical maps and inputs always produce
//! bit-identical trajectories.

pub mod settings;
pub mod sim;

pub use settings::{ConfigError, SimConfig};
pub use sim::{MapError, Simulation, TickInput};

use glam::DVec2;

/// Engine configuration constants
pub mod consts {
    /// Side of a tile cell in pixels
    pub const CELL_SIZE: f64 = 24.0;
    /// Side of a half-resolution edge cell in pixels
    pub const HALF_CELL_SIZE: f64 = 12.0;
    /// Map units are stored in bytes of this many pixels
    pub const MAP_UNIT: f64 = 6.0;

    /// Interior tile grid stored in the map (without the border)
    pub const MAP_TILES_WIDTH: usize = 42;
    pub const MAP_TILES_HEIGHT: usize = 23;

    /// Tile cell grid, including the forced full-tile border
    pub const GRID_WIDTH: usize = 44;
    pub const GRID_HEIGHT: usize = 25;

    /// Half-resolution edge grid
    pub const EDGE_GRID_WIDTH: usize = 89;
    pub const EDGE_GRID_HEIGHT: usize = 51;

    /// Segment bucket grid
    pub const SEGMENT_GRID_WIDTH: usize = 45;
    pub const SEGMENT_GRID_HEIGHT: usize = 26;

    /// Highest entity type id the registry keeps a bucket for
    pub const MAX_ENTITY_TYPE: u8 = 28;

    /// Collision resolution passes per tick (fixed, no convergence check)
    pub const COLLISION_PASSES: u32 = 4;
    /// The collision cache is cleared whenever `frame % CACHE_CLEAR_INTERVAL == 0`
    pub const CACHE_CLEAR_INTERVAL: u64 = 100;
}

/// Cell containing a pixel position (unclamped)
#[inline]
pub fn cell_of(pos: DVec2) -> (i32, i32) {
    (
        (pos.x / consts::CELL_SIZE).floor() as i32,
        (pos.y / consts::CELL_SIZE).floor() as i32,
    )
}

/// Tile/entity grid cell containing `pos`, or `None` outside the grid
#[inline]
pub fn grid_cell(pos: DVec2) -> Option<(usize, usize)> {
    let (cx, cy) = cell_of(pos);
    let x = usize::try_from(cx).ok().filter(|&x| x < consts::GRID_WIDTH)?;
    let y = usize::try_from(cy).ok().filter(|&y| y < consts::GRID_HEIGHT)?;
    Some((x, y))
}

/// Clamp a cell to the tile/entity grid
#[inline]
pub fn clamp_cell(x: i32, y: i32) -> (usize, usize) {
    (
        x.clamp(0, consts::GRID_WIDTH as i32 - 1) as usize,
        y.clamp(0, consts::GRID_HEIGHT as i32 - 1) as usize,
    )
}

/// Clamp a cell to the segment grid
#[inline]
pub fn clamp_segment_cell(x: i32, y: i32) -> (usize, usize) {
    (
        x.clamp(0, consts::SEGMENT_GRID_WIDTH as i32 - 1) as usize,
        y.clamp(0, consts::SEGMENT_GRID_HEIGHT as i32 - 1) as usize,
    )
}
