//! Tile shape tables
//!
//! Every tile id in `0..TILE_COUNT` selects one fixed shape. The 12-entry
//! contribution vectors cover the tile's half-resolution sub positions:
//! entries `0..6` are the 2x3 horizontal edges (index `2 * row + col`),
//! entries `6..12` are the 3x2 vertical edges (index `6 + 2 * col + row`).

/// Number of known tile shapes
pub const TILE_COUNT: usize = 38;

/// Tile id used for the forced map border
pub const TILE_FULL: u8 = 1;

/// Edge parity contribution (0 or 1) per sub position
pub const TILE_GRID_EDGE: [[u8; 12]; TILE_COUNT] = [
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0], // empty
    [1, 1, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1], // full
    [1, 1, 1, 1, 0, 0, 1, 0, 0, 0, 1, 0], // half tiles
    [0, 1, 0, 0, 0, 1, 0, 0, 1, 1, 1, 1],
    [0, 0, 1, 1, 1, 1, 0, 1, 0, 0, 0, 1],
    [1, 0, 0, 0, 1, 0, 1, 1, 1, 1, 0, 0],
    [1, 1, 0, 1, 1, 0, 1, 1, 0, 1, 1, 0], // 45 degree slopes
    [1, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 1],
    [0, 1, 1, 0, 1, 1, 0, 1, 1, 0, 1, 1],
    [1, 0, 0, 1, 1, 1, 1, 1, 1, 0, 0, 1],
    [1, 1, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1], // quarter moons
    [1, 1, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1],
    [1, 1, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1],
    [1, 1, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1],
    [1, 1, 0, 1, 1, 0, 1, 1, 0, 1, 1, 0], // quarter pipes
    [1, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 1],
    [0, 1, 1, 0, 1, 1, 0, 1, 1, 0, 1, 1],
    [1, 0, 0, 1, 1, 1, 1, 1, 1, 0, 0, 1],
    [1, 1, 1, 1, 0, 0, 1, 0, 0, 0, 1, 0], // short mild slopes
    [1, 1, 1, 1, 0, 0, 1, 0, 0, 0, 1, 0],
    [0, 0, 1, 1, 1, 1, 0, 1, 0, 0, 0, 1],
    [0, 0, 1, 1, 1, 1, 0, 1, 0, 0, 0, 1],
    [1, 1, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1], // raised mild slopes
    [1, 1, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1],
    [1, 1, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1],
    [1, 1, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1],
    [1, 0, 0, 0, 1, 0, 1, 1, 1, 1, 0, 0], // short steep slopes
    [0, 1, 0, 0, 0, 1, 0, 0, 1, 1, 1, 1],
    [0, 1, 0, 0, 0, 1, 0, 0, 1, 1, 1, 1],
    [1, 0, 0, 0, 1, 0, 1, 1, 1, 1, 0, 0],
    [1, 1, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1], // raised steep slopes
    [1, 1, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1],
    [1, 1, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1],
    [1, 1, 0, 0, 1, 1, 1, 1, 0, 0, 1, 1],
    [1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0], // glitched tiles
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1],
    [0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0],
];

/// Boundary strength contribution per sub position.
///
/// -1 marks an edge with solid on its far side (bottom/right), 1 an edge
/// with solid on its near side. Two solids sharing an edge cancel to 0.
pub const TILE_SEGMENT_ORTHO: [[i8; 12]; TILE_COUNT] = [
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0], // empty
    [-1, -1, 0, 0, 1, 1, -1, -1, 0, 0, 1, 1], // full
    [-1, -1, 1, 1, 0, 0, -1, 0, 0, 0, 1, 0], // half tiles
    [0, -1, 0, 0, 0, 1, 0, 0, -1, -1, 1, 1],
    [0, 0, -1, -1, 1, 1, 0, -1, 0, 0, 0, 1],
    [-1, 0, 0, 0, 1, 0, -1, -1, 1, 1, 0, 0],
    [-1, -1, 0, 0, 0, 0, -1, -1, 0, 0, 0, 0], // 45 degree slopes
    [-1, -1, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1],
    [0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 1, 1],
    [0, 0, 0, 0, 1, 1, -1, -1, 0, 0, 0, 0],
    [-1, -1, 0, 0, 0, 0, -1, -1, 0, 0, 0, 0], // quarter moons
    [-1, -1, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1],
    [0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 1, 1],
    [0, 0, 0, 0, 1, 1, -1, -1, 0, 0, 0, 0],
    [-1, -1, 0, 0, 0, 0, -1, -1, 0, 0, 0, 0], // quarter pipes
    [-1, -1, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1],
    [0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 1, 1],
    [0, 0, 0, 0, 1, 1, -1, -1, 0, 0, 0, 0],
    [-1, -1, 0, 0, 0, 0, -1, 0, 0, 0, 0, 0], // short mild slopes
    [-1, -1, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0],
    [0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 1],
    [0, 0, 0, 0, 1, 1, 0, -1, 0, 0, 0, 0],
    [-1, -1, 0, 0, 0, 0, -1, -1, 0, 0, 1, 0], // raised mild slopes
    [-1, -1, 0, 0, 0, 0, -1, 0, 0, 0, 1, 1],
    [0, 0, 0, 0, 1, 1, 0, -1, 0, 0, 1, 1],
    [0, 0, 0, 0, 1, 1, -1, -1, 0, 0, 0, 1],
    [-1, 0, 0, 0, 0, 0, -1, -1, 0, 0, 0, 0], // short steep slopes
    [0, -1, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1],
    [0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 1],
    [0, 0, 0, 0, 1, 0, -1, -1, 0, 0, 0, 0],
    [-1, -1, 0, 0, 1, 0, -1, -1, 0, 0, 0, 0], // raised steep slopes
    [-1, -1, 0, 0, 0, 1, 0, 0, 0, 0, 1, 1],
    [0, -1, 0, 0, 1, 1, 0, 0, 0, 0, 1, 1],
    [-1, 0, 0, 0, 1, 1, -1, -1, 0, 0, 0, 0],
    [-1, -1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0], // glitched tiles
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1],
    [0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, -1, -1, 0, 0, 0, 0],
];

/// Diagonal segment endpoints in tile-local pixels
pub type DiagShape = ((i32, i32), (i32, i32));

/// Quarter-circle arc: tile-local center, quadrant direction, convex
pub type ArcShape = ((i32, i32), (i32, i32), bool);

/// Fixed diagonal segment of a slope tile, if any
pub fn diagonal_shape(tile_id: u8) -> Option<DiagShape> {
    let shape = match tile_id {
        // 45 degree slopes
        6 => ((0, 24), (24, 0)),
        7 => ((0, 0), (24, 24)),
        8 => ((24, 0), (0, 24)),
        9 => ((24, 24), (0, 0)),
        // short mild slopes
        18 => ((0, 12), (24, 0)),
        19 => ((0, 0), (24, 12)),
        20 => ((24, 12), (0, 24)),
        21 => ((24, 24), (0, 12)),
        // raised mild slopes
        22 => ((0, 24), (24, 12)),
        23 => ((0, 12), (24, 24)),
        24 => ((24, 0), (0, 12)),
        25 => ((24, 12), (0, 0)),
        // short steep slopes
        26 => ((0, 24), (12, 0)),
        27 => ((12, 0), (24, 24)),
        28 => ((24, 0), (12, 24)),
        29 => ((12, 24), (0, 0)),
        // raised steep slopes
        30 => ((12, 24), (24, 0)),
        31 => ((0, 0), (12, 24)),
        32 => ((12, 0), (0, 24)),
        33 => ((24, 24), (12, 0)),
        _ => return None,
    };
    Some(shape)
}

/// Fixed arc of a curved tile, if any
pub fn arc_shape(tile_id: u8) -> Option<ArcShape> {
    let shape = match tile_id {
        // quarter moons
        10 => ((0, 0), (1, 1), true),
        11 => ((24, 0), (-1, 1), true),
        12 => ((24, 24), (-1, -1), true),
        13 => ((0, 24), (1, -1), true),
        // quarter pipes
        14 => ((24, 24), (-1, -1), false),
        15 => ((0, 24), (1, -1), false),
        16 => ((0, 0), (1, 1), false),
        17 => ((24, 0), (-1, 1), false),
        _ => return None,
    };
    Some(shape)
}

/// Edge parity and strength vectors for a tile id, `None` for unknown ids
#[inline]
pub fn edge_contributions(tile_id: u8) -> Option<(&'static [u8; 12], &'static [i8; 12])> {
    let idx = tile_id as usize;
    if idx < TILE_COUNT {
        Some((&TILE_GRID_EDGE[idx], &TILE_SEGMENT_ORTHO[idx]))
    } else {
        None
    }
}
