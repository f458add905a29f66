//! Binary map layout
//!
//! Maps use the N++ level layout. Everything is validated here, before a
//! simulation touches any of its state.
//!
//! | offset        | content                                          |
//! |---------------|--------------------------------------------------|
//! | `184..1150`   | 42x23 interior tile ids, row-major               |
//! | `1156`        | exit door count                                  |
//! | `1230..1235`  | spawn record `{0, x, y, facing, mode}`           |
//! | `1235..`      | entity records `{type, x, y, orientation, mode}` |
//!
//! Coordinates are stored in 6 pixel units.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::consts::{MAP_TILES_HEIGHT, MAP_TILES_WIDTH, MAP_UNIT};
use crate::grid_cell;

pub const TILE_DATA_OFFSET: usize = 184;
pub const EXIT_COUNT_OFFSET: usize = 1156;
pub const SPAWN_OFFSET: usize = 1230;
pub const FACING_OFFSET: usize = 1233;
pub const ENTITY_DATA_OFFSET: usize = 1235;
/// Bytes per entity record
pub const RECORD_SIZE: usize = 5;

pub const TYPE_EXIT: u8 = 3;
pub const TYPE_EXIT_SWITCH: u8 = 4;
pub const TYPE_DOOR_LOCKED: u8 = 6;
pub const TYPE_DOOR_LOCKED_SWITCH: u8 = 7;
pub const TYPE_DOOR_TRAP: u8 = 8;
pub const TYPE_DOOR_TRAP_SWITCH: u8 = 9;

/// Why a map buffer was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum MapError {
    /// Buffer ends before the first entity record
    TooShort { len: usize },
    /// An entity record starting at `offset` runs past the end
    TruncatedRecord { offset: usize },
    /// The record at `offset` points at switch bytes outside the buffer
    LinkedRecordOutOfBounds { offset: usize, linked: usize },
    /// The record at `offset` (or its linked switch) lies outside the entity grid
    EntityOutOfGrid { offset: usize, pos: DVec2 },
}

impl std::fmt::Display for MapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooShort { len } => {
                write!(f, "Map too short: {len} bytes, need at least {ENTITY_DATA_OFFSET}")
            }
            Self::TruncatedRecord { offset } => {
                write!(f, "Truncated entity record at offset {offset}")
            }
            Self::LinkedRecordOutOfBounds { offset, linked } => write!(
                f,
                "Entity record at offset {offset} links to switch bytes at {linked}, past the end"
            ),
            Self::EntityOutOfGrid { offset, pos } => write!(
                f,
                "Entity record at offset {offset} places ({}, {}) outside the entity grid",
                pos.x, pos.y
            ),
        }
    }
}

impl std::error::Error for MapError {}

/// Actor spawn point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spawn {
    pub pos: DVec2,
    /// -1 or 1
    pub facing: i8,
}

/// One entity record, with the switch position resolved for linked types
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Byte offset of the record in the map
    pub offset: usize,
    pub entity_type: u8,
    pub pos: DVec2,
    pub orientation: u8,
    pub mode: u8,
    /// Exit switch, locked door switch or trap door switch
    pub switch_pos: Option<DVec2>,
}

/// A validated map
#[derive(Debug, Clone, PartialEq)]
pub struct MapData {
    /// 42x23 interior tile ids
    pub tiles: Vec<u8>,
    pub exit_count: u8,
    pub spawn: Spawn,
    pub entities: Vec<EntityRecord>,
}

#[inline]
fn unit(byte: u8) -> f64 {
    byte as f64 * MAP_UNIT
}

impl MapData {
    /// Parse and validate a map buffer
    pub fn parse(bytes: &[u8]) -> Result<Self, MapError> {
        if bytes.len() < ENTITY_DATA_OFFSET {
            return Err(MapError::TooShort { len: bytes.len() });
        }

        let tiles_end = TILE_DATA_OFFSET + MAP_TILES_WIDTH * MAP_TILES_HEIGHT;
        let tiles = bytes[TILE_DATA_OFFSET..tiles_end].to_vec();
        let exit_count = bytes[EXIT_COUNT_OFFSET];

        let raw_facing = bytes[FACING_OFFSET] as i8;
        let facing = if raw_facing == -1 || raw_facing == 1 {
            raw_facing
        } else {
            log::warn!("Spawn facing byte {raw_facing} is not -1 or 1, forcing -1");
            -1
        };
        let spawn = Spawn {
            pos: DVec2::new(unit(bytes[SPAWN_OFFSET + 1]), unit(bytes[SPAWN_OFFSET + 2])),
            facing,
        };

        let mut entities = Vec::new();
        let mut offset = ENTITY_DATA_OFFSET;
        while offset < bytes.len() {
            let entity_type = bytes[offset];
            if entity_type == 0 {
                break;
            }
            if offset + RECORD_SIZE > bytes.len() {
                return Err(MapError::TruncatedRecord { offset });
            }

            let switch_at = match entity_type {
                TYPE_EXIT => Some(offset + RECORD_SIZE * exit_count as usize),
                TYPE_DOOR_LOCKED | TYPE_DOOR_TRAP => Some(offset + RECORD_SIZE),
                _ => None,
            };
            let switch_pos = match switch_at {
                Some(linked) => {
                    if linked + 2 >= bytes.len() {
                        return Err(MapError::LinkedRecordOutOfBounds { offset, linked });
                    }
                    Some(DVec2::new(unit(bytes[linked + 1]), unit(bytes[linked + 2])))
                }
                None => None,
            };

            let pos = DVec2::new(unit(bytes[offset + 1]), unit(bytes[offset + 2]));
            if let Some(outside) = std::iter::once(pos)
                .chain(switch_pos)
                .find(|&p| grid_cell(p).is_none())
            {
                return Err(MapError::EntityOutOfGrid { offset, pos: outside });
            }

            entities.push(EntityRecord {
                offset,
                entity_type,
                pos,
                orientation: bytes[offset + 3],
                mode: bytes[offset + 4],
                switch_pos,
            });
            offset += RECORD_SIZE;
        }

        Ok(Self {
            tiles,
            exit_count,
            spawn,
            entities,
        })
    }
}

/// Assemble map buffers in code, mainly for tests and demos.
///
/// Positions are in map units (6 px). Cell `(x, y)` of the full 44x25 grid
/// has its centre at units `(4x + 2, 4y + 2)`.
#[derive(Debug, Clone)]
pub struct MapBuilder {
    tiles: Vec<u8>,
    spawn: (u8, u8, i8),
    exits: Vec<([u8; 5], [u8; 5])>,
    records: Vec<[u8; 5]>,
}

impl Default for MapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MapBuilder {
    pub fn new() -> Self {
        Self {
            tiles: vec![0; MAP_TILES_WIDTH * MAP_TILES_HEIGHT],
            spawn: (0, 0, -1),
            exits: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Set the tile of grid cell `(x, y)`; border cells are ignored
    pub fn tile(mut self, x: usize, y: usize, id: u8) -> Self {
        if (1..=MAP_TILES_WIDTH).contains(&x) && (1..=MAP_TILES_HEIGHT).contains(&y) {
            self.tiles[(x - 1) + (y - 1) * MAP_TILES_WIDTH] = id;
        }
        self
    }

    /// Fill the inclusive cell rectangle `(x1, y1)..=(x2, y2)`
    pub fn fill(mut self, x1: usize, y1: usize, x2: usize, y2: usize, id: u8) -> Self {
        for y in y1..=y2 {
            for x in x1..=x2 {
                self = self.tile(x, y, id);
            }
        }
        self
    }

    pub fn spawn(mut self, x: u8, y: u8, facing: i8) -> Self {
        self.spawn = (x, y, facing);
        self
    }

    /// Plain record with no linked switch
    pub fn entity(mut self, entity_type: u8, x: u8, y: u8, orientation: u8, mode: u8) -> Self {
        self.records.push([entity_type, x, y, orientation, mode]);
        self
    }

    /// Exit door and its switch
    pub fn exit(mut self, x: u8, y: u8, switch_x: u8, switch_y: u8) -> Self {
        self.exits.push((
            [TYPE_EXIT, x, y, 0, 0],
            [TYPE_EXIT_SWITCH, switch_x, switch_y, 0, 0],
        ));
        self
    }

    pub fn locked_door(self, x: u8, y: u8, orientation: u8, switch_x: u8, switch_y: u8) -> Self {
        self.linked_door(TYPE_DOOR_LOCKED, x, y, orientation, switch_x, switch_y)
    }

    pub fn trap_door(self, x: u8, y: u8, orientation: u8, switch_x: u8, switch_y: u8) -> Self {
        self.linked_door(TYPE_DOOR_TRAP, x, y, orientation, switch_x, switch_y)
    }

    fn linked_door(mut self, door_type: u8, x: u8, y: u8, orientation: u8, sx: u8, sy: u8) -> Self {
        self.records.push([door_type, x, y, orientation, 0]);
        self.records.push([door_type + 1, sx, sy, 0, 0]);
        self
    }

    /// Serialize: exits first, then their switches, then every other record
    pub fn build(self) -> Vec<u8> {
        let mut bytes = vec![0u8; ENTITY_DATA_OFFSET];
        bytes[TILE_DATA_OFFSET..TILE_DATA_OFFSET + self.tiles.len()].copy_from_slice(&self.tiles);
        bytes[EXIT_COUNT_OFFSET] = self.exits.len() as u8;
        bytes[SPAWN_OFFSET + 1] = self.spawn.0;
        bytes[SPAWN_OFFSET + 2] = self.spawn.1;
        bytes[FACING_OFFSET] = self.spawn.2 as u8;
        for (exit, _) in &self.exits {
            bytes.extend_from_slice(exit);
        }
        for (_, switch) in &self.exits {
            bytes.extend_from_slice(switch);
        }
        for record in &self.records {
            bytes.extend_from_slice(record);
        }
        bytes
    }
}
