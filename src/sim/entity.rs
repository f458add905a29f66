//! Interactive entities
//!
//! A closed set of variants. Each entity may move every tick, think every
//! tick, react to actor overlap (logical collision) or push the actor out of
//! its body (physical collision). Which hooks run is decided by the variant.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::actor::{ACTOR_RADIUS, Actor, ActorState};
use super::collision::{Penetration, orientation_to_vector, overlap_circle_vs_circle, penetration_square_vs_point};
use super::grid::{Cell, OFF_GRID, SpatialRegistry};
use super::map::EntityRecord;
use super::segment::{Segment, SegmentId};
use crate::consts::CELL_SIZE;
use crate::{clamp_segment_cell, grid_cell};

pub const GOLD_RADIUS: f64 = 6.0;
pub const EXIT_RADIUS: f64 = 12.0;
pub const EXIT_SWITCH_RADIUS: f64 = 6.0;
pub const DOOR_REGULAR_RADIUS: f64 = 10.0;
/// Switch radius of locked and trap doors
pub const DOOR_SWITCH_RADIUS: f64 = 5.0;
/// Half the length of a door segment
pub const DOOR_HALF_LENGTH: f64 = 12.0;
/// Frames a regular door stays open after the last touch
pub const DOOR_CLOSE_DELAY: u32 = 5;
pub const LAUNCH_PAD_RADIUS: f64 = 6.0;
pub const LAUNCH_PAD_BOOST: f64 = 36.0 / 7.0;
pub const BOUNCE_BLOCK_SEMI_SIDE: f64 = 9.0;
pub const BOUNCE_BLOCK_STIFFNESS: f64 = 0.02222222222222222;
pub const BOUNCE_BLOCK_DAMPING: f64 = 0.98;
/// Share of a depenetration applied to the actor; the block takes the rest
pub const BOUNCE_BLOCK_STRENGTH: f64 = 0.2;

pub const TYPE_TOGGLE_MINE: u8 = 1;
pub const TYPE_GOLD: u8 = 2;
pub const TYPE_EXIT: u8 = 3;
pub const TYPE_EXIT_SWITCH: u8 = 4;
pub const TYPE_DOOR_REGULAR: u8 = 5;
pub const TYPE_DOOR_LOCKED: u8 = 6;
pub const TYPE_DOOR_TRAP: u8 = 8;
pub const TYPE_LAUNCH_PAD: u8 = 10;
pub const TYPE_BOUNCE_BLOCK: u8 = 17;
pub const TYPE_TOGGLE_MINE_UNTOGGLED: u8 = 21;

/// Handle to an entity in the registry's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Toggle mine states, numbered as in map data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MineState {
    Toggled = 0,
    Untoggled = 1,
    Toggling = 2,
}

impl MineState {
    pub fn radius(self) -> f64 {
        match self {
            MineState::Toggled => 4.0,
            MineState::Untoggled => 3.5,
            MineState::Toggling => 4.5,
        }
    }
}

/// Door body: a two-sided segment that blocks while closed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Door {
    pub segment: SegmentId,
    /// Centre of the door segment, independent of where the switch is
    pub body: DVec2,
    pub closed: bool,
}

impl Door {
    /// Create the door segment and register it in the segment grid
    fn spawn(registry: &mut SpatialRegistry, body: DVec2, orientation: u8, closed: bool) -> Self {
        let vertical = matches!(orientation % 8, 0 | 4);
        let (a, b) = if vertical {
            (body - DVec2::new(0.0, DOOR_HALF_LENGTH), body + DVec2::new(0.0, DOOR_HALF_LENGTH))
        } else {
            (body - DVec2::new(DOOR_HALF_LENGTH, 0.0), body + DVec2::new(DOOR_HALF_LENGTH, 0.0))
        };
        let anchor = (body - orientation_to_vector(orientation) * DOOR_HALF_LENGTH) / CELL_SIZE;
        let cell = clamp_segment_cell(anchor.x.floor() as i32, anchor.y.floor() as i32);
        let mut segment = Segment::linear_unoriented(a, b);
        segment.active = closed;
        Self {
            segment: registry.add_segment(cell, segment),
            body,
            closed,
        }
    }

    fn set_closed(&mut self, closed: bool, segments: &mut [Segment]) {
        self.closed = closed;
        segments[self.segment.0 as usize].active = closed;
    }
}

/// Variant state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    ToggleMine { state: MineState },
    Gold,
    Exit,
    ExitSwitch { exit: EntityId },
    DoorRegular { door: Door, open_timer: u32 },
    DoorLocked { door: Door },
    DoorTrap { door: Door },
    LaunchPad,
    BounceBlock { origin: DVec2, velocity: DVec2 },
}

/// Something an entity did to the actor or to itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityEvent {
    MineStateChanged(MineState),
    ActorKilled,
    GoldCollected,
    SwitchActivated { exit: EntityId },
    ExitReached,
    DoorOpened,
    DoorClosed,
}

/// Collision log entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionRecord {
    pub frame: u64,
    pub entity: EntityId,
    pub entity_type: u8,
    pub event: EntityEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub entity_type: u8,
    /// Collision anchor. For locked and trap doors this is the switch.
    pub pos: DVec2,
    pub orientation: u8,
    pub mode: u8,
    /// Owning cell, kept in sync by the registry
    pub cell: Cell,
    pub active: bool,
    pub kind: EntityKind,
    /// `(frame, position)` history
    #[serde(skip)]
    pub position_log: Vec<(u64, DVec2)>,
}

impl Entity {
    /// A `pos` outside the grid gets [`OFF_GRID`] as its cell, which the
    /// registry refuses to index.
    pub fn new(entity_type: u8, pos: DVec2, orientation: u8, kind: EntityKind) -> Self {
        Self {
            entity_type,
            pos,
            orientation,
            mode: 0,
            cell: grid_cell(pos).unwrap_or(OFF_GRID),
            active: true,
            kind,
            position_log: Vec::new(),
        }
    }

    pub fn is_movable(&self) -> bool {
        matches!(self.kind, EntityKind::BounceBlock { .. })
    }

    pub fn is_thinkable(&self) -> bool {
        matches!(self.kind, EntityKind::ToggleMine { .. } | EntityKind::DoorRegular { .. })
    }

    pub fn is_logical(&self) -> bool {
        !matches!(self.kind, EntityKind::BounceBlock { .. })
    }

    pub fn is_physical(&self) -> bool {
        matches!(self.kind, EntityKind::BounceBlock { .. })
    }

    /// Door body if this is a door
    pub fn door(&self) -> Option<&Door> {
        match &self.kind {
            EntityKind::DoorRegular { door, .. } | EntityKind::DoorLocked { door } | EntityKind::DoorTrap { door } => {
                Some(door)
            }
            _ => None,
        }
    }

    /// Cell the current position falls in, `None` once it has left the grid
    pub fn current_cell(&self) -> Option<Cell> {
        grid_cell(self.pos)
    }

    pub fn log_position(&mut self, frame: u64) {
        self.position_log.push((frame, self.pos));
    }

    /// Per-tick motion. Returns true when the entity moved.
    pub fn advance(&mut self) -> bool {
        match &mut self.kind {
            EntityKind::BounceBlock { origin, velocity } => {
                *velocity *= BOUNCE_BLOCK_DAMPING;
                self.pos += *velocity;
                let force = (*origin - self.pos) * BOUNCE_BLOCK_STIFFNESS;
                self.pos += force;
                *velocity += force;
                true
            }
            _ => false,
        }
    }

    /// Per-tick state update
    pub fn think(&mut self, actor: Option<&Actor>, segments: &mut [Segment]) -> Option<EntityEvent> {
        match &mut self.kind {
            EntityKind::ToggleMine { state } => {
                let actor = actor?;
                let next = if actor.is_valid_target() {
                    let touching = overlap_circle_vs_circle(self.pos, state.radius(), actor.pos, ACTOR_RADIUS);
                    match *state {
                        MineState::Untoggled if touching => Some(MineState::Toggling),
                        MineState::Toggling if !touching => Some(MineState::Toggled),
                        _ => None,
                    }
                } else if *state == MineState::Toggling && actor.state == ActorState::Dead {
                    Some(MineState::Untoggled)
                } else {
                    None
                };
                next.map(|s| {
                    *state = s;
                    EntityEvent::MineStateChanged(s)
                })
            }
            EntityKind::DoorRegular { door, open_timer } => {
                if door.closed {
                    return None;
                }
                *open_timer += 1;
                if *open_timer > DOOR_CLOSE_DELAY {
                    door.set_closed(true, segments);
                    return Some(EntityEvent::DoorClosed);
                }
                None
            }
            _ => None,
        }
    }

    /// React to the actor touching this entity
    pub fn logical_collision(&mut self, actor: &mut Actor, segments: &mut [Segment]) -> Option<EntityEvent> {
        if !self.active {
            return None;
        }
        let (pos, actor_pos) = (self.pos, actor.pos);
        let touching = move |radius: f64| overlap_circle_vs_circle(pos, radius, actor_pos, ACTOR_RADIUS);
        match &mut self.kind {
            EntityKind::ToggleMine { state } => {
                let hit = *state == MineState::Toggled && actor.is_valid_target() && touching(state.radius());
                (hit && actor.kill()).then_some(EntityEvent::ActorKilled)
            }
            EntityKind::Gold => {
                if actor.state == ActorState::Celebrating || !touching(GOLD_RADIUS) {
                    return None;
                }
                actor.gold_collected += 1;
                self.active = false;
                Some(EntityEvent::GoldCollected)
            }
            EntityKind::Exit => (touching(EXIT_RADIUS) && actor.win()).then_some(EntityEvent::ExitReached),
            EntityKind::ExitSwitch { exit } => {
                if !touching(EXIT_SWITCH_RADIUS) {
                    return None;
                }
                self.active = false;
                Some(EntityEvent::SwitchActivated { exit: *exit })
            }
            EntityKind::DoorRegular { door, open_timer } => {
                if !touching(DOOR_REGULAR_RADIUS) {
                    return None;
                }
                *open_timer = 0;
                if door.closed {
                    door.set_closed(false, segments);
                    return Some(EntityEvent::DoorOpened);
                }
                None
            }
            EntityKind::DoorLocked { door } => {
                if !touching(DOOR_SWITCH_RADIUS) {
                    return None;
                }
                self.active = false;
                door.set_closed(false, segments);
                actor.doors_opened += 1;
                Some(EntityEvent::DoorOpened)
            }
            EntityKind::DoorTrap { door } => {
                if !touching(DOOR_SWITCH_RADIUS) {
                    return None;
                }
                self.active = false;
                door.set_closed(true, segments);
                Some(EntityEvent::DoorClosed)
            }
            EntityKind::LaunchPad => {
                if !actor.is_valid_target() || !touching(LAUNCH_PAD_RADIUS) {
                    return None;
                }
                let normal = orientation_to_vector(self.orientation);
                // The actor has to reach the pad surface, grazing its edge is not enough
                let reach = (self.pos - (actor.pos - normal * ACTOR_RADIUS)).dot(normal);
                if reach >= -0.1 {
                    let y_scale = if normal.y < 0.0 { 1.0 - normal.y } else { 1.0 };
                    let boost = DVec2::new(normal.x, normal.y * y_scale) * LAUNCH_PAD_BOOST;
                    actor.launch(boost * (2.0 / 3.0));
                }
                None
            }
            EntityKind::BounceBlock { .. } => None,
        }
    }

    /// Push the actor out of a solid entity. Returns the part of the
    /// depenetration the actor should take.
    pub fn physical_collision(&mut self, actor_pos: DVec2) -> Option<Penetration> {
        match &mut self.kind {
            EntityKind::BounceBlock { velocity, .. } => {
                let pen = penetration_square_vs_point(self.pos, actor_pos, BOUNCE_BLOCK_SEMI_SIDE + ACTOR_RADIUS)?;
                let push = pen.normal * pen.depth * (1.0 - BOUNCE_BLOCK_STRENGTH);
                self.pos -= push;
                *velocity -= push;
                Some(Penetration {
                    depth: pen.depth * BOUNCE_BLOCK_STRENGTH,
                    ..pen
                })
            }
            _ => None,
        }
    }

    /// Horizontal wall normal offered to the actor for wall sliding
    pub fn wall_normal(&self, actor_pos: DVec2) -> Option<f64> {
        match self.kind {
            EntityKind::BounceBlock { .. } => {
                let pen =
                    penetration_square_vs_point(self.pos, actor_pos, BOUNCE_BLOCK_SEMI_SIDE + ACTOR_RADIUS + 0.1)?;
                (pen.normal.x != 0.0).then_some(pen.normal.x)
            }
            _ => None,
        }
    }
}

/// Build the entity for a map record and register any satellite state
/// (door segments, the exit door behind a switch). Records of unsupported
/// types yield `None`.
pub fn create_entity(registry: &mut SpatialRegistry, record: &EntityRecord) -> Option<Entity> {
    let EntityRecord {
        entity_type,
        pos,
        orientation,
        mode,
        switch_pos,
        ..
    } = *record;
    let kind = match entity_type {
        TYPE_TOGGLE_MINE => EntityKind::ToggleMine {
            state: MineState::Toggled,
        },
        TYPE_TOGGLE_MINE_UNTOGGLED => EntityKind::ToggleMine {
            state: MineState::Untoggled,
        },
        TYPE_GOLD => EntityKind::Gold,
        TYPE_EXIT => {
            let mut exit = Entity::new(TYPE_EXIT, pos, orientation, EntityKind::Exit);
            exit.active = false;
            let exit = registry.add_entity(exit);
            let mut switch = Entity::new(
                TYPE_EXIT_SWITCH,
                switch_pos.unwrap_or(pos),
                0,
                EntityKind::ExitSwitch { exit },
            );
            switch.mode = mode;
            return Some(switch);
        }
        TYPE_DOOR_REGULAR => EntityKind::DoorRegular {
            door: Door::spawn(registry, pos, orientation, true),
            open_timer: 0,
        },
        TYPE_DOOR_LOCKED | TYPE_DOOR_TRAP => {
            let closed = entity_type == TYPE_DOOR_LOCKED;
            let door = Door::spawn(registry, pos, orientation, closed);
            let kind = if closed {
                EntityKind::DoorLocked { door }
            } else {
                EntityKind::DoorTrap { door }
            };
            let mut entity = Entity::new(entity_type, switch_pos.unwrap_or(pos), orientation, kind);
            entity.mode = mode;
            return Some(entity);
        }
        TYPE_LAUNCH_PAD => EntityKind::LaunchPad,
        TYPE_BOUNCE_BLOCK => EntityKind::BounceBlock {
            origin: pos,
            velocity: DVec2::ZERO,
        },
        other => {
            log::debug!("Skipping entity type {other} at offset {}", record.offset);
            return None;
        }
    };
    let mut entity = Entity::new(entity_type, pos, orientation, kind);
    entity.mode = mode;
    Some(entity)
}
