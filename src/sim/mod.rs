//! Deterministic simulation module
//!
//! All physics lives here. This module must stay pure and deterministic:
//! - Fixed timestep only
//! - Stable iteration order (type, then insertion order)
//! - Cache cadence driven by the frame counter, never wall-clock time

pub mod actor;
pub mod collision;
pub mod entity;
pub mod geometry;
pub mod grid;
pub mod map;
pub mod replay;
pub mod segment;
pub mod state;
pub mod tables;
pub mod tick;

pub use actor::{ACTOR_RADIUS, Actor, ActorLogEntry, ActorState};
pub use collision::CollisionCache;
pub use entity::{CollisionRecord, Entity, EntityEvent, EntityId, EntityKind};
pub use geometry::TileGeometry;
pub use grid::{Cell, SpatialRegistry};
pub use map::{MapBuilder, MapData, MapError};
pub use replay::{ReplayOutcome, ReplayResult, decode_input, run_replay};
pub use segment::{Segment, SegmentId, Shape};
pub use state::{EntityView, Simulation, Snapshot};
pub use tick::{TickInput, tick};
