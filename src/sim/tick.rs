//! Fixed step simulation tick
//!
//! Advances a [`Simulation`] by exactly one frame. The order of work inside
//! a frame is fixed, which is what makes runs reproducible.

use super::actor::ActorState;
use super::entity::CollisionRecord;
use super::state::Simulation;
use crate::consts::{CACHE_CLEAR_INTERVAL, COLLISION_PASSES};

/// Input commands for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    /// -1 left, 0 none, 1 right
    pub horizontal: i8,
    pub jump: bool,
}

/// Advance the simulation by one frame
pub fn tick(sim: &mut Simulation, input: &TickInput) {
    sim.frame += 1;
    let frame = sim.frame;

    if let Some(actor) = sim.actor.as_mut() {
        actor.set_inputs(input.horizontal, input.jump);
    }

    // Entities switched on or off during this frame only take part from the next one
    let registry = &sim.registry;
    let movable: Vec<_> = registry
        .entities_by_type()
        .filter(|&id| {
            let e = registry.entity(id);
            e.active && e.is_movable()
        })
        .collect();
    let thinkable: Vec<_> = registry
        .entities_by_type()
        .filter(|&id| {
            let e = registry.entity(id);
            e.active && e.is_thinkable()
        })
        .collect();

    for &id in &movable {
        let entity = sim.registry.entity_mut(id);
        if !entity.advance() {
            continue;
        }
        match entity.current_cell() {
            Some(cell) => sim.registry.move_entity(id, cell),
            None => log::debug!("Frame {frame}: entity {} left the grid, keeping its cell", id.0),
        }
    }

    for id in thinkable {
        let (entity, segments) = sim.registry.entity_and_segments_mut(id);
        let entity_type = entity.entity_type;
        if let Some(event) = entity.think(sim.actor.as_ref(), segments) {
            log::trace!("Frame {frame}: entity {} (type {entity_type}) {event:?}", id.0);
            sim.collision_log.push(CollisionRecord {
                frame,
                entity: id,
                entity_type,
                event,
            });
        }
    }

    if let Some(actor) = sim.actor.as_mut()
        && actor.state != ActorState::Disabled
    {
        actor.integrate();
        actor.pre_collision();
        for _ in 0..COLLISION_PASSES {
            actor.collide_vs_objects(&mut sim.registry, frame, &mut sim.collision_log);
            actor.collide_vs_tiles(&sim.registry, &mut sim.cache);
        }
        actor.post_collision(&sim.registry, &mut sim.cache);
        actor.think();
        if sim.config.enable_anim {
            actor.update_graphics();
        }
    }

    // Held at the dead pose with no further animation step, unlike the
    // regular per-frame graphics update
    if let Some(actor) = sim.actor.as_mut()
        && actor.state == ActorState::Dead
        && sim.config.enable_anim
    {
        actor.pin_dead_animation();
    }

    if sim.config.log_data {
        if let Some(actor) = sim.actor.as_mut() {
            actor.log(frame);
        }
        for &id in &movable {
            sim.registry.entity_mut(id).log_position(frame);
        }
    }

    if frame % CACHE_CLEAR_INTERVAL == 0 {
        sim.cache.clear();
    }
}

impl Simulation {
    /// Advance one frame with the given inputs
    pub fn tick(&mut self, horizontal: i8, jump: bool) {
        tick(self, &TickInput { horizontal, jump });
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec2;

    use super::*;
    use crate::settings::SimConfig;
    use crate::sim::actor::ACTOR_RADIUS;
    use crate::sim::entity::{EntityEvent, EntityKind, TYPE_BOUNCE_BLOCK, TYPE_DOOR_REGULAR, TYPE_GOLD};
    use crate::sim::map::MapBuilder;

    /// Room with a floor strip whose top is at y = 480, spawn above it
    fn floor_map() -> MapBuilder {
        MapBuilder::new().fill(1, 20, 42, 20, 1).spawn(20, 76, 1)
    }

    fn loaded(builder: MapBuilder) -> Simulation {
        let mut sim = Simulation::default();
        sim.load(&builder.build()).unwrap();
        sim
    }

    #[test]
    fn test_tick_advances_frame() {
        let mut sim = loaded(floor_map());
        let input = TickInput::default();
        tick(&mut sim, &input);
        tick(&mut sim, &input);
        assert_eq!(sim.frame(), 2);
    }

    #[test]
    fn test_tick_without_map_only_counts() {
        let mut sim = Simulation::default();
        sim.tick(1, true);
        assert_eq!(sim.frame(), 1);
        assert!(sim.actor().is_none());
    }

    #[test]
    fn test_tick_actor_settles_on_floor() {
        let mut sim = loaded(floor_map());
        for _ in 0..120 {
            sim.tick(0, false);
        }
        let actor = sim.actor().unwrap();
        assert!(!actor.airborne());
        assert!((actor.pos.y - (480.0 - ACTOR_RADIUS)).abs() < 1e-6);
    }

    #[test]
    fn test_tick_disabled_actor_is_frozen() {
        let mut sim = loaded(floor_map());
        sim.actor_mut().unwrap().disable();
        let before = sim.actor().unwrap().pos;
        for _ in 0..10 {
            sim.tick(1, true);
        }
        assert_eq!(sim.actor().unwrap().pos, before);
        assert_eq!(sim.actor().unwrap().state, ActorState::Disabled);
    }

    #[test]
    fn test_tick_dead_animation_pinned() {
        let mut sim = loaded(floor_map());
        sim.actor_mut().unwrap().kill();
        for _ in 0..3 {
            sim.tick(0, false);
        }
        let actor = sim.actor().unwrap();
        assert_eq!(actor.state, ActorState::Dead);
        assert_eq!(actor.anim_frame, 105);
        assert_eq!(actor.anim_state, 7);

        // No drift while the pose is held
        for _ in 0..20 {
            sim.tick(1, true);
        }
        assert_eq!(sim.actor().unwrap().anim_frame, 105);
    }

    #[test]
    fn test_tick_animation_off() {
        let mut sim = Simulation::new(SimConfig {
            enable_anim: false,
            ..Default::default()
        });
        sim.load(&floor_map().build()).unwrap();
        sim.actor_mut().unwrap().kill();
        sim.tick(1, false);
        let actor = sim.actor().unwrap();
        assert_eq!(actor.anim_frame, 0);
        assert_eq!(actor.facing, 1);
    }

    #[test]
    fn test_tick_cache_cleared_every_hundred_frames() {
        let mut sim = loaded(floor_map());
        for _ in 0..99 {
            sim.tick(0, false);
        }
        assert!(!sim.cache().is_empty());
        sim.tick(0, false);
        assert!(sim.cache().is_empty());
        sim.tick(0, false);
        assert!(!sim.cache().is_empty());
    }

    #[test]
    fn test_tick_log_data() {
        let mut sim = Simulation::new(SimConfig {
            log_data: true,
            ..Default::default()
        });
        sim.load(&floor_map().entity(TYPE_BOUNCE_BLOCK, 100, 40, 0, 0).build())
            .unwrap();
        for _ in 0..5 {
            sim.tick(0, false);
        }
        let actor = sim.actor().unwrap();
        assert_eq!(actor.position_log.len(), 5);
        assert_eq!(actor.position_log[4].frame, 5);
        let block = sim.registry().entities_of_type(TYPE_BOUNCE_BLOCK)[0];
        // Initial entry from the reset plus one per frame
        assert_eq!(sim.registry().entity(block).position_log.len(), 6);
    }

    #[test]
    fn test_tick_log_skips_inactive_movable() {
        let mut sim = Simulation::new(SimConfig {
            log_data: true,
            ..Default::default()
        });
        sim.load(&floor_map().entity(TYPE_BOUNCE_BLOCK, 100, 40, 0, 0).build())
            .unwrap();
        let block = sim.registry().entities_of_type(TYPE_BOUNCE_BLOCK)[0];
        sim.registry.entity_mut(block).active = false;
        for _ in 0..5 {
            sim.tick(0, false);
        }
        // Only the entry written by the reset
        assert_eq!(sim.registry().entity(block).position_log.len(), 1);
    }

    #[test]
    fn test_tick_block_pushed_off_grid_keeps_cell() {
        let mut sim = loaded(floor_map().entity(TYPE_BOUNCE_BLOCK, 100, 40, 0, 0));
        let block = sim.registry().entities_of_type(TYPE_BOUNCE_BLOCK)[0];
        let cell = sim.registry().entity(block).cell;
        let far = DVec2::new(2000.0, 240.0);
        let entity = sim.registry.entity_mut(block);
        entity.pos = far;
        if let EntityKind::BounceBlock { origin, .. } = &mut entity.kind {
            *origin = far;
        }
        sim.tick(0, false);
        assert_eq!(sim.registry().entity(block).cell, cell);
        assert_eq!(sim.registry().entities_in_cell(cell), &[block]);
    }

    #[test]
    fn test_tick_regular_door_recloses() {
        // Door body in the actor's path on the floor. A stale cached region
        // can keep the opened door solid until the next cache clear.
        let mut sim = loaded(floor_map().entity(TYPE_DOOR_REGULAR, 40, 76, 0, 0));
        for _ in 0..250 {
            sim.tick(1, false);
        }
        let events: Vec<_> = sim.collision_log().iter().map(|r| r.event).collect();
        assert!(events.contains(&EntityEvent::DoorOpened));
        assert!(events.contains(&EntityEvent::DoorClosed));
    }

    #[test]
    fn test_gold_logged_with_frame() {
        let mut sim = loaded(floor_map().entity(TYPE_GOLD, 20, 78, 0, 0));
        sim.tick(0, false);
        let record = sim.collision_log()[0];
        assert_eq!(record.frame, 1);
        assert_eq!(record.event, EntityEvent::GoldCollected);
        assert_eq!(sim.actor().unwrap().gold_collected, 1);
    }

    #[test]
    fn test_determinism() {
        let builder = floor_map()
            .entity(TYPE_GOLD, 40, 78, 0, 0)
            .entity(TYPE_BOUNCE_BLOCK, 60, 76, 0, 0);
        let mut sim1 = loaded(builder.clone());
        let mut sim2 = loaded(builder);

        let inputs = [
            TickInput { horizontal: 1, ..Default::default() },
            TickInput { horizontal: 1, jump: true },
            TickInput::default(),
            TickInput { horizontal: -1, ..Default::default() },
        ];

        for input in inputs.iter().cycle().take(400) {
            tick(&mut sim1, input);
            tick(&mut sim2, input);
        }

        assert_eq!(sim1.snapshot(), sim2.snapshot());
        assert_eq!(sim1.collision_log(), sim2.collision_log());
        assert_ne!(sim1.actor().unwrap().pos, DVec2::new(120.0, 456.0));
    }
}
