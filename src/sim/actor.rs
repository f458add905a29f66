//! The player actor ("ninja")
//!
//! A circle of radius 10 driven by a small state machine. Each tick runs
//! integrate, four collision passes, a settle step that derives contact
//! normals, and finally `think`, which turns inputs into velocity changes
//! for the next tick.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::collision::{CollisionCache, Penetration, get_single_closest_point, sweep_circle_vs_tiles};
use super::entity::{CollisionRecord, EntityEvent};
use super::grid::SpatialRegistry;

pub const ACTOR_RADIUS: f64 = 10.0;

pub const GRAVITY_FALL: f64 = 0.06666666666666665;
pub const GRAVITY_JUMP: f64 = 0.01111111111111111;
pub const GROUND_ACCEL: f64 = 0.06666666666666665;
pub const AIR_ACCEL: f64 = 0.04444444444444444;
pub const DRAG_REGULAR: f64 = 0.9933221725495059;
pub const DRAG_SLOW: f64 = 0.8617738760127536;
pub const FRICTION_GROUND: f64 = 0.9459290248857720;
pub const FRICTION_GROUND_SLOW: f64 = 0.8617738760127536;
pub const FRICTION_WALL: f64 = 0.9113380468927672;
pub const MAX_HOR_SPEED: f64 = 3.333333333333333;
pub const MAX_JUMP_DURATION: u32 = 45;
pub const MAX_SURVIVABLE_IMPACT: f64 = 6.0;

/// Closest-point depenetration steps per collision pass
const MAX_DEPENETRATION_STEPS: usize = 32;
/// Animation frame held while dead
pub const DEAD_ANIM_FRAME: u32 = 105;
pub const DEAD_ANIM_STATE: u8 = 7;

/// Movement state; the numeric codes appear in logs and replays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorState {
    Immobile = 0,
    Running = 1,
    GroundSliding = 2,
    Jumping = 3,
    Falling = 4,
    WallSliding = 5,
    Dead = 6,
    AwaitingDeath = 7,
    Celebrating = 8,
    Disabled = 9,
}

impl ActorState {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Grounded movement states
    fn is_grounded(self) -> bool {
        self.code() <= 2
    }
}

/// Diagnostic per-frame record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActorLogEntry {
    pub frame: u64,
    pub pos: DVec2,
    pub vel: DVec2,
    pub state: ActorState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub pos: DVec2,
    pub vel: DVec2,
    old_pos: DVec2,
    old_vel: DVec2,
    pub state: ActorState,
    /// -1 or 1
    pub facing: i8,

    airborne: bool,
    airborne_old: bool,
    walled: bool,
    wall_normal: f64,
    floor_count: u32,
    ceiling_count: u32,
    floor_normal_sum: DVec2,
    ceiling_normal_sum: DVec2,
    floor_normal: DVec2,
    ceiling_normal: DVec2,

    gravity: f64,
    drag: f64,

    hor_input: i8,
    jump_input: bool,
    jump_input_old: bool,
    jump_buffer: i32,
    floor_buffer: i32,
    wall_buffer: i32,
    launch_pad_buffer: i32,
    jump_duration: u32,
    lp_boost_dir: DVec2,
    pending_boost: Option<DVec2>,

    pub gold_collected: u32,
    pub doors_opened: u32,

    pub anim_state: u8,
    pub anim_frame: u32,

    #[serde(skip)]
    pub position_log: Vec<ActorLogEntry>,
}

/// Count a buffer up while it is running, otherwise park it at -1
#[inline]
fn step_buffer(buffer: i32, limit: i32) -> i32 {
    if buffer > -1 && buffer < limit { buffer + 1 } else { -1 }
}

#[inline]
fn in_buffer(buffer: i32, limit: i32) -> bool {
    buffer > -1 && buffer < limit
}

impl Actor {
    pub fn new(spawn: DVec2, facing: i8) -> Self {
        Self {
            pos: spawn,
            vel: DVec2::ZERO,
            old_pos: spawn,
            old_vel: DVec2::ZERO,
            state: ActorState::Immobile,
            facing: if facing == 1 { 1 } else { -1 },
            airborne: false,
            airborne_old: false,
            walled: false,
            wall_normal: 0.0,
            floor_count: 0,
            ceiling_count: 0,
            floor_normal_sum: DVec2::ZERO,
            ceiling_normal_sum: DVec2::ZERO,
            floor_normal: DVec2::NEG_Y,
            ceiling_normal: DVec2::Y,
            gravity: GRAVITY_FALL,
            drag: DRAG_REGULAR,
            hor_input: 0,
            jump_input: false,
            jump_input_old: false,
            jump_buffer: -1,
            floor_buffer: -1,
            wall_buffer: -1,
            launch_pad_buffer: -1,
            jump_duration: 0,
            lp_boost_dir: DVec2::ZERO,
            pending_boost: None,
            gold_collected: 0,
            doors_opened: 0,
            anim_state: 0,
            anim_frame: 0,
            position_log: Vec::new(),
        }
    }

    /// Inputs for the coming tick. `horizontal` is clamped to -1..=1.
    pub fn set_inputs(&mut self, horizontal: i8, jump: bool) {
        self.hor_input = horizontal.signum();
        self.jump_input = jump;
    }

    /// Whether entities may still hurt or launch the actor
    pub fn is_valid_target(&self) -> bool {
        !matches!(self.state, ActorState::Dead | ActorState::Celebrating | ActorState::Disabled)
    }

    pub fn is_dead(&self) -> bool {
        matches!(self.state, ActorState::Dead | ActorState::AwaitingDeath)
    }

    pub fn airborne(&self) -> bool {
        self.airborne
    }

    pub fn walled(&self) -> bool {
        self.walled
    }

    pub fn wall_normal(&self) -> f64 {
        self.wall_normal
    }

    pub fn floor_normal(&self) -> DVec2 {
        self.floor_normal
    }

    pub fn ceiling_normal(&self) -> DVec2 {
        self.ceiling_normal
    }

    pub fn launch_pad_buffer(&self) -> i32 {
        self.launch_pad_buffer
    }

    pub fn pending_boost(&self) -> Option<DVec2> {
        self.pending_boost
    }

    /// Start dying. No-op once dead, celebrating or disabled.
    ///
    /// Returns whether the state changed.
    pub fn kill(&mut self) -> bool {
        if self.state.code() >= ActorState::Dead.code() {
            return false;
        }
        log::debug!("Actor killed at ({:.2}, {:.2})", self.pos.x, self.pos.y);
        self.state = ActorState::AwaitingDeath;
        true
    }

    /// Reach the exit. Returns whether the state changed.
    pub fn win(&mut self) -> bool {
        if self.state.code() >= ActorState::Dead.code() {
            return false;
        }
        if self.state == ActorState::Jumping {
            self.gravity = GRAVITY_FALL;
        }
        log::debug!("Actor reached the exit");
        self.state = ActorState::Celebrating;
        true
    }

    /// Remove the actor from play; it stops being simulated
    pub fn disable(&mut self) {
        self.state = ActorState::Disabled;
    }

    /// Queue a launch pad boost for the next integration step
    pub fn launch(&mut self, boost: DVec2) {
        self.pending_boost = Some(boost);
        self.lp_boost_dir = boost.normalize_or_zero();
        self.launch_pad_buffer = 0;
    }

    // === Physics ===

    pub fn integrate(&mut self) {
        if let Some(boost) = self.pending_boost.take() {
            self.vel = boost;
            self.pos += boost;
            if self.state.code() < ActorState::Dead.code() {
                self.state = ActorState::Falling;
            }
            self.gravity = GRAVITY_FALL;
        }
        self.vel *= self.drag;
        self.vel.y += self.gravity;
        self.old_pos = self.pos;
        self.pos += self.vel;
    }

    pub fn pre_collision(&mut self) {
        self.old_vel = self.vel;
        self.floor_count = 0;
        self.ceiling_count = 0;
        self.floor_normal_sum = DVec2::ZERO;
        self.ceiling_normal_sum = DVec2::ZERO;
    }

    /// Logical then physical collisions with the active entities around the actor
    pub fn collide_vs_objects(&mut self, registry: &mut SpatialRegistry, frame: u64, log: &mut Vec<CollisionRecord>) {
        for id in registry.neighbourhood(self.pos) {
            let (entity, segments) = registry.entity_and_segments_mut(id);
            if !entity.active {
                continue;
            }
            let entity_type = entity.entity_type;
            let event = if entity.is_logical() {
                entity.logical_collision(self, segments)
            } else {
                None
            };
            let pushed = if entity.is_physical() {
                entity.physical_collision(self.pos)
            } else {
                None
            };
            let cell = entity.current_cell();

            if let Some(pen) = pushed {
                self.depenetrate_from_entity(pen);
                match cell {
                    Some(cell) => registry.move_entity(id, cell),
                    None => log::debug!("Frame {frame}: entity {} left the grid, keeping its cell", id.0),
                }
            }
            if let Some(event) = event {
                if let EntityEvent::SwitchActivated { exit } = event {
                    registry.entity_mut(exit).active = true;
                }
                log::trace!("Frame {frame}: entity {} (type {entity_type}) {event:?}", id.0);
                log.push(CollisionRecord {
                    frame,
                    entity: id,
                    entity_type,
                    event,
                });
            }
        }
    }

    fn depenetrate_from_entity(&mut self, pen: Penetration) {
        let n = pen.normal;
        self.pos += n * pen.depth;
        if self.vel.dot(n) < 0.0 {
            let along = self.vel.x * n.y - self.vel.y * n.x;
            self.vel = DVec2::new(along * n.y, -along * n.x);
        }
        if n.y <= -0.0001 {
            self.floor_count += 1;
            self.floor_normal_sum += n;
        }
        if n.y >= 0.0001 {
            self.ceiling_count += 1;
            self.ceiling_normal_sum += n;
        }
    }

    /// Sweep against tiles to avoid tunnelling, then push out of the
    /// closest surface until nothing overlaps
    pub fn collide_vs_tiles(&mut self, registry: &SpatialRegistry, cache: &mut CollisionCache) {
        let delta = self.pos - self.old_pos;
        let t = sweep_circle_vs_tiles(registry, cache, self.old_pos, delta, ACTOR_RADIUS * 0.5);
        self.pos = self.old_pos + delta * t;

        for _ in 0..MAX_DEPENETRATION_STEPS {
            let Some((facing, point)) = get_single_closest_point(registry, cache, self.pos, ACTOR_RADIUS) else {
                break;
            };
            // Points away from the solid side
            let d = (self.pos - point) * facing;
            let dist = d.length();
            let depen = ACTOR_RADIUS - dist * facing;
            if dist == 0.0 || depen < 0.0000001 {
                return;
            }
            self.pos += d / dist * depen;

            if self.vel.dot(d) < 0.0 {
                let along = (self.vel.x * d.y - self.vel.y * d.x) / (dist * dist);
                self.vel = DVec2::new(along * d.y, -along * d.x);
            }

            // Walls count as ceilings
            if d.y >= -0.0001 {
                self.ceiling_count += 1;
                self.ceiling_normal_sum += d / dist;
            } else {
                self.floor_count += 1;
                self.floor_normal_sum += d / dist;
            }
        }
    }

    /// Derive wall, floor and ceiling contact from this tick's collisions
    pub fn post_collision(&mut self, registry: &SpatialRegistry, cache: &mut CollisionCache) {
        let mut wall_normal = 0.0;
        for id in registry.neighbourhood(self.pos) {
            let entity = registry.entity(id);
            if entity.active
                && let Some(n) = entity.wall_normal(self.pos)
            {
                wall_normal += n;
            }
        }
        let rad = ACTOR_RADIUS + 0.1;
        for &id in cache.segments_in_region(registry, self.pos - rad, self.pos + rad) {
            let d = self.pos - registry.segment(id).closest_point(self.pos).point;
            let dist = d.length();
            if d.y.abs() < 0.00001 && dist > 0.0 && dist <= rad {
                wall_normal += d.x / dist;
            }
        }

        self.airborne_old = self.airborne;
        self.airborne = true;
        self.walled = false;
        if wall_normal != 0.0 {
            self.walled = true;
            self.wall_normal = wall_normal.signum();
        }

        if self.floor_count > 0 {
            self.airborne = false;
            self.floor_normal = self.floor_normal_sum.try_normalize().unwrap_or(DVec2::NEG_Y);
            if self.state != ActorState::Celebrating && self.airborne_old {
                let impact = -self.floor_normal.dot(self.old_vel);
                if impact > MAX_SURVIVABLE_IMPACT - 4.0 / 3.0 * self.floor_normal.y.abs() {
                    self.vel = self.old_vel;
                    self.kill();
                }
            }
        }

        if self.ceiling_count > 0 {
            self.ceiling_normal = self.ceiling_normal_sum.try_normalize().unwrap_or(DVec2::Y);
            if self.state != ActorState::Celebrating {
                let impact = -self.ceiling_normal.dot(self.old_vel);
                if impact > MAX_SURVIVABLE_IMPACT - 4.0 / 3.0 * self.ceiling_normal.y.abs() {
                    self.vel = self.old_vel;
                    self.kill();
                }
            }
        }
    }

    // === Control ===

    /// Update buffers and the movement state from this tick's inputs and contacts
    pub fn think(&mut self) {
        let new_jump = self.jump_input && !self.jump_input_old;
        self.jump_input_old = self.jump_input;

        self.launch_pad_buffer = step_buffer(self.launch_pad_buffer, 3);
        let in_lp_buffer = in_buffer(self.launch_pad_buffer, 4);
        self.jump_buffer = step_buffer(self.jump_buffer, 5);
        let in_jump_buffer = in_buffer(self.jump_buffer, 5);
        self.wall_buffer = step_buffer(self.wall_buffer, 5);
        let in_wall_buffer = in_buffer(self.wall_buffer, 5);
        self.floor_buffer = step_buffer(self.floor_buffer, 5);
        let in_floor_buffer = in_buffer(self.floor_buffer, 5);

        if new_jump && self.airborne {
            self.jump_buffer = 0;
        }
        if self.walled {
            self.wall_buffer = 0;
        }
        if !self.airborne {
            self.floor_buffer = 0;
        }

        match self.state {
            ActorState::Dead | ActorState::Disabled => return,
            ActorState::AwaitingDeath => {
                self.state = ActorState::Dead;
                return;
            }
            ActorState::Celebrating => {
                self.drag = if self.airborne { DRAG_REGULAR } else { DRAG_SLOW };
                return;
            }
            _ => {}
        }

        let hor = self.hor_input as f64;
        let jumping = in_jump_buffer || new_jump;
        if !self.airborne {
            self.think_grounded(hor, jumping, new_jump && in_lp_buffer);
        } else {
            self.think_airborne(hor, new_jump, jumping, in_wall_buffer, in_floor_buffer, in_lp_buffer);
        }
    }

    fn think_grounded(&mut self, hor: f64, jumping: bool, lp_jump: bool) {
        let xspeed_new = self.vel.x + GROUND_ACCEL * hor;
        if xspeed_new.abs() < MAX_HOR_SPEED {
            self.vel.x = xspeed_new;
        }
        if !self.state.is_grounded() {
            if self.state == ActorState::Jumping {
                self.gravity = GRAVITY_FALL;
            }
            self.state = if self.vel.x * hor <= 0.0 {
                ActorState::GroundSliding
            } else {
                ActorState::Running
            };
        }

        if jumping {
            if lp_jump {
                self.lp_jump();
            } else {
                self.floor_jump(hor);
            }
            return;
        }

        let n = self.floor_normal;
        let projection = (self.vel.y * n.x - self.vel.x * n.y).abs();
        match self.state {
            ActorState::GroundSliding => {
                if hor * projection * self.vel.x > 0.0 {
                    self.state = ActorState::Running;
                    return;
                }
                if projection < 0.1 && n.x == 0.0 {
                    self.state = ActorState::Immobile;
                    return;
                }
                if self.vel.y < 0.0 && n.x != 0.0 {
                    // Uphill slides lose speed along the slope
                    let speed = self.vel.length();
                    let friction = (self.vel.x * (1.0 - FRICTION_GROUND) * n.y).abs();
                    let reduced = speed - friction * n.y * n.y;
                    self.vel *= reduced / speed;
                    return;
                }
                self.vel.x *= FRICTION_GROUND;
            }
            ActorState::Running => {
                if hor * projection * self.vel.x > 0.0 {
                    // Flat ground or downhill
                    if hor * n.x >= 0.0 {
                        return;
                    }
                    if xspeed_new.abs() < MAX_HOR_SPEED {
                        let boost = GROUND_ACCEL / 2.0 * hor;
                        self.vel += DVec2::new(boost * n.y * n.y, boost * n.y * -n.x);
                    }
                    return;
                }
                self.state = ActorState::GroundSliding;
            }
            _ => {
                if hor != 0.0 {
                    self.state = ActorState::Running;
                    return;
                }
                if projection < 0.1 {
                    self.vel.x *= FRICTION_GROUND_SLOW;
                    return;
                }
                self.state = ActorState::GroundSliding;
            }
        }
    }

    fn think_airborne(
        &mut self,
        hor: f64,
        new_jump: bool,
        jumping: bool,
        in_wall_buffer: bool,
        in_floor_buffer: bool,
        in_lp_buffer: bool,
    ) {
        let xspeed_new = self.vel.x + AIR_ACCEL * hor;
        if xspeed_new.abs() < MAX_HOR_SPEED {
            self.vel.x = xspeed_new;
        }
        if self.state.is_grounded() {
            self.state = ActorState::Falling;
            return;
        }
        if self.state == ActorState::Jumping {
            self.jump_duration += 1;
            if !self.jump_input || self.jump_duration > MAX_JUMP_DURATION {
                self.gravity = GRAVITY_FALL;
                self.state = ActorState::Falling;
                return;
            }
        }

        if jumping {
            if self.walled || in_wall_buffer {
                self.wall_jump(hor);
                return;
            }
            if in_floor_buffer {
                self.floor_jump(hor);
                return;
            }
            if in_lp_buffer && new_jump {
                self.lp_jump();
                return;
            }
        }

        if !self.walled {
            if self.state == ActorState::WallSliding {
                self.state = ActorState::Falling;
            }
        } else if self.state == ActorState::WallSliding {
            if hor * self.wall_normal <= 0.0 {
                self.vel.y *= FRICTION_WALL;
            } else {
                self.state = ActorState::Falling;
            }
        } else if self.vel.y > 0.0 && hor * self.wall_normal < 0.0 {
            if self.state == ActorState::Jumping {
                self.gravity = GRAVITY_FALL;
            }
            self.state = ActorState::WallSliding;
        }
    }

    fn start_jump(&mut self, jump: DVec2) {
        self.state = ActorState::Jumping;
        self.gravity = GRAVITY_JUMP;
        if self.vel.y > 0.0 {
            self.vel.y = 0.0;
        }
        self.vel += jump;
        self.pos += jump;
        self.jump_duration = 0;
        self.jump_buffer = -1;
        self.launch_pad_buffer = -1;
    }

    fn floor_jump(&mut self, hor: f64) {
        self.floor_buffer = -1;
        let n = self.floor_normal;
        let jump = if n.x == 0.0 {
            DVec2::new(0.0, -2.0)
        } else if self.vel.x * n.x >= 0.0 {
            // Downhill
            if self.vel.x * hor >= 0.0 {
                DVec2::new(2.0 / 3.0 * n.x, 2.0 * n.y)
            } else {
                DVec2::new(0.0, -1.4)
            }
        } else if self.vel.x * hor > 0.0 {
            // Uphill, forward
            DVec2::new(0.0, -1.4)
        } else {
            // Uphill, perpendicular
            self.vel.x = 0.0;
            DVec2::new(2.0 / 3.0 * n.x, 2.0 * n.y)
        };
        self.start_jump(jump);
    }

    fn wall_jump(&mut self, hor: f64) {
        let (jx, jy) = if hor * self.wall_normal < 0.0 && self.state == ActorState::WallSliding {
            (2.0 / 3.0, -1.0)
        } else {
            (1.0, -1.4)
        };
        if self.vel.x * self.wall_normal < 0.0 {
            self.vel.x = 0.0;
        }
        self.wall_buffer = -1;
        self.start_jump(DVec2::new(jx * self.wall_normal, jy));
    }

    fn lp_jump(&mut self) {
        self.floor_buffer = -1;
        self.wall_buffer = -1;
        self.jump_buffer = -1;
        self.launch_pad_buffer = -1;
        let mut scalar = 2.0 * self.lp_boost_dir.x.abs() + 2.0;
        if scalar == 2.0 {
            scalar = 1.7;
        }
        self.vel += DVec2::new(self.lp_boost_dir.x * scalar * 2.0 / 3.0, self.lp_boost_dir.y * scalar);
    }

    // === Animation and logging ===

    /// Advance the animation from the current state
    pub fn update_graphics(&mut self) {
        if self.hor_input != 0 {
            self.facing = self.hor_input;
        }
        let anim = match self.state {
            ActorState::Immobile => 0,
            ActorState::Running => 1,
            ActorState::GroundSliding => 2,
            ActorState::Jumping => 3,
            ActorState::Falling => 4,
            ActorState::WallSliding => 5,
            ActorState::Celebrating => 6,
            ActorState::Dead | ActorState::AwaitingDeath => DEAD_ANIM_STATE,
            ActorState::Disabled => return,
        };
        if anim == self.anim_state {
            self.anim_frame += 1;
        } else {
            self.anim_state = anim;
            self.anim_frame = 0;
        }
    }

    /// Hold the dead pose
    pub fn pin_dead_animation(&mut self) {
        self.anim_frame = DEAD_ANIM_FRAME;
        self.anim_state = DEAD_ANIM_STATE;
    }

    pub fn log(&mut self, frame: u64) {
        self.position_log.push(ActorLogEntry {
            frame,
            pos: self.pos,
            vel: self.vel,
            state: self.state,
        });
    }
}
