//! Input replays
//!
//! A replay is one byte per frame. Each byte packs the horizontal direction
//! and the jump button the way N++ stores them.

use serde::{Deserialize, Serialize};

use super::actor::ActorState;
use super::state::{Simulation, Snapshot};
use super::tick::TickInput;

const HORIZONTAL: [i8; 8] = [0, 0, 1, 1, -1, -1, -1, -1];
const JUMP: [bool; 8] = [false, true, false, true, false, true, false, true];

/// Decode one replay byte. Bytes above 7 are treated as no input.
pub fn decode_input(byte: u8) -> TickInput {
    match HORIZONTAL.get(byte as usize) {
        Some(&horizontal) => TickInput {
            horizontal,
            jump: JUMP[byte as usize],
        },
        None => {
            log::warn!("Replay byte {byte} out of range, using no input");
            TickInput::default()
        }
    }
}

/// How a replay ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplayResult {
    Won,
    Died,
    /// Inputs ran out first
    Incomplete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayOutcome {
    pub result: ReplayResult,
    pub frames: u64,
    pub gold_collected: u32,
    pub doors_opened: u32,
    pub final_state: Snapshot,
}

/// Tick `sim` once per input byte, stopping early when the actor dies or
/// reaches the exit
pub fn run_replay(sim: &mut Simulation, inputs: &[u8]) -> ReplayOutcome {
    for &byte in inputs {
        if sim.is_finished() {
            break;
        }
        super::tick::tick(sim, &decode_input(byte));
    }

    let actor = sim.actor();
    let result = match actor.map(|a| a.state) {
        Some(ActorState::Celebrating) => ReplayResult::Won,
        Some(ActorState::Dead | ActorState::AwaitingDeath) => ReplayResult::Died,
        _ => ReplayResult::Incomplete,
    };
    log::info!("Replay finished after {} frames: {result:?}", sim.frame());
    ReplayOutcome {
        result,
        frames: sim.frame(),
        gold_collected: actor.map_or(0, |a| a.gold_collected),
        doors_opened: actor.map_or(0, |a| a.doors_opened),
        final_state: sim.snapshot(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::TYPE_TOGGLE_MINE;
    use crate::sim::map::MapBuilder;

    #[test]
    fn test_decode_input_table() {
        assert_eq!(decode_input(0), TickInput::default());
        assert_eq!(decode_input(1), TickInput { horizontal: 0, jump: true });
        assert_eq!(decode_input(2), TickInput { horizontal: 1, jump: false });
        assert_eq!(decode_input(3), TickInput { horizontal: 1, jump: true });
        assert_eq!(decode_input(4), TickInput { horizontal: -1, jump: false });
        assert_eq!(decode_input(7), TickInput { horizontal: -1, jump: true });
    }

    #[test]
    fn test_decode_out_of_range_is_neutral() {
        assert_eq!(decode_input(8), TickInput::default());
        assert_eq!(decode_input(255), TickInput::default());
    }

    #[test]
    fn test_replay_runs_out_of_inputs() {
        let mut sim = Simulation::default();
        sim.load(&MapBuilder::new().fill(1, 20, 42, 20, 1).spawn(20, 76, 1).build())
            .unwrap();
        let outcome = run_replay(&mut sim, &[0; 30]);
        assert_eq!(outcome.result, ReplayResult::Incomplete);
        assert_eq!(outcome.frames, 30);
    }

    #[test]
    fn test_replay_stops_on_death() {
        let mut sim = Simulation::default();
        // Mine right where the actor spawns
        let bytes = MapBuilder::new()
            .fill(1, 20, 42, 20, 1)
            .spawn(20, 76, 1)
            .entity(TYPE_TOGGLE_MINE, 20, 76, 0, 0)
            .build();
        sim.load(&bytes).unwrap();
        let outcome = run_replay(&mut sim, &[0; 50]);
        assert_eq!(outcome.result, ReplayResult::Died);
        assert!(outcome.frames < 50);
        assert!(outcome.final_state.actor.is_some());
    }
}
