//! Authoritative game state and per-turn simulation (spec §4.3).
//!
//! Grounded on `examples/original_source/src/server.h`
//! (`start_game`/`process_bombs`/`process_players`/`process_one_turn`);
//! reshaped from that file's single monolithic class into free methods on
//! [`GameState`] that return the turn's `Event` list rather than pushing
//! directly onto a send queue, so the actor (`src/server/actor.rs`) owns all
//! I/O and this module stays pure simulation.

use crate::game::{explosion_footprint, Bomb};
use crate::protocol::{ClientMessage, Event, Player, Position};
use crate::rng::Lcg;
use std::collections::{HashMap, HashSet};

/// Operator-supplied, immutable for the process lifetime (spec §6).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bomb_timer: u16,
    pub players_count: u8,
    pub turn_duration_ms: u64,
    pub explosion_radius: u16,
    pub initial_blocks: u16,
    pub game_length: u16,
    pub server_name: String,
    pub port: u16,
    pub seed: u32,
    pub size_x: u16,
    pub size_y: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lobby,
    Game,
}

/// The authoritative world (spec §3). Every field here is cleared on the
/// GAME->LOBBY transition (spec §4.3 step 5); a new game requires fresh
/// `Join`s. TCP connections themselves are a separate concern tracked by
/// `ServerActor`, not `GameState`, and stay open across the reset.
#[derive(Debug, Default)]
pub struct GameState {
    pub players: std::collections::BTreeMap<u8, Player>,
    pub player_to_position: HashMap<u8, Position>,
    pub blocks: HashSet<Position>,
    pub bombs: HashMap<u32, Bomb>,
    pub scores: HashMap<u8, u32>,
    pub turn: u16,
    pub next_bomb_id: u32,
}

impl GameState {
    /// Clears everything the GAME phase accumulated, per spec §4.3 step 5.
    fn reset_for_new_game(&mut self) {
        self.players.clear();
        self.player_to_position.clear();
        self.blocks.clear();
        self.bombs.clear();
        self.scores.clear();
        self.turn = 0;
        self.next_bomb_id = 0;
    }

    /// LOBBY->GAME transition (spec §4.3): seeds initial positions and
    /// blocks, in that order, consuming `rng` deterministically, and returns
    /// the event list for `Turn(0, ...)`.
    pub fn start_game(&mut self, config: &ServerConfig, rng: &mut Lcg) -> Vec<Event> {
        let mut events = Vec::new();

        let player_ids: Vec<u8> = self.players.keys().copied().collect();
        for player_id in player_ids {
            let pos = Position::new(
                rng.next_bounded(config.size_x as u32) as u16,
                rng.next_bounded(config.size_y as u32) as u16,
            );
            self.player_to_position.insert(player_id, pos);
            self.scores.insert(player_id, 0);
            events.push(Event::PlayerMoved { player_id, position: pos });
        }

        for _ in 0..config.initial_blocks {
            let pos = Position::new(
                rng.next_bounded(config.size_x as u32) as u16,
                rng.next_bounded(config.size_y as u32) as u16,
            );
            self.blocks.insert(pos);
            events.push(Event::BlockPlaced { position: pos });
        }

        events
    }

    /// One turn's worth of bomb resolution, input application, and scoring
    /// (spec §4.3 steps 1-4). `inputs` is this turn's buffered
    /// `player_id -> last message` map; it is drained (not just read) since
    /// the caller clears it afterwards per step 4.
    pub fn process_turn(
        &mut self,
        config: &ServerConfig,
        rng: &mut Lcg,
        inputs: &mut HashMap<u8, ClientMessage>,
    ) -> Vec<Event> {
        let mut events = Vec::new();
        let mut robots_destroyed: HashSet<u8> = HashSet::new();
        let mut blocks_destroyed: HashSet<Position> = HashSet::new();

        // Step 1: resolve explosions. Bomb ids are iterated in ascending
        // order so identical inputs always produce byte-identical streams
        // (spec's determinism property) regardless of hash-map iteration
        // order.
        let mut bomb_ids: Vec<u32> = self.bombs.keys().copied().collect();
        bomb_ids.sort_unstable();
        let mut exploded_ids = Vec::new();
        for bomb_id in bomb_ids {
            let bomb = self.bombs.get_mut(&bomb_id).expect("bomb_id from bombs.keys()");
            bomb.timer -= 1;
            if bomb.timer != 0 {
                continue;
            }
            exploded_ids.push(bomb_id);

            let footprint =
                explosion_footprint(bomb.position, config.explosion_radius, config.size_x, config.size_y, &self.blocks);
            let mut footprint: Vec<Position> = footprint.into_iter().collect();
            footprint.sort_unstable();

            let mut bomb_robots: Vec<u8> = Vec::new();
            let mut bomb_blocks: Vec<Position> = Vec::new();
            for cell in footprint {
                if self.blocks.contains(&cell) {
                    blocks_destroyed.insert(cell);
                    bomb_blocks.push(cell);
                }
                let mut hit: Vec<u8> = self
                    .player_to_position
                    .iter()
                    .filter(|&(_, &pos)| pos == cell)
                    .map(|(&id, _)| id)
                    .collect();
                hit.sort_unstable();
                for player_id in hit {
                    robots_destroyed.insert(player_id);
                    bomb_robots.push(player_id);
                }
            }
            // `bomb_blocks` is already emitted in sorted-cell order above;
            // `bomb_robots` still needs a final sort since a single player
            // only ever occupies one cell, but multiple cells can each
            // contribute ids out of overall order otherwise.
            bomb_robots.sort_unstable();
            events.push(Event::BombExploded {
                bomb_id,
                robots_destroyed: bomb_robots,
                blocks_destroyed: bomb_blocks,
            });
        }
        for bomb_id in &exploded_ids {
            self.bombs.remove(bomb_id);
        }
        // Blocks are removed only after every bomb has been evaluated, so
        // two bombs whose rays share a block both list it as destroyed.
        for pos in &blocks_destroyed {
            self.blocks.remove(pos);
        }

        // Step 2: apply pending inputs, ascending player_id order.
        let player_ids: Vec<u8> = self.players.keys().copied().collect();
        for player_id in player_ids {
            if robots_destroyed.contains(&player_id) {
                let pos = Position::new(
                    rng.next_bounded(config.size_x as u32) as u16,
                    rng.next_bounded(config.size_y as u32) as u16,
                );
                self.player_to_position.insert(player_id, pos);
                events.push(Event::PlayerMoved { player_id, position: pos });
                continue;
            }
            let Some(message) = inputs.get(&player_id) else { continue };
            match message {
                ClientMessage::Join { .. } => {}
                ClientMessage::PlaceBomb => {
                    let position = self.player_to_position[&player_id];
                    let bomb_id = self.next_bomb_id;
                    self.next_bomb_id += 1;
                    self.bombs.insert(bomb_id, Bomb { position, timer: config.bomb_timer });
                    events.push(Event::BombPlaced { bomb_id, position });
                }
                ClientMessage::PlaceBlock => {
                    let position = self.player_to_position[&player_id];
                    if self.blocks.insert(position) {
                        events.push(Event::BlockPlaced { position });
                    }
                }
                ClientMessage::Move(direction) => {
                    let position = self.player_to_position[&player_id];
                    if let Some(next) = direction.step(position, config.size_x, config.size_y) {
                        if !self.blocks.contains(&next) {
                            self.player_to_position.insert(player_id, next);
                            events.push(Event::PlayerMoved { player_id, position: next });
                        }
                    }
                }
            }
        }

        // Step 3: every destroyed player gains exactly one point this turn,
        // regardless of how many bombs killed them (set semantics above).
        for player_id in robots_destroyed {
            *self.scores.entry(player_id).or_insert(0) += 1;
        }

        inputs.clear();
        self.turn += 1;
        events
    }

    pub fn should_end(&self, config: &ServerConfig) -> bool {
        self.turn == config.game_length
    }

    pub fn end_game(&mut self) {
        self.reset_for_new_game();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Direction;

    fn config() -> ServerConfig {
        ServerConfig {
            bomb_timer: 3,
            players_count: 2,
            turn_duration_ms: 50,
            explosion_radius: 3,
            initial_blocks: 0,
            game_length: 50,
            server_name: "srv".into(),
            port: 0,
            seed: 1,
            size_x: 20,
            size_y: 20,
        }
    }

    #[test]
    fn a_player_killed_by_two_bombs_in_one_turn_gains_one_point() {
        let config = config();
        let mut rng = Lcg::new(config.seed);
        let mut state = GameState::default();
        state.players.insert(0, Player { name: "a".into(), address: "x".into() });
        state.players.insert(1, Player { name: "b".into(), address: "y".into() });
        state.player_to_position.insert(0, Position::new(2, 2));
        state.player_to_position.insert(1, Position::new(2, 2));
        state.scores.insert(0, 0);
        state.scores.insert(1, 0);
        state.bombs.insert(0, Bomb { position: Position::new(2, 2), timer: 1 });
        state.bombs.insert(1, Bomb { position: Position::new(2, 2), timer: 1 });

        let mut inputs = HashMap::new();
        let events = state.process_turn(&config, &mut rng, &mut inputs);

        let exploded: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, Event::BombExploded { .. }))
            .collect();
        assert_eq!(exploded.len(), 2);
        assert_eq!(state.scores[&0], 1);
        assert_eq!(state.scores[&1], 1);
    }

    #[test]
    fn bomb_exploded_lists_robots_and_blocks_in_sorted_order() {
        // Three players share a cell with two destructible blocks in the
        // blast radius; insertion order below is deliberately descending so
        // a HashMap/HashSet iteration-order bug would surface as unsorted
        // output (spec §8's cross-process determinism property).
        let config = config();
        let mut rng = Lcg::new(config.seed);
        let mut state = GameState::default();
        for id in [2u8, 1, 0] {
            state.players.insert(id, Player { name: "p".into(), address: "x".into() });
            state.player_to_position.insert(id, Position::new(2, 2));
            state.scores.insert(id, 0);
        }
        state.blocks.insert(Position::new(3, 2));
        state.blocks.insert(Position::new(1, 2));
        state.bombs.insert(0, Bomb { position: Position::new(2, 2), timer: 1 });

        let mut inputs = HashMap::new();
        let events = state.process_turn(&config, &mut rng, &mut inputs);

        let exploded = events
            .iter()
            .find_map(|e| match e {
                Event::BombExploded { robots_destroyed, blocks_destroyed, .. } => {
                    Some((robots_destroyed.clone(), blocks_destroyed.clone()))
                }
                _ => None,
            })
            .expect("bomb should have exploded");
        assert_eq!(exploded.0, vec![0, 1, 2]);
        assert_eq!(exploded.1, vec![Position::new(1, 2), Position::new(3, 2)]);
    }

    #[test]
    fn move_into_a_block_is_a_no_op() {
        let config = config();
        let mut rng = Lcg::new(config.seed);
        let mut state = GameState::default();
        state.players.insert(0, Player { name: "a".into(), address: "x".into() });
        state.player_to_position.insert(0, Position::new(1, 1));
        state.scores.insert(0, 0);
        state.blocks.insert(Position::new(2, 1));

        let mut inputs = HashMap::new();
        inputs.insert(0, ClientMessage::Move(Direction::Right));
        let events = state.process_turn(&config, &mut rng, &mut inputs);

        assert!(events.is_empty());
        assert_eq!(state.player_to_position[&0], Position::new(1, 1));
    }

    #[test]
    fn move_off_the_grid_edge_is_a_no_op() {
        let config = config();
        let mut rng = Lcg::new(config.seed);
        let mut state = GameState::default();
        state.players.insert(0, Player { name: "a".into(), address: "x".into() });
        state.player_to_position.insert(0, Position::new(0, 0));
        state.scores.insert(0, 0);

        let mut inputs = HashMap::new();
        inputs.insert(0, ClientMessage::Move(Direction::Up));
        let events = state.process_turn(&config, &mut rng, &mut inputs);

        assert!(events.is_empty());
        assert_eq!(state.player_to_position[&0], Position::new(0, 0));
    }

    #[test]
    fn place_block_twice_on_the_same_cell_emits_only_one_event() {
        let config = config();
        let mut rng = Lcg::new(config.seed);
        let mut state = GameState::default();
        state.players.insert(0, Player { name: "a".into(), address: "x".into() });
        state.player_to_position.insert(0, Position::new(1, 1));
        state.scores.insert(0, 0);
        state.blocks.insert(Position::new(1, 1));

        let mut inputs = HashMap::new();
        inputs.insert(0, ClientMessage::PlaceBlock);
        let events = state.process_turn(&config, &mut rng, &mut inputs);

        assert!(events.is_empty());
    }
}
