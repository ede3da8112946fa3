//! The client's replicated mirror of the server's game world (spec §3,
//! §4.4). Grounded on `examples/original_source/src/client.h`'s
//! `process_*` family, reshaped into a single `apply_turn` that returns the
//! data a fresh `Game` draw message needs rather than pushing straight onto
//! a send queue (the multiplexer, `src/client/multiplexer.rs`, owns that).

use crate::game::Bomb;
use crate::protocol::{DrawBomb, Event, HelloParams, Player, Position};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Default)]
pub struct ClientGameState {
    pub players: BTreeMap<u8, Player>,
    pub player_to_position: HashMap<u8, Position>,
    pub blocks: HashSet<Position>,
    pub bombs: HashMap<u32, Bomb>,
    pub scores: HashMap<u8, u32>,
}

/// Everything a fresh `Game` draw message needs beyond the cached
/// `HelloParams` and player roster.
pub struct TurnSnapshot {
    pub player_positions: Vec<(u8, Position)>,
    pub blocks: Vec<Position>,
    pub bombs: Vec<DrawBomb>,
    pub explosions: Vec<Position>,
    pub scores: Vec<(u8, u32)>,
}

impl ClientGameState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn on_game_started(&mut self, players: &[(u8, Player)]) {
        self.players = players.iter().cloned().collect();
        self.scores = players.iter().map(|&(id, _)| (id, 0)).collect();
    }

    /// Replays one `Turn`'s events against the mirror (spec §4.4) and
    /// returns the snapshot for the resulting `Game` draw message.
    ///
    /// A `BombExploded` naming an unknown `bomb_id` is tolerated: the
    /// server is authoritative, so the destroyed-robots/blocks effects
    /// still apply, but there is no position to add to the visual
    /// `explosions` set (spec §4.4 "Robustness", §9).
    pub fn apply_turn(&mut self, hello: &HelloParams, events: &[Event]) -> TurnSnapshot {
        let mut scored: HashSet<u8> = HashSet::new();
        let mut blocks_destroyed: HashSet<Position> = HashSet::new();
        let mut explosions: HashSet<Position> = HashSet::new();

        for event in events {
            match event {
                Event::BombPlaced { bomb_id, position } => {
                    self.bombs.insert(*bomb_id, Bomb { position: *position, timer: hello.bomb_timer });
                }
                Event::BombExploded { bomb_id, robots_destroyed, blocks_destroyed: destroyed } => {
                    if let Some(bomb) = self.bombs.remove(bomb_id) {
                        explosions.insert(bomb.position);
                    }
                    scored.extend(robots_destroyed.iter().copied());
                    blocks_destroyed.extend(destroyed.iter().copied());
                }
                Event::PlayerMoved { player_id, position } => {
                    self.player_to_position.insert(*player_id, *position);
                }
                Event::BlockPlaced { position } => {
                    self.blocks.insert(*position);
                }
            }
        }

        for player_id in scored {
            *self.scores.entry(player_id).or_insert(0) += 1;
        }
        for bomb in self.bombs.values_mut() {
            bomb.timer = bomb.timer.saturating_sub(1);
        }
        for position in &blocks_destroyed {
            self.blocks.remove(position);
        }

        TurnSnapshot {
            player_positions: self.player_to_position.iter().map(|(&id, &pos)| (id, pos)).collect(),
            blocks: self.blocks.iter().copied().collect(),
            bombs: self.bombs.iter().map(|(_, b)| DrawBomb { position: b.position, timer: b.timer }).collect(),
            explosions: explosions.into_iter().collect(),
            scores: self.scores.iter().map(|(&id, &s)| (id, s)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::HelloParams;

    fn hello() -> HelloParams {
        HelloParams {
            server_name: "srv".into(),
            players_count: 2,
            size_x: 10,
            size_y: 10,
            game_length: 50,
            explosion_radius: 3,
            bomb_timer: 5,
        }
    }

    #[test]
    fn bomb_exploded_with_unknown_bomb_id_still_applies_destruction() {
        let mut state = ClientGameState::default();
        state.scores.insert(0, 0);
        let events = vec![Event::BombExploded {
            bomb_id: 999,
            robots_destroyed: vec![0],
            blocks_destroyed: vec![Position::new(1, 1)],
        }];
        let snapshot = state.apply_turn(&hello(), &events);
        assert!(snapshot.explosions.is_empty());
        assert_eq!(state.scores[&0], 1);
    }

    #[test]
    fn bomb_placed_then_exploded_adds_its_position_to_explosions() {
        let mut state = ClientGameState::default();
        let events = vec![
            Event::BombPlaced { bomb_id: 1, position: Position::new(2, 2) },
            Event::BombExploded { bomb_id: 1, robots_destroyed: vec![], blocks_destroyed: vec![] },
        ];
        let snapshot = state.apply_turn(&hello(), &events);
        assert_eq!(snapshot.explosions, vec![Position::new(2, 2)]);
        assert!(state.bombs.is_empty());
    }

    #[test]
    fn a_player_destroyed_by_two_bombs_in_one_turn_scores_once() {
        let mut state = ClientGameState::default();
        state.scores.insert(0, 0);
        let events = vec![
            Event::BombExploded { bomb_id: 1, robots_destroyed: vec![0], blocks_destroyed: vec![] },
            Event::BombExploded { bomb_id: 2, robots_destroyed: vec![0], blocks_destroyed: vec![] },
        ];
        state.apply_turn(&hello(), &events);
        assert_eq!(state.scores[&0], 1);
    }
}
