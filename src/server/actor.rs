//! The server's single actor: owns every mutable piece of server state and
//! is the only task that ever touches it, so no locking is needed even
//! though connection reader/writer tasks run concurrently (spec §5; see
//! Design Notes "Shared mutable state without threads"). Grounded on
//! `examples/original_source/src/server.h`'s `RobotsServer` class, reshaped
//! from callback-driven Boost.Asio into a `tokio::select!` event loop that
//! drains one `mpsc` channel fed by every connection.

use super::state::{GameState, Phase, ServerConfig};
use crate::logger::Logger;
use crate::protocol::{ClientMessage, Player, ServerMessage};
use crate::rng::Lcg;
use bytes::Bytes;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Hard cap on concurrent TCP connections (spec §4.2;
/// `examples/original_source/src/types.h::MAX_SERVER_CONNECTIONS`).
pub const MAX_CONNECTIONS: usize = 25;

pub enum ActorEvent {
    Accepted { conn_id: u64, addr: SocketAddr, outbound: mpsc::UnboundedSender<Bytes> },
    Inbound { conn_id: u64, message: ClientMessage },
    Disconnected { conn_id: u64 },
}

struct Connection {
    outbound: mpsc::UnboundedSender<Bytes>,
}

pub struct ServerActor {
    config: ServerConfig,
    logger: Arc<Logger>,
    rng: Lcg,
    phase: Phase,
    game: GameState,
    connections: HashMap<u64, Connection>,
    conn_addr: HashMap<u64, SocketAddr>,
    conn_to_player: HashMap<u64, u8>,
    next_player_id: u8,
    pending_inputs: HashMap<u8, ClientMessage>,
    /// AcceptedPlayer/GameStarted/Turn messages since the current epoch, in
    /// broadcast order, used to catch up late joiners (Glossary "Replay
    /// log"). Cleared on every GAME->LOBBY transition.
    replay_log: Vec<ServerMessage>,
    deadline: Option<Instant>,
}

impl ServerActor {
    pub fn new(config: ServerConfig, logger: Arc<Logger>) -> Self {
        let seed = config.seed;
        Self {
            config,
            logger,
            rng: Lcg::new(seed),
            phase: Phase::Lobby,
            game: GameState::default(),
            connections: HashMap::new(),
            conn_addr: HashMap::new(),
            conn_to_player: HashMap::new(),
            next_player_id: 0,
            pending_inputs: HashMap::new(),
            replay_log: Vec::new(),
            deadline: None,
        }
    }

    pub async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ActorEvent>) {
        loop {
            let deadline = self.deadline;
            tokio::select! {
                event = rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => break,
                    }
                }
                _ = wait_deadline(deadline) => {
                    self.fire_turn();
                }
            }
        }
    }

    fn handle_event(&mut self, event: ActorEvent) {
        match event {
            ActorEvent::Accepted { conn_id, addr, outbound } => self.handle_accepted(conn_id, addr, outbound),
            ActorEvent::Inbound { conn_id, message } => self.handle_inbound(conn_id, message),
            ActorEvent::Disconnected { conn_id } => self.handle_disconnected(conn_id),
        }
    }

    fn handle_accepted(&mut self, conn_id: u64, addr: SocketAddr, outbound: mpsc::UnboundedSender<Bytes>) {
        self.logger.verbose(format!("connection {conn_id} accepted from {addr}"));
        self.connections.insert(conn_id, Connection { outbound });
        self.conn_addr.insert(conn_id, addr);

        let hello = ServerMessage::Hello(crate::protocol::HelloParams {
            server_name: self.config.server_name.clone(),
            players_count: self.config.players_count,
            size_x: self.config.size_x,
            size_y: self.config.size_y,
            game_length: self.config.game_length,
            explosion_radius: self.config.explosion_radius,
            bomb_timer: self.config.bomb_timer,
        });
        self.send_to(conn_id, &hello);
        for message in self.replay_log.clone() {
            self.send_to(conn_id, &message);
        }
    }

    fn handle_disconnected(&mut self, conn_id: u64) {
        self.logger.verbose(format!("connection {conn_id} disconnected"));
        self.connections.remove(&conn_id);
        self.conn_addr.remove(&conn_id);
        self.conn_to_player.remove(&conn_id);
    }

    fn handle_inbound(&mut self, conn_id: u64, message: ClientMessage) {
        let promoted_player = self.conn_to_player.get(&conn_id).copied();

        match promoted_player {
            Some(player_id) => {
                // Buffered regardless of phase; only consumed during GAME
                // (spec §4.2: "Messages from already-promoted peers are
                // buffered ... but not acted on until GAME").
                self.pending_inputs.insert(player_id, message);
            }
            None if self.phase == Phase::Lobby => {
                if let ClientMessage::Join { name } = message {
                    self.accept_join(conn_id, name);
                }
                // Any other message from an unpromoted peer is ignored,
                // not fatal (spec §4.2).
            }
            None => {
                // Unpromoted peer during GAME: a pure observer until the
                // current game ends (client-side OBSERVE state, spec §4.4).
            }
        }

        if self.phase == Phase::Lobby {
            self.maybe_start_game();
        }
    }

    fn accept_join(&mut self, conn_id: u64, name: String) {
        let player_id = self.next_player_id;
        self.next_player_id += 1;

        let addr = self.conn_addr[&conn_id];
        let player = Player { name, address: crate::protocol::format_address(addr) };
        self.game.players.insert(player_id, player.clone());
        self.conn_to_player.insert(conn_id, player_id);

        let message = ServerMessage::AcceptedPlayer { player_id, player };
        self.broadcast(&message);
        self.replay_log.push(message);
    }

    fn maybe_start_game(&mut self) {
        if self.game.players.len() != self.config.players_count as usize {
            return;
        }

        let players: Vec<(u8, Player)> =
            self.game.players.iter().map(|(&id, p)| (id, p.clone())).collect();
        let started = ServerMessage::GameStarted { players };
        self.broadcast(&started);
        self.replay_log.push(started);

        let events = self.game.start_game(&self.config, &mut self.rng);
        let turn = ServerMessage::Turn { turn: 0, events };
        self.broadcast(&turn);
        self.replay_log.push(turn);

        self.phase = Phase::Game;
        self.deadline = Some(Instant::now() + Duration::from_millis(self.config.turn_duration_ms));
        self.logger.info("game started");
    }

    fn fire_turn(&mut self) {
        let events = self.game.process_turn(&self.config, &mut self.rng, &mut self.pending_inputs);
        let turn_number = self.game.turn;
        let turn = ServerMessage::Turn { turn: turn_number, events };
        self.broadcast(&turn);
        self.replay_log.push(turn);

        if self.game.should_end(&self.config) {
            let scores: Vec<(u8, u32)> = self.game.scores.iter().map(|(&id, &s)| (id, s)).collect();
            let ended = ServerMessage::GameEnded { scores };
            self.broadcast(&ended);

            self.game.end_game();
            self.replay_log.clear();
            self.next_player_id = 0;
            self.conn_to_player.clear();
            self.pending_inputs.clear();
            self.phase = Phase::Lobby;
            self.deadline = None;
            self.logger.info("game ended");
        } else {
            let previous = self.deadline.expect("fire_turn only runs while a deadline is armed");
            self.deadline = Some(previous + Duration::from_millis(self.config.turn_duration_ms));
        }
    }

    fn broadcast(&mut self, message: &ServerMessage) {
        let bytes = message.encode().freeze();
        let mut dead = Vec::new();
        for (&conn_id, conn) in &self.connections {
            if conn.outbound.send(bytes.clone()).is_err() {
                dead.push(conn_id);
            }
        }
        for conn_id in dead {
            self.handle_disconnected(conn_id);
        }
    }

    fn send_to(&mut self, conn_id: u64, message: &ServerMessage) {
        let bytes = message.encode().freeze();
        let dead = match self.connections.get(&conn_id) {
            Some(conn) => conn.outbound.send(bytes).is_err(),
            None => return,
        };
        if dead {
            self.handle_disconnected(conn_id);
        }
    }
}

async fn wait_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            bomb_timer: 3,
            players_count: 2,
            turn_duration_ms: u64::MAX / 2,
            explosion_radius: 1,
            initial_blocks: 0,
            game_length: 50,
            server_name: "srv".into(),
            port: 0,
            seed: 1,
            size_x: 5,
            size_y: 5,
        }
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::new(std::net::Ipv4Addr::LOCALHOST.into(), port)
    }

    async fn recv_all(rx: &mut mpsc::UnboundedReceiver<Bytes>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(bytes) = rx.try_recv() {
            let mut cursor = std::io::Cursor::new(bytes.as_ref());
            out.push(ServerMessage::decode(&mut cursor).await.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn late_joiner_receives_hello_then_the_full_replay_log() {
        let mut actor = ServerActor::new(config(), Arc::new(Logger::new(0)));

        let (tx0, mut rx0) = mpsc::unbounded_channel::<Bytes>();
        actor.handle_accepted(0, addr(1), tx0);
        let _ = recv_all(&mut rx0).await; // Hello only, nothing promoted yet.
        actor.handle_inbound(0, ClientMessage::Join { name: "alice".into() });

        let (tx1, mut rx1) = mpsc::unbounded_channel::<Bytes>();
        actor.handle_accepted(1, addr(2), tx1);
        let _ = recv_all(&mut rx1).await;
        // Second Join completes the lobby and starts the game.
        actor.handle_inbound(1, ClientMessage::Join { name: "bob".into() });

        // A late joiner connecting once the game is under way.
        let (tx2, mut rx2) = mpsc::unbounded_channel::<Bytes>();
        actor.handle_accepted(2, addr(3), tx2);
        let replay = recv_all(&mut rx2).await;

        assert!(matches!(replay[0], ServerMessage::Hello(_)));
        assert!(matches!(replay[1], ServerMessage::AcceptedPlayer { player_id: 0, .. }));
        assert!(matches!(replay[2], ServerMessage::AcceptedPlayer { player_id: 1, .. }));
        assert!(matches!(replay[3], ServerMessage::GameStarted { .. }));
        assert!(matches!(replay[4], ServerMessage::Turn { turn: 0, .. }));
        assert_eq!(replay.len(), 5);
    }

    #[tokio::test]
    async fn two_independent_actors_with_identical_inputs_broadcast_identical_streams() {
        async fn drive() -> Vec<ServerMessage> {
            let mut actor = ServerActor::new(config(), Arc::new(Logger::new(0)));
            let (tx0, mut rx0) = mpsc::unbounded_channel::<Bytes>();
            actor.handle_accepted(0, addr(1), tx0);
            let (tx1, mut rx1) = mpsc::unbounded_channel::<Bytes>();
            actor.handle_accepted(1, addr(2), tx1);
            let _ = recv_all(&mut rx0).await;
            let _ = recv_all(&mut rx1).await;

            actor.handle_inbound(0, ClientMessage::Join { name: "alice".into() });
            actor.handle_inbound(1, ClientMessage::Join { name: "bob".into() });

            let mut stream = recv_all(&mut rx0).await;
            actor.handle_inbound(0, ClientMessage::PlaceBomb);
            actor.fire_turn();
            stream.extend(recv_all(&mut rx0).await);
            stream
        }

        let a = drive().await;
        let b = drive().await;
        assert_eq!(a, b);
        assert!(a.iter().any(|m| matches!(m, ServerMessage::Turn { turn: 1, .. })));
    }

    #[tokio::test]
    async fn game_end_clears_promotions_and_requires_fresh_joins_to_start_again() {
        let mut cfg = config();
        cfg.game_length = 1;
        let mut actor = ServerActor::new(cfg, Arc::new(Logger::new(0)));

        let (tx0, mut rx0) = mpsc::unbounded_channel::<Bytes>();
        actor.handle_accepted(0, addr(1), tx0);
        let (tx1, mut rx1) = mpsc::unbounded_channel::<Bytes>();
        actor.handle_accepted(1, addr(2), tx1);
        let _ = recv_all(&mut rx0).await;
        let _ = recv_all(&mut rx1).await;

        actor.handle_inbound(0, ClientMessage::Join { name: "alice".into() });
        actor.handle_inbound(1, ClientMessage::Join { name: "bob".into() });
        let _ = recv_all(&mut rx0).await;

        // game_length == 1, so this single fire_turn ends the game.
        actor.fire_turn();
        let ended = recv_all(&mut rx0).await;
        assert!(ended.iter().any(|m| matches!(m, ServerMessage::GameEnded { .. })));
        assert_eq!(actor.game.players.len(), 0);
        assert_eq!(actor.next_player_id, 0);
        assert!(actor.conn_to_player.is_empty());
        assert!(actor.pending_inputs.is_empty());

        // The same two connections send PlaceBomb, not Join: without a fresh
        // Join a stale conn_to_player promotion would silently buffer this
        // and a second game would auto-start with no replay history.
        actor.handle_inbound(0, ClientMessage::PlaceBomb);
        actor.handle_inbound(1, ClientMessage::PlaceBomb);
        assert_eq!(actor.phase, Phase::Lobby);
        assert_eq!(actor.game.players.len(), 0);

        actor.handle_inbound(0, ClientMessage::Join { name: "alice".into() });
        actor.handle_inbound(1, ClientMessage::Join { name: "bob".into() });
        assert_eq!(actor.phase, Phase::Game);
    }
}
