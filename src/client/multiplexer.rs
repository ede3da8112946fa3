//! The client's dual-connection orchestrator (spec §4.4): four logical
//! FIFOs (`inbound_gui`, `inbound_server`, `outbound_server`,
//! `outbound_gui`) implemented as `mpsc` channels, one reader/writer task
//! pair per socket, and a single session task that owns all mutable
//! client-side state. Grounded on
//! `examples/original_source/src/client.h`'s `RobotsClient` (`handle_gui_message`
//! / `handle_server_message` / `process_*`), reshaped from its callback
//! chain into a `tokio::select!` loop over two inbound channels.

use super::state::ClientGameState;
use crate::error::SendError;
use crate::logger::Logger;
use crate::protocol::{
    format_address, ClientMessage, DrawMessage, Event, GuiMessage, HelloParams, ProtocolError,
    ServerMessage,
};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Lobby,
    InGame,
    Observe,
}

enum ClientEvent {
    Gui(GuiMessage),
    Server(ServerMessage),
    Fatal(String),
}

/// The client's replicated view plus the bookkeeping needed to drive the
/// LOBBY/IN_GAME/OBSERVE state machine.
struct Session {
    player_name: String,
    local_tcp_addr: String,
    hello: Option<HelloParams>,
    game: ClientGameState,
    phase: Phase,
    /// Set once an `AcceptedPlayer` names this client's own address. Once
    /// true it stays true for the life of the connection: the server never
    /// forgets an accepted player across LOBBY<->GAME cycles, so neither
    /// does the client (spec §3 "Player" lifecycle).
    accepted_as_self: bool,
    /// Spec §8 "Client LOBBY semantics": one `Join` per LOBBY spell, not one
    /// per GUI input. Reset whenever `Hello` is (re-)received.
    join_sent: bool,
}

impl Session {
    fn new(player_name: String, local_tcp_addr: String) -> Self {
        Self {
            player_name,
            local_tcp_addr,
            hello: None,
            game: ClientGameState::default(),
            phase: Phase::Lobby,
            accepted_as_self: false,
            join_sent: false,
        }
    }

    fn handle_gui(&mut self, message: GuiMessage) -> Option<ClientMessage> {
        match self.phase {
            Phase::Lobby => {
                if self.join_sent {
                    return None;
                }
                self.join_sent = true;
                Some(ClientMessage::Join { name: self.player_name.clone() })
            }
            Phase::InGame => Some(match message {
                GuiMessage::PlaceBomb => ClientMessage::PlaceBomb,
                GuiMessage::PlaceBlock => ClientMessage::PlaceBlock,
                GuiMessage::Move(direction) => ClientMessage::Move(direction),
            }),
            Phase::Observe => None,
        }
    }

    fn handle_server(&mut self, message: ServerMessage, logger: &Logger) -> Option<DrawMessage> {
        match message {
            ServerMessage::Hello(params) => {
                self.game.reset();
                self.phase = Phase::Lobby;
                self.accepted_as_self = false;
                self.join_sent = false;
                let draw = lobby_draw(&params, &self.game.players);
                self.hello = Some(params);
                Some(draw)
            }
            ServerMessage::AcceptedPlayer { player_id, player } => {
                if player.address == self.local_tcp_addr {
                    self.accepted_as_self = true;
                }
                self.game.players.insert(player_id, player);
                let hello = self.hello.as_ref()?;
                Some(lobby_draw(hello, &self.game.players))
            }
            ServerMessage::GameStarted { players } => {
                self.game.on_game_started(&players);
                self.phase = if self.accepted_as_self { Phase::InGame } else { Phase::Observe };
                let hello = self.hello.as_ref()?;
                Some(DrawMessage::Game {
                    server_name: hello.server_name.clone(),
                    size_x: hello.size_x,
                    size_y: hello.size_y,
                    game_length: hello.game_length,
                    turn: 0,
                    players: players_vec(&self.game.players),
                    player_positions: Vec::new(),
                    blocks: Vec::new(),
                    bombs: Vec::new(),
                    explosions: Vec::new(),
                    scores: players_vec(&self.game.players).into_iter().map(|(id, _)| (id, 0)).collect(),
                })
            }
            ServerMessage::Turn { turn, events } => {
                let hello = self.hello.clone()?;
                let snapshot = self.game.apply_turn(&hello, &events);
                log_turn(logger, turn, &events);
                Some(DrawMessage::Game {
                    server_name: hello.server_name,
                    size_x: hello.size_x,
                    size_y: hello.size_y,
                    game_length: hello.game_length,
                    turn,
                    players: players_vec(&self.game.players),
                    player_positions: snapshot.player_positions,
                    blocks: snapshot.blocks,
                    bombs: snapshot.bombs,
                    explosions: snapshot.explosions,
                    scores: snapshot.scores,
                })
            }
            ServerMessage::GameEnded { scores: _ } => {
                self.game.reset();
                self.phase = Phase::Lobby;
                self.join_sent = false;
                let hello = self.hello.as_ref()?;
                Some(lobby_draw(hello, &self.game.players))
            }
        }
    }
}

fn players_vec(players: &std::collections::BTreeMap<u8, crate::protocol::Player>) -> Vec<(u8, crate::protocol::Player)> {
    players.iter().map(|(&id, p)| (id, p.clone())).collect()
}

fn lobby_draw(hello: &HelloParams, players: &std::collections::BTreeMap<u8, crate::protocol::Player>) -> DrawMessage {
    DrawMessage::Lobby {
        server_name: hello.server_name.clone(),
        players_count: hello.players_count,
        size_x: hello.size_x,
        size_y: hello.size_y,
        game_length: hello.game_length,
        explosion_radius: hello.explosion_radius,
        bomb_timer: hello.bomb_timer,
        players: players_vec(players),
    }
}

fn log_turn(logger: &Logger, turn: u16, events: &[Event]) {
    logger.trace(format!("turn {turn}: {} event(s)", events.len()));
}

pub async fn run(
    tcp_stream: TcpStream,
    udp_socket: UdpSocket,
    gui_peer: SocketAddr,
    player_name: String,
    logger: Arc<Logger>,
) -> Result<(), String> {
    let local_tcp_addr = format_address(tcp_stream.local_addr().map_err(|e| e.to_string())?);
    let (mut tcp_read, mut tcp_write) = tcp_stream.into_split();

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ClientEvent>();
    let (outbound_server_tx, mut outbound_server_rx) = mpsc::unbounded_channel::<ClientMessage>();
    let (outbound_gui_tx, mut outbound_gui_rx) = mpsc::unbounded_channel::<Bytes>();

    let udp_socket = Arc::new(udp_socket);

    // TCP reader: decodes ServerMessages until EOF or a protocol error,
    // either of which is fatal for the client (spec §7).
    let tcp_event_tx = event_tx.clone();
    let tcp_logger = logger.clone();
    let tcp_reader = tokio::spawn(async move {
        loop {
            match ServerMessage::decode(&mut tcp_read).await {
                Ok(message) => {
                    if tcp_event_tx.send(ClientEvent::Server(message)).is_err() {
                        break;
                    }
                }
                Err(ProtocolError::Eof) => {
                    let _ = tcp_event_tx.send(ClientEvent::Fatal("server closed the connection".into()));
                    break;
                }
                Err(err) => {
                    tcp_logger.debug(format!("protocol error from server: {err}"));
                    let _ = tcp_event_tx.send(ClientEvent::Fatal(err.to_string()));
                    break;
                }
            }
        }
    });

    // UDP reader: one datagram per message; malformed datagrams are logged
    // and dropped, the loop continues (spec §4.1, §7).
    let udp_event_tx = event_tx.clone();
    let udp_logger = logger.clone();
    let udp_read_socket = udp_socket.clone();
    let udp_reader = tokio::spawn(async move {
        let mut buf = vec![0u8; 65536];
        loop {
            let n = match udp_read_socket.recv(&mut buf).await {
                Ok(n) => n,
                Err(err) => {
                    udp_logger.debug(format!("udp recv error: {err}"));
                    continue;
                }
            };
            match GuiMessage::decode_datagram(&buf[..n]).await {
                Ok(message) => {
                    if udp_event_tx.send(ClientEvent::Gui(message)).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    udp_logger.debug(format!("malformed datagram from gui: {err}"));
                }
            }
        }
    });

    // outbound_server pump: drains ClientMessages onto the TCP connection.
    let server_writer_logger = logger.clone();
    let server_writer_event_tx = event_tx.clone();
    let server_writer = tokio::spawn(async move {
        while let Some(message) = outbound_server_rx.recv().await {
            let buf = message.encode();
            if let Err(source) = tcp_write.write_all(&buf).await {
                let err = SendError { to: "server".to_string(), source };
                server_writer_logger.debug(err.to_string());
                let _ = server_writer_event_tx.send(ClientEvent::Fatal(err.to_string()));
                break;
            }
        }
    });

    // outbound_gui pump: drains pre-encoded DrawMessage bytes onto the UDP
    // socket, addressed to the configured GUI peer.
    let gui_writer_logger = logger.clone();
    let udp_write_socket = udp_socket.clone();
    let gui_writer = tokio::spawn(async move {
        while let Some(bytes) = outbound_gui_rx.recv().await {
            if let Err(source) = udp_write_socket.send_to(&bytes, gui_peer).await {
                let err = SendError { to: "gui".to_string(), source };
                gui_writer_logger.debug(err.to_string());
            }
        }
    });

    let mut session = Session::new(player_name, local_tcp_addr);
    let result = loop {
        match event_rx.recv().await {
            Some(ClientEvent::Gui(message)) => {
                if let Some(out) = session.handle_gui(message) {
                    if outbound_server_tx.send(out).is_err() {
                        break Err("outbound server queue closed".to_string());
                    }
                }
            }
            Some(ClientEvent::Server(message)) => {
                if let Some(draw) = session.handle_server(message, &logger) {
                    let bytes = draw.encode().freeze();
                    if outbound_gui_tx.send(bytes).is_err() {
                        break Err("outbound gui queue closed".to_string());
                    }
                }
            }
            Some(ClientEvent::Fatal(reason)) => break Err(reason),
            None => break Ok(()),
        }
    };

    tcp_reader.abort();
    udp_reader.abort();
    server_writer.abort();
    gui_writer.abort();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Direction, Player};

    fn logger() -> Logger {
        Logger::new(0)
    }

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
    fn lobby_input_yields_exactly_one_join_until_hello_is_re_received() {
        let mut session = Session::new("alice".into(), "[127.0.0.1]:1".into());
        let log = logger();
        session.handle_server(ServerMessage::Hello(hello()), &log);

        let first = session.handle_gui(GuiMessage::PlaceBomb);
        assert_eq!(first, Some(ClientMessage::Join { name: "alice".into() }));

        // Further GUI inputs in LOBBY produce no additional outbound
        // messages, regardless of which input was pressed (spec §8).
        assert_eq!(session.handle_gui(GuiMessage::Move(Direction::Up)), None);
        assert_eq!(session.handle_gui(GuiMessage::PlaceBlock), None);

        // A fresh Hello resets the one-Join-per-lobby-spell gate.
        session.handle_server(ServerMessage::Hello(hello()), &log);
        assert_eq!(
            session.handle_gui(GuiMessage::PlaceBomb),
            Some(ClientMessage::Join { name: "alice".into() })
        );
    }

    #[test]
    fn game_started_after_being_accepted_enters_in_game() {
        let mut session = Session::new("alice".into(), "[127.0.0.1]:1".into());
        let log = logger();
        session.handle_server(ServerMessage::Hello(hello()), &log);
        session.handle_server(
            ServerMessage::AcceptedPlayer {
                player_id: 0,
                player: Player { name: "alice".into(), address: "[127.0.0.1]:1".into() },
            },
            &log,
        );
        session.handle_server(
            ServerMessage::GameStarted {
                players: vec![(0, Player { name: "alice".into(), address: "[127.0.0.1]:1".into() })],
            },
            &log,
        );
        assert_eq!(session.phase, Phase::InGame);
        assert_eq!(session.handle_gui(GuiMessage::PlaceBomb), Some(ClientMessage::PlaceBomb));
    }

    #[test]
    fn game_started_before_being_accepted_enters_observe_and_drops_gui_input() {
        let mut session = Session::new("bob".into(), "[127.0.0.1]:2".into());
        let log = logger();
        session.handle_server(ServerMessage::Hello(hello()), &log);
        // GameStarted arrives without this client ever seeing its own
        // AcceptedPlayer: it is a late joiner watching someone else's game.
        session.handle_server(
            ServerMessage::GameStarted {
                players: vec![(0, Player { name: "alice".into(), address: "[127.0.0.1]:1".into() })],
            },
            &log,
        );
        assert_eq!(session.phase, Phase::Observe);
        assert_eq!(session.handle_gui(GuiMessage::Move(Direction::Left)), None);
    }

    #[test]
    fn game_ended_returns_to_lobby_and_allows_a_new_join() {
        let mut session = Session::new("alice".into(), "[127.0.0.1]:1".into());
        let log = logger();
        session.handle_server(ServerMessage::Hello(hello()), &log);
        session.handle_server(
            ServerMessage::AcceptedPlayer {
                player_id: 0,
                player: Player { name: "alice".into(), address: "[127.0.0.1]:1".into() },
            },
            &log,
        );
        session.handle_server(
            ServerMessage::GameStarted {
                players: vec![(0, Player { name: "alice".into(), address: "[127.0.0.1]:1".into() })],
            },
            &log,
        );
        session.handle_server(ServerMessage::GameEnded { scores: vec![(0, 2)] }, &log);

        assert_eq!(session.phase, Phase::Lobby);
        assert_eq!(
            session.handle_gui(GuiMessage::PlaceBomb),
            Some(ClientMessage::Join { name: "alice".into() })
        );
    }
}
