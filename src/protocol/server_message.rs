//! Server -> client messages (spec §4.1).

use super::event::{read_event_list, write_event_list, Event};
use super::primitives::{read_string, read_u16, read_u32, read_u8, write_string, Player, ProtocolError};
use bytes::{BufMut, BytesMut};
use tokio::io::AsyncRead;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloParams {
    pub server_name: String,
    pub players_count: u8,
    pub size_x: u16,
    pub size_y: u16,
    pub game_length: u16,
    pub explosion_radius: u16,
    pub bomb_timer: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Hello(HelloParams),
    AcceptedPlayer { player_id: u8, player: Player },
    GameStarted { players: Vec<(u8, Player)> },
    Turn { turn: u16, events: Vec<Event> },
    GameEnded { scores: Vec<(u8, u32)> },
}

const TAG_HELLO: u8 = 0;
const TAG_ACCEPTED_PLAYER: u8 = 1;
const TAG_GAME_STARTED: u8 = 2;
const TAG_TURN: u8 = 3;
const TAG_GAME_ENDED: u8 = 4;

async fn read_player_map<R: AsyncRead + Unpin>(r: &mut R) -> Result<Vec<(u8, Player)>, ProtocolError> {
    let len = read_u32(r).await? as usize;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        let player_id = read_u8(r).await?;
        let player = Player::decode(r).await?;
        out.push((player_id, player));
    }
    Ok(out)
}

fn write_player_map(buf: &mut BytesMut, players: &[(u8, Player)]) {
    buf.put_u32(players.len() as u32);
    for (player_id, player) in players {
        buf.put_u8(*player_id);
        player.encode_into(buf);
    }
}

async fn read_score_map<R: AsyncRead + Unpin>(r: &mut R) -> Result<Vec<(u8, u32)>, ProtocolError> {
    let len = read_u32(r).await? as usize;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        let player_id = read_u8(r).await?;
        let score = read_u32(r).await?;
        out.push((player_id, score));
    }
    Ok(out)
}

fn write_score_map(buf: &mut BytesMut, scores: &[(u8, u32)]) {
    buf.put_u32(scores.len() as u32);
    for (player_id, score) in scores {
        buf.put_u8(*player_id);
        buf.put_u32(*score);
    }
}

impl ServerMessage {
    pub async fn decode<R: AsyncRead + Unpin>(r: &mut R) -> Result<Self, ProtocolError> {
        let tag = read_u8(r).await?;
        match tag {
            TAG_HELLO => {
                let server_name = read_string(r).await?;
                let players_count = read_u8(r).await?;
                let size_x = read_u16(r).await?;
                let size_y = read_u16(r).await?;
                let game_length = read_u16(r).await?;
                let explosion_radius = read_u16(r).await?;
                let bomb_timer = read_u16(r).await?;
                Ok(ServerMessage::Hello(HelloParams {
                    server_name,
                    players_count,
                    size_x,
                    size_y,
                    game_length,
                    explosion_radius,
                    bomb_timer,
                }))
            }
            TAG_ACCEPTED_PLAYER => {
                let player_id = read_u8(r).await?;
                let player = Player::decode(r).await?;
                Ok(ServerMessage::AcceptedPlayer { player_id, player })
            }
            TAG_GAME_STARTED => Ok(ServerMessage::GameStarted { players: read_player_map(r).await? }),
            TAG_TURN => {
                let turn = read_u16(r).await?;
                let events = read_event_list(r).await?;
                Ok(ServerMessage::Turn { turn, events })
            }
            TAG_GAME_ENDED => Ok(ServerMessage::GameEnded { scores: read_score_map(r).await? }),
            other => Err(ProtocolError::UnknownTag { tag: other, context: "ServerMessage" }),
        }
    }

    pub fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            ServerMessage::Hello(params) => {
                buf.put_u8(TAG_HELLO);
                write_string(buf, &params.server_name);
                buf.put_u8(params.players_count);
                buf.put_u16(params.size_x);
                buf.put_u16(params.size_y);
                buf.put_u16(params.game_length);
                buf.put_u16(params.explosion_radius);
                buf.put_u16(params.bomb_timer);
            }
            ServerMessage::AcceptedPlayer { player_id, player } => {
                buf.put_u8(TAG_ACCEPTED_PLAYER);
                buf.put_u8(*player_id);
                player.encode_into(buf);
            }
            ServerMessage::GameStarted { players } => {
                buf.put_u8(TAG_GAME_STARTED);
                write_player_map(buf, players);
            }
            ServerMessage::Turn { turn, events } => {
                buf.put_u8(TAG_TURN);
                buf.put_u16(*turn);
                write_event_list(buf, events);
            }
            ServerMessage::GameEnded { scores } => {
                buf.put_u8(TAG_GAME_ENDED);
                write_score_map(buf, scores);
            }
        }
    }

    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf);
        buf
    }
}
