//! GUI <-> client messages (spec §4.1). `GuiMessage` is what the client
//! receives over UDP from the local GUI process; `DrawMessage` is what the
//! client sends back.

use super::primitives::{
    read_string, read_u16, read_u32, read_u8, write_string, Direction, Player, Position,
    ProtocolError,
};
use bytes::{BufMut, BytesMut};
use tokio::io::AsyncRead;

/// GUI -> client. Tags are identical to the corresponding
/// client -> server tags (`PlaceBomb` = 1, `PlaceBlock` = 2, `Move` = 3);
/// there is no `Join` counterpart since the GUI never names a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuiMessage {
    PlaceBomb,
    PlaceBlock,
    Move(Direction),
}

const TAG_PLACE_BOMB: u8 = 1;
const TAG_PLACE_BLOCK: u8 = 2;
const TAG_MOVE: u8 = 3;

impl GuiMessage {
    pub async fn decode<R: AsyncRead + Unpin>(r: &mut R) -> Result<Self, ProtocolError> {
        let tag = read_u8(r).await?;
        match tag {
            TAG_PLACE_BOMB => Ok(GuiMessage::PlaceBomb),
            TAG_PLACE_BLOCK => Ok(GuiMessage::PlaceBlock),
            TAG_MOVE => Ok(GuiMessage::Move(Direction::decode(r).await?)),
            other => Err(ProtocolError::UnknownTag { tag: other, context: "GuiMessage" }),
        }
    }

    /// Decode a single GUI datagram, rejecting any trailing bytes.
    pub async fn decode_datagram(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut cursor = std::io::Cursor::new(data);
        let value = Self::decode(&mut cursor).await?;
        super::primitives::require_fully_consumed(&cursor)?;
        Ok(value)
    }

    pub fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            GuiMessage::PlaceBomb => buf.put_u8(TAG_PLACE_BOMB),
            GuiMessage::PlaceBlock => buf.put_u8(TAG_PLACE_BLOCK),
            GuiMessage::Move(direction) => {
                buf.put_u8(TAG_MOVE);
                direction.encode_into(buf);
            }
        }
    }

    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf);
        buf
    }
}

/// One bomb as rendered on the `Game` draw message: position plus remaining
/// timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawBomb {
    pub position: Position,
    pub timer: u16,
}

/// Client -> GUI. `Lobby` mirrors the cached `HelloParams` plus the roster
/// accepted so far; `Game` is the full per-turn render payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawMessage {
    Lobby {
        server_name: String,
        players_count: u8,
        size_x: u16,
        size_y: u16,
        game_length: u16,
        explosion_radius: u16,
        bomb_timer: u16,
        players: Vec<(u8, Player)>,
    },
    Game {
        server_name: String,
        size_x: u16,
        size_y: u16,
        game_length: u16,
        turn: u16,
        players: Vec<(u8, Player)>,
        player_positions: Vec<(u8, Position)>,
        blocks: Vec<Position>,
        bombs: Vec<DrawBomb>,
        explosions: Vec<Position>,
        scores: Vec<(u8, u32)>,
    },
}

const TAG_LOBBY: u8 = 0;
const TAG_GAME: u8 = 1;

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

async fn read_player_position_map<R: AsyncRead + Unpin>(
    r: &mut R,
) -> Result<Vec<(u8, Position)>, ProtocolError> {
    let len = read_u32(r).await? as usize;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        let player_id = read_u8(r).await?;
        let pos = Position::decode(r).await?;
        out.push((player_id, pos));
    }
    Ok(out)
}

fn write_player_position_map(buf: &mut BytesMut, positions: &[(u8, Position)]) {
    buf.put_u32(positions.len() as u32);
    for (player_id, pos) in positions {
        buf.put_u8(*player_id);
        pos.encode_into(buf);
    }
}

async fn read_position_list<R: AsyncRead + Unpin>(r: &mut R) -> Result<Vec<Position>, ProtocolError> {
    let len = read_u32(r).await? as usize;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(Position::decode(r).await?);
    }
    Ok(out)
}

fn write_position_list(buf: &mut BytesMut, positions: &[Position]) {
    buf.put_u32(positions.len() as u32);
    for p in positions {
        p.encode_into(buf);
    }
}

async fn read_bomb_list<R: AsyncRead + Unpin>(r: &mut R) -> Result<Vec<DrawBomb>, ProtocolError> {
    let len = read_u32(r).await? as usize;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        let position = Position::decode(r).await?;
        let timer = read_u16(r).await?;
        out.push(DrawBomb { position, timer });
    }
    Ok(out)
}

fn write_bomb_list(buf: &mut BytesMut, bombs: &[DrawBomb]) {
    buf.put_u32(bombs.len() as u32);
    for b in bombs {
        b.position.encode_into(buf);
        buf.put_u16(b.timer);
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

impl DrawMessage {
    pub async fn decode<R: AsyncRead + Unpin>(r: &mut R) -> Result<Self, ProtocolError> {
        let tag = read_u8(r).await?;
        match tag {
            TAG_LOBBY => {
                let server_name = read_string(r).await?;
                let players_count = read_u8(r).await?;
                let size_x = read_u16(r).await?;
                let size_y = read_u16(r).await?;
                let game_length = read_u16(r).await?;
                let explosion_radius = read_u16(r).await?;
                let bomb_timer = read_u16(r).await?;
                let players = read_player_map(r).await?;
                Ok(DrawMessage::Lobby {
                    server_name,
                    players_count,
                    size_x,
                    size_y,
                    game_length,
                    explosion_radius,
                    bomb_timer,
                    players,
                })
            }
            TAG_GAME => {
                let server_name = read_string(r).await?;
                let size_x = read_u16(r).await?;
                let size_y = read_u16(r).await?;
                let game_length = read_u16(r).await?;
                let turn = read_u16(r).await?;
                let players = read_player_map(r).await?;
                let player_positions = read_player_position_map(r).await?;
                let blocks = read_position_list(r).await?;
                let bombs = read_bomb_list(r).await?;
                let explosions = read_position_list(r).await?;
                let scores = read_score_map(r).await?;
                Ok(DrawMessage::Game {
                    server_name,
                    size_x,
                    size_y,
                    game_length,
                    turn,
                    players,
                    player_positions,
                    blocks,
                    bombs,
                    explosions,
                    scores,
                })
            }
            other => Err(ProtocolError::UnknownTag { tag: other, context: "DrawMessage" }),
        }
    }

    pub async fn decode_datagram(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut cursor = std::io::Cursor::new(data);
        let value = Self::decode(&mut cursor).await?;
        super::primitives::require_fully_consumed(&cursor)?;
        Ok(value)
    }

    pub fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            DrawMessage::Lobby {
                server_name,
                players_count,
                size_x,
                size_y,
                game_length,
                explosion_radius,
                bomb_timer,
                players,
            } => {
                buf.put_u8(TAG_LOBBY);
                write_string(buf, server_name);
                buf.put_u8(*players_count);
                buf.put_u16(*size_x);
                buf.put_u16(*size_y);
                buf.put_u16(*game_length);
                buf.put_u16(*explosion_radius);
                buf.put_u16(*bomb_timer);
                write_player_map(buf, players);
            }
            DrawMessage::Game {
                server_name,
                size_x,
                size_y,
                game_length,
                turn,
                players,
                player_positions,
                blocks,
                bombs,
                explosions,
                scores,
            } => {
                buf.put_u8(TAG_GAME);
                write_string(buf, server_name);
                buf.put_u16(*size_x);
                buf.put_u16(*size_y);
                buf.put_u16(*game_length);
                buf.put_u16(*turn);
                write_player_map(buf, players);
                write_player_position_map(buf, player_positions);
                write_position_list(buf, blocks);
                write_bomb_list(buf, bombs);
                write_position_list(buf, explosions);
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
