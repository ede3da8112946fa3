//! `Event` — the tagged union nested inside `Turn` (spec §3, §4.1).

use super::primitives::{read_u32, read_u8, Position, ProtocolError};
use bytes::BufMut;
use bytes::BytesMut;
use tokio::io::AsyncRead;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    BombPlaced { bomb_id: u32, position: Position },
    BombExploded { bomb_id: u32, robots_destroyed: Vec<u8>, blocks_destroyed: Vec<Position> },
    PlayerMoved { player_id: u8, position: Position },
    BlockPlaced { position: Position },
}

const TAG_BOMB_PLACED: u8 = 0;
const TAG_BOMB_EXPLODED: u8 = 1;
const TAG_PLAYER_MOVED: u8 = 2;
const TAG_BLOCK_PLACED: u8 = 3;

impl Event {
    pub async fn decode<R: AsyncRead + Unpin>(r: &mut R) -> Result<Self, ProtocolError> {
        let tag = read_u8(r).await?;
        match tag {
            TAG_BOMB_PLACED => {
                let bomb_id = read_u32(r).await?;
                let position = Position::decode(r).await?;
                Ok(Event::BombPlaced { bomb_id, position })
            }
            TAG_BOMB_EXPLODED => {
                let bomb_id = read_u32(r).await?;
                let robots_destroyed = read_player_id_list(r).await?;
                let blocks_destroyed = read_position_list(r).await?;
                Ok(Event::BombExploded { bomb_id, robots_destroyed, blocks_destroyed })
            }
            TAG_PLAYER_MOVED => {
                let player_id = read_u8(r).await?;
                let position = Position::decode(r).await?;
                Ok(Event::PlayerMoved { player_id, position })
            }
            TAG_BLOCK_PLACED => {
                let position = Position::decode(r).await?;
                Ok(Event::BlockPlaced { position })
            }
            other => Err(ProtocolError::UnknownTag { tag: other, context: "Event" }),
        }
    }

    pub fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            Event::BombPlaced { bomb_id, position } => {
                buf.put_u8(TAG_BOMB_PLACED);
                buf.put_u32(*bomb_id);
                position.encode_into(buf);
            }
            Event::BombExploded { bomb_id, robots_destroyed, blocks_destroyed } => {
                buf.put_u8(TAG_BOMB_EXPLODED);
                buf.put_u32(*bomb_id);
                write_player_id_list(buf, robots_destroyed);
                write_position_list(buf, blocks_destroyed);
            }
            Event::PlayerMoved { player_id, position } => {
                buf.put_u8(TAG_PLAYER_MOVED);
                buf.put_u8(*player_id);
                position.encode_into(buf);
            }
            Event::BlockPlaced { position } => {
                buf.put_u8(TAG_BLOCK_PLACED);
                position.encode_into(buf);
            }
        }
    }
}

pub(super) async fn read_player_id_list<R: AsyncRead + Unpin>(
    r: &mut R,
) -> Result<Vec<u8>, ProtocolError> {
    let len = read_u32(r).await? as usize;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(read_u8(r).await?);
    }
    Ok(out)
}

pub(super) fn write_player_id_list(buf: &mut BytesMut, ids: &[u8]) {
    buf.put_u32(ids.len() as u32);
    for id in ids {
        buf.put_u8(*id);
    }
}

pub(super) async fn read_position_list<R: AsyncRead + Unpin>(
    r: &mut R,
) -> Result<Vec<Position>, ProtocolError> {
    let len = read_u32(r).await? as usize;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(Position::decode(r).await?);
    }
    Ok(out)
}

pub(super) fn write_position_list(buf: &mut BytesMut, positions: &[Position]) {
    buf.put_u32(positions.len() as u32);
    for p in positions {
        p.encode_into(buf);
    }
}

pub(super) async fn read_event_list<R: AsyncRead + Unpin>(
    r: &mut R,
) -> Result<Vec<Event>, ProtocolError> {
    let len = read_u32(r).await? as usize;
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(Event::decode(r).await?);
    }
    Ok(out)
}

pub(super) fn write_event_list(buf: &mut BytesMut, events: &[Event]) {
    buf.put_u32(events.len() as u32);
    for e in events {
        e.encode_into(buf);
    }
}
