//! Client -> server messages (spec §4.1).

use super::primitives::{read_string, read_u8, write_string, Direction, ProtocolError};
use bytes::{BufMut, BytesMut};
use tokio::io::AsyncRead;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Join { name: String },
    PlaceBomb,
    PlaceBlock,
    Move(Direction),
}

const TAG_JOIN: u8 = 0;
const TAG_PLACE_BOMB: u8 = 1;
const TAG_PLACE_BLOCK: u8 = 2;
const TAG_MOVE: u8 = 3;

impl ClientMessage {
    pub async fn decode<R: AsyncRead + Unpin>(r: &mut R) -> Result<Self, ProtocolError> {
        let tag = read_u8(r).await?;
        match tag {
            TAG_JOIN => Ok(ClientMessage::Join { name: read_string(r).await? }),
            TAG_PLACE_BOMB => Ok(ClientMessage::PlaceBomb),
            TAG_PLACE_BLOCK => Ok(ClientMessage::PlaceBlock),
            TAG_MOVE => Ok(ClientMessage::Move(Direction::decode(r).await?)),
            other => Err(ProtocolError::UnknownTag { tag: other, context: "ClientMessage" }),
        }
    }

    pub fn encode_into(&self, buf: &mut BytesMut) {
        match self {
            ClientMessage::Join { name } => {
                buf.put_u8(TAG_JOIN);
                write_string(buf, name);
            }
            ClientMessage::PlaceBomb => buf.put_u8(TAG_PLACE_BOMB),
            ClientMessage::PlaceBlock => buf.put_u8(TAG_PLACE_BLOCK),
            ClientMessage::Move(direction) => {
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
