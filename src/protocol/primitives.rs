//! Shared wire primitives: integer/string/list framing helpers, [`Position`],
//! [`Direction`], [`Player`], and the [`ProtocolError`] taxonomy (spec §4.1).

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Any structural violation of the wire format (spec §4.1/§7).
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed while reading a message")]
    Eof,

    #[error("unknown tag {tag} for {context}")]
    UnknownTag { tag: u8, context: &'static str },

    #[error("invalid utf-8 in string field")]
    InvalidUtf8,

    #[error("invalid direction value {0}, expected 0..=3")]
    InvalidDirection(u8),

    #[error("datagram has {0} trailing byte(s) after a valid message")]
    TrailingBytes(usize),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Maps a read past EOF to [`ProtocolError::Eof`] rather than a raw io error,
/// since "connection closed mid-message" is a protocol-level event the
/// caller needs to distinguish from other I/O failures.
fn map_read_err(e: std::io::Error) -> ProtocolError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        ProtocolError::Eof
    } else {
        ProtocolError::Io(e)
    }
}

pub async fn read_u8<R: AsyncRead + Unpin>(r: &mut R) -> Result<u8, ProtocolError> {
    r.read_u8().await.map_err(map_read_err)
}

pub async fn read_u16<R: AsyncRead + Unpin>(r: &mut R) -> Result<u16, ProtocolError> {
    r.read_u16().await.map_err(map_read_err)
}

pub async fn read_u32<R: AsyncRead + Unpin>(r: &mut R) -> Result<u32, ProtocolError> {
    r.read_u32().await.map_err(map_read_err)
}

pub async fn read_u64<R: AsyncRead + Unpin>(r: &mut R) -> Result<u64, ProtocolError> {
    r.read_u64().await.map_err(map_read_err)
}

/// `str_len (u8)` followed by that many UTF-8 bytes.
pub async fn read_string<R: AsyncRead + Unpin>(r: &mut R) -> Result<String, ProtocolError> {
    let len = read_u8(r).await? as usize;
    let mut bytes = vec![0u8; len];
    r.read_exact(&mut bytes).await.map_err(map_read_err)?;
    String::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)
}

pub fn write_string(buf: &mut BytesMut, s: &str) {
    debug_assert!(s.len() <= u8::MAX as usize, "string must be <=255 bytes");
    buf.put_u8(s.len() as u8);
    buf.put_slice(s.as_bytes());
}

/// A grid cell. `0 <= x < size_x`, `0 <= y < size_y` is enforced by callers
/// that place positions into a bounded world; the type itself just carries
/// the coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    pub async fn decode<R: AsyncRead + Unpin>(r: &mut R) -> Result<Self, ProtocolError> {
        let x = read_u16(r).await?;
        let y = read_u16(r).await?;
        Ok(Self { x, y })
    }

    pub fn encode_into(&self, buf: &mut BytesMut) {
        buf.put_u16(self.x);
        buf.put_u16(self.y);
    }
}

/// Movement direction, tag-identical on the client->server and GUI->client
/// wires (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Direction {
    pub fn from_tag(tag: u8) -> Result<Self, ProtocolError> {
        match tag {
            0 => Ok(Direction::Up),
            1 => Ok(Direction::Right),
            2 => Ok(Direction::Down),
            3 => Ok(Direction::Left),
            other => Err(ProtocolError::InvalidDirection(other)),
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// The adjacent cell in this direction, or `None` if it would leave the
    /// grid (spec §4.3's Move dispatch: "if inside the grid").
    pub fn step(self, from: Position, size_x: u16, size_y: u16) -> Option<Position> {
        let (dx, dy): (i32, i32) = match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        };
        let nx = from.x as i32 + dx;
        let ny = from.y as i32 + dy;
        if nx < 0 || ny < 0 || nx >= size_x as i32 || ny >= size_y as i32 {
            None
        } else {
            Some(Position::new(nx as u16, ny as u16))
        }
    }

    pub async fn decode<R: AsyncRead + Unpin>(r: &mut R) -> Result<Self, ProtocolError> {
        Self::from_tag(read_u8(r).await?)
    }

    pub fn encode_into(self, buf: &mut BytesMut) {
        buf.put_u8(self.tag());
    }
}

/// `(name, address)`. `address` is server-derived (`"[<ip>]:<port>"`,
/// spec §3); the client never constructs one itself except to compare
/// against its own formatted local address (spec §4.4 [ADD]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub address: String,
}

impl Player {
    pub async fn decode<R: AsyncRead + Unpin>(r: &mut R) -> Result<Self, ProtocolError> {
        let name = read_string(r).await?;
        let address = read_string(r).await?;
        Ok(Self { name, address })
    }

    pub fn encode_into(&self, buf: &mut BytesMut) {
        write_string(buf, &self.name);
        write_string(buf, &self.address);
    }
}

/// Format a socket address the way the server derives `Player::address`
/// from an accepted TCP endpoint (spec §3: `"[<ip>]:<port>"`).
pub fn format_address(addr: std::net::SocketAddr) -> String {
    format!("[{}]:{}", addr.ip(), addr.port())
}

/// Reject a UDP datagram that still has unconsumed bytes after a message
/// decoded successfully (spec §4.1: "no trailing bytes").
pub fn require_fully_consumed(cursor: &std::io::Cursor<&[u8]>) -> Result<(), ProtocolError> {
    let remaining = cursor.remaining();
    if remaining > 0 {
        Err(ProtocolError::TrailingBytes(remaining))
    } else {
        Ok(())
    }
}
