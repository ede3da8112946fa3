//! The wire codec (spec §4.1): primitives, the four message families, and
//! the nested `Event` union. Encoding is synchronous (`bytes::BufMut` into a
//! `BytesMut`); decoding is asynchronous (`tokio::io::AsyncReadExt`) so the
//! same implementation serves both a suspendable TCP stream and a
//! fully-buffered UDP datagram (see [`primitives::require_fully_consumed`]).

mod client_message;
mod event;
mod gui_message;
mod primitives;
mod server_message;

pub use client_message::ClientMessage;
pub use event::Event;
pub use gui_message::{DrawBomb, DrawMessage, GuiMessage};
pub use primitives::{format_address, Direction, Player, Position, ProtocolError};
pub use server_message::{HelloParams, ServerMessage};
