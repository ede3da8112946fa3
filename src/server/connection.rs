//! Per-connection I/O tasks: one reader decoding `ClientMessage`s off the
//! TCP stream, one writer draining an outbound `Bytes` queue onto it. Both
//! only ever talk to the actor through the `mpsc` channels wired up here —
//! they hold no game state themselves (spec §5).

use super::actor::ActorEvent;
use crate::error::SendError;
use crate::logger::Logger;
use crate::protocol::{ClientMessage, ProtocolError};
use bytes::Bytes;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Spawns the reader and writer tasks for a newly accepted connection and
/// returns their join handles, so the caller can tell when both have
/// finished (and release whatever resource, e.g. a connection-count permit,
/// it is holding on the connection's behalf).
pub fn spawn(
    conn_id: u64,
    stream: TcpStream,
    addr: std::net::SocketAddr,
    actor_tx: mpsc::UnboundedSender<ActorEvent>,
    logger: Arc<Logger>,
) -> (tokio::task::JoinHandle<()>, tokio::task::JoinHandle<()>) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Bytes>();
    let _ = actor_tx.send(ActorEvent::Accepted { conn_id, addr, outbound: outbound_tx });

    let (read_half, write_half) = stream.into_split();
    let reader = tokio::spawn(reader_task(conn_id, read_half, actor_tx, logger.clone()));
    let writer = tokio::spawn(writer_task(conn_id, write_half, outbound_rx, logger));
    (reader, writer)
}

async fn reader_task(
    conn_id: u64,
    mut read_half: tokio::net::tcp::OwnedReadHalf,
    actor_tx: mpsc::UnboundedSender<ActorEvent>,
    logger: Arc<Logger>,
) {
    loop {
        match ClientMessage::decode(&mut read_half).await {
            Ok(message) => {
                if actor_tx.send(ActorEvent::Inbound { conn_id, message }).is_err() {
                    break;
                }
            }
            Err(ProtocolError::Eof) => {
                logger.verbose(format!("connection {conn_id} closed by peer"));
                break;
            }
            Err(err) => {
                logger.debug(format!("connection {conn_id} protocol error: {err}"));
                break;
            }
        }
    }
    let _ = actor_tx.send(ActorEvent::Disconnected { conn_id });
}

async fn writer_task(
    conn_id: u64,
    mut write_half: tokio::net::tcp::OwnedWriteHalf,
    mut outbound_rx: mpsc::UnboundedReceiver<Bytes>,
    logger: Arc<Logger>,
) {
    while let Some(bytes) = outbound_rx.recv().await {
        if let Err(source) = write_half.write_all(&bytes).await {
            let err = SendError { to: format!("connection {conn_id}"), source };
            logger.debug(err.to_string());
            break;
        }
    }
}
