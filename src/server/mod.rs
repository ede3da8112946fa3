//! Server entry point: dual-stack TCP accept loop plus the actor it feeds
//! (spec §4.2). Grounded on `examples/mattx86-myq2-rust`'s `socket2`
//! dual-stack/`set_nodelay` setup pattern and
//! `examples/original_source/src/server.h::connect_loop`/`handle_new_connection`.

mod actor;
mod connection;
mod state;

pub use state::{Phase, ServerConfig};

use crate::error::ConnectError;
use crate::logger::Logger;
use actor::{ActorEvent, ServerActor, MAX_CONNECTIONS};
use socket2::{Domain, Socket, Type};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Semaphore};

/// Binds a dual-stack IPv6 TCP listener on `port` (spec §6: "server binds
/// dual-stack IPv6 TCP on `port`").
fn bind_dual_stack(port: u16) -> Result<TcpListener, ConnectError> {
    let addr = std::net::SocketAddr::new(std::net::Ipv6Addr::UNSPECIFIED.into(), port);
    let socket = Socket::new(Domain::IPV6, Type::STREAM, None).map_err(|source| ConnectError::Bind {
        addr: addr.to_string(),
        source,
    })?;
    socket.set_only_v6(false).map_err(|source| ConnectError::Bind { addr: addr.to_string(), source })?;
    socket.set_reuse_address(true).map_err(|source| ConnectError::Bind { addr: addr.to_string(), source })?;
    socket
        .bind(&addr.into())
        .map_err(|source| ConnectError::Bind { addr: addr.to_string(), source })?;
    socket
        .listen(1024)
        .map_err(|source| ConnectError::Bind { addr: addr.to_string(), source })?;
    socket.set_nonblocking(true).map_err(|source| ConnectError::Bind { addr: addr.to_string(), source })?;
    TcpListener::from_std(socket.into()).map_err(|source| ConnectError::Bind { addr: addr.to_string(), source })
}

pub async fn run(config: ServerConfig, logger: Arc<Logger>) -> Result<(), ConnectError> {
    let listener = bind_dual_stack(config.port)?;
    logger.info(format!("listening on port {}", config.port));

    let (actor_tx, actor_rx) = mpsc::unbounded_channel::<ActorEvent>();
    let actor = ServerActor::new(config, logger.clone());
    tokio::spawn(actor.run(actor_rx));

    let slots = Arc::new(Semaphore::new(MAX_CONNECTIONS));
    let next_conn_id = AtomicU64::new(0);

    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                logger.debug(format!("accept error: {err}"));
                continue;
            }
        };

        let Ok(permit) = Arc::clone(&slots).try_acquire_owned() else {
            logger.debug(format!("connection limit ({MAX_CONNECTIONS}) reached, closing {addr}"));
            drop(stream);
            continue;
        };

        if let Err(err) = stream.set_nodelay(true) {
            logger.debug(format!("failed to set TCP_NODELAY for {addr}: {err}"));
        }

        let conn_id = next_conn_id.fetch_add(1, Ordering::Relaxed);
        let (reader, writer) = connection::spawn(conn_id, stream, addr, actor_tx.clone(), logger.clone());
        // The semaphore permit is released (and the slot freed) only once
        // both of this connection's tasks have exited.
        tokio::spawn(async move {
            let _permit = permit;
            let _ = tokio::join!(reader, writer);
        });
    }
}
