//! Client entry point: resolves the server/GUI endpoints, opens the TCP and
//! UDP sockets, and hands them to the multiplexer (spec §4.4, §6).

mod multiplexer;
mod state;

use crate::error::{ConfigError, ConnectError};
use crate::logger::Logger;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpStream, UdpSocket};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_endpoint: String,
    pub gui_endpoint: String,
    pub player_name: String,
    pub port: u16,
}

/// Binds a dual-stack IPv6 UDP socket on `port` (spec §6: "client binds
/// dual-stack IPv6 UDP on `port`").
fn bind_dual_stack_udp(port: u16) -> Result<std::net::UdpSocket, ConnectError> {
    use socket2::{Domain, Socket, Type};
    let addr = SocketAddr::new(std::net::Ipv6Addr::UNSPECIFIED.into(), port);
    let socket = Socket::new(Domain::IPV6, Type::DGRAM, None).map_err(|source| ConnectError::Bind {
        addr: addr.to_string(),
        source,
    })?;
    socket.set_only_v6(false).map_err(|source| ConnectError::Bind { addr: addr.to_string(), source })?;
    socket
        .bind(&addr.into())
        .map_err(|source| ConnectError::Bind { addr: addr.to_string(), source })?;
    socket.set_nonblocking(true).map_err(|source| ConnectError::Bind { addr: addr.to_string(), source })?;
    Ok(socket.into())
}

pub async fn run(config: ClientConfig, logger: Arc<Logger>) -> Result<(), String> {
    if config.player_name.len() > 255 {
        return Err(ConfigError::NameTooLong { len: config.player_name.len() }.to_string());
    }

    let server_addr = crate::endpoint::resolve(&config.server_endpoint)
        .await
        .map_err(|e| e.to_string())?;
    let gui_addr = crate::endpoint::resolve(&config.gui_endpoint)
        .await
        .map_err(|e| e.to_string())?;

    logger.info(format!("connecting to server at {server_addr}"));
    let tcp_stream = TcpStream::connect(server_addr)
        .await
        .map_err(|source| ConnectError::Connect { addr: server_addr.to_string(), source }.to_string())?;
    tcp_stream.set_nodelay(true).map_err(|e| e.to_string())?;

    let udp_std = bind_dual_stack_udp(config.port).map_err(|e| e.to_string())?;
    let udp_socket = UdpSocket::from_std(udp_std).map_err(|e| e.to_string())?;
    logger.info(format!("gui socket bound on port {}, forwarding draws to {gui_addr}", config.port));

    multiplexer::run(tcp_stream, udp_socket, gui_addr, config.player_name, logger).await
}
