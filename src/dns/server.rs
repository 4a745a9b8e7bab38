use color_eyre::{eyre::eyre, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use super::Dispatcher;

/// Largest datagram we accept; anything bigger is not a query we answer.
const MAX_DATAGRAM: usize = 65_535;

/// UDP front end. Each datagram is handled in its own task so a slow
/// resource only delays its own answer.
pub struct DnsServer {
  socket: Arc<UdpSocket>,
  dispatcher: Arc<Dispatcher>,
}

impl DnsServer {
  pub async fn bind(addr: SocketAddr, dispatcher: Arc<Dispatcher>) -> Result<Self> {
    let socket = UdpSocket::bind(addr)
      .await
      .map_err(|e| eyre!("Failed to bind UDP socket on {}: {}", addr, e))?;
    Ok(Self {
      socket: Arc::new(socket),
      dispatcher,
    })
  }

  pub fn local_addr(&self) -> Result<SocketAddr> {
    Ok(self.socket.local_addr()?)
  }

  /// Receive loop. Only returns if the task is cancelled.
  pub async fn run(self) -> Result<()> {
    info!(addr = %self.local_addr()?, "DNS server listening");
    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
      let (len, peer) = match self.socket.recv_from(&mut buf).await {
        Ok(received) => received,
        Err(e) => {
          warn!(error = %e, "Failed to receive datagram");
          continue;
        }
      };

      let datagram = buf[..len].to_vec();
      let socket = Arc::clone(&self.socket);
      let dispatcher = Arc::clone(&self.dispatcher);
      tokio::spawn(async move {
        let Some(response) = dispatcher.handle(&datagram).await else {
          return;
        };
        match socket.send_to(&response, peer).await {
          Ok(sent) => debug!(%peer, bytes = sent, "Response sent"),
          Err(e) => warn!(%peer, error = %e, "Failed to send response"),
        }
      });
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::test_support::FakeSource;
  use crate::dns::dispatcher::tests::{answers, dispatcher_with, query};
  use crate::resources::ResourceKind;
  use domain::base::iana::Rtype;
  use std::time::Duration;
  use tokio::time::timeout;

  async fn start(dispatcher: Dispatcher) -> SocketAddr {
    let server = DnsServer::bind("127.0.0.1:0".parse().unwrap(), Arc::new(dispatcher))
      .await
      .unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
  }

  async fn exchange(client: &UdpSocket, server: SocketAddr, request: &[u8]) -> Vec<u8> {
    client.send_to(request, server).await.unwrap();
    let mut buf = vec![0u8; MAX_DATAGRAM];
    let (len, _) = timeout(Duration::from_secs(5), client.recv_from(&mut buf))
      .await
      .expect("no response")
      .unwrap();
    buf.truncate(len);
    buf
  }

  #[tokio::test]
  async fn test_round_trip_over_udp() {
    let server = start(dispatcher_with(&[(ResourceKind::Epoch, FakeSource::new(11))])).await;
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let response = exchange(&client, server, &query("epoch-status.cli", Rtype::TXT)).await;

    assert_eq!(
      answers(&response),
      vec![("epoch-status.cli".to_string(), "value 11".to_string())]
    );
  }

  #[tokio::test]
  async fn test_garbage_is_ignored_and_server_keeps_running() {
    let server = start(dispatcher_with(&[])).await;
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    client.send_to(&[1, 2, 3], server).await.unwrap();
    let mut buf = [0u8; 512];
    assert!(timeout(Duration::from_millis(200), client.recv_from(&mut buf))
      .await
      .is_err());

    let response = exchange(&client, server, &query("help.cli", Rtype::TXT)).await;
    assert_eq!(answers(&response)[0].1, "AVAILABLE COMMANDS:");
  }
}
