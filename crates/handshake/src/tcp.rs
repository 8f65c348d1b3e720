//! TCP transport for separate tracker and mapper processes.

use std::net::SocketAddr;
use std::time::Duration;

use contracts::{
    Acknowledgement, ContractError, HandshakeChannel, HandshakeMessage, MapperEndpoint,
    WireFormat,
};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, info, instrument, warn};

use crate::codec::{decode, encode, io_error, read_frame, write_frame};

/// Tracker end of a TCP link
#[derive(Debug)]
pub struct TcpHandshake {
    stream: TcpStream,
    format: WireFormat,
    peer: SocketAddr,
}

impl TcpHandshake {
    /// Connect to a listening mapper
    #[instrument(name = "tcp_handshake_connect", skip(addr))]
    pub async fn connect(
        addr: impl ToSocketAddrs,
        format: WireFormat,
    ) -> Result<Self, ContractError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| io_error("connect to mapper", e))?;
        Self::from_stream(stream, format)
    }

    /// Connect, retrying while the mapper is not listening yet
    pub async fn connect_with_retry(
        addr: &str,
        format: WireFormat,
        attempts: u32,
        delay: Duration,
    ) -> Result<Self, ContractError> {
        let mut attempt = 1;
        loop {
            match Self::connect(addr, format).await {
                Ok(link) => return Ok(link),
                Err(e) if attempt < attempts => {
                    warn!(addr, attempt, error = %e, "Mapper not reachable, retrying");
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn from_stream(stream: TcpStream, format: WireFormat) -> Result<Self, ContractError> {
        stream
            .set_nodelay(true)
            .map_err(|e| io_error("set_nodelay", e))?;
        let peer = stream.peer_addr().map_err(|e| io_error("peer_addr", e))?;
        info!(%peer, ?format, "Connected to mapper");
        Ok(Self {
            stream,
            format,
            peer,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl HandshakeChannel for TcpHandshake {
    #[instrument(name = "tcp_send", skip(self), fields(peer = %self.peer))]
    async fn send(&mut self, message: HandshakeMessage) -> Result<(), ContractError> {
        let payload = encode(self.format, &message)?;
        write_frame(&mut self.stream, &payload).await?;
        debug!(bytes = payload.len(), "Handshake sent");
        Ok(())
    }

    #[instrument(name = "tcp_receive_ack", skip(self), fields(peer = %self.peer))]
    async fn receive_ack(&mut self) -> Result<Acknowledgement, ContractError> {
        let payload = read_frame(&mut self.stream)
            .await?
            .ok_or_else(|| ContractError::channel_closed("mapper closed the connection"))?;
        decode(self.format, &payload)
    }
}

/// Mapper-side listener
#[derive(Debug)]
pub struct MapperListener {
    listener: TcpListener,
    format: WireFormat,
}

impl MapperListener {
    /// Bind the listen address
    pub async fn bind(addr: impl ToSocketAddrs, format: WireFormat) -> Result<Self, ContractError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| io_error("bind mapper listener", e))?;
        Ok(Self { listener, format })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ContractError> {
        self.listener
            .local_addr()
            .map_err(|e| io_error("local_addr", e))
    }

    /// Wait for the tracker to connect
    #[instrument(name = "mapper_accept", skip(self))]
    pub async fn accept(&self) -> Result<TcpMapperEndpoint, ContractError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(|e| io_error("accept tracker", e))?;
        stream
            .set_nodelay(true)
            .map_err(|e| io_error("set_nodelay", e))?;
        info!(%peer, "Tracker connected");
        Ok(TcpMapperEndpoint {
            stream,
            format: self.format,
            peer,
        })
    }
}

/// Mapper end of a TCP link
#[derive(Debug)]
pub struct TcpMapperEndpoint {
    stream: TcpStream,
    format: WireFormat,
    peer: SocketAddr,
}

impl TcpMapperEndpoint {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl MapperEndpoint for TcpMapperEndpoint {
    #[instrument(name = "tcp_receive", skip(self), fields(peer = %self.peer))]
    async fn receive(&mut self) -> Result<Option<HandshakeMessage>, ContractError> {
        match read_frame(&mut self.stream).await? {
            Some(payload) => decode(self.format, &payload).map(Some),
            None => Ok(None),
        }
    }

    #[instrument(name = "tcp_acknowledge", skip(self), fields(peer = %self.peer))]
    async fn acknowledge(&mut self, ack: Acknowledgement) -> Result<(), ContractError> {
        let payload = encode(self.format, &ack)?;
        write_frame(&mut self.stream, &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::KeyframeEntry;

    async fn loopback(format: WireFormat) -> (TcpHandshake, TcpMapperEndpoint) {
        let listener = MapperListener::bind("127.0.0.1:0", format).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tracker, mapper) =
            tokio::join!(TcpHandshake::connect(addr, format), listener.accept());
        (tracker.unwrap(), mapper.unwrap())
    }

    async fn exchange(format: WireFormat) {
        let (mut tracker, mut mapper) = loopback(format).await;

        let msg = HandshakeMessage::gap(KeyframeEntry::new(11, 2.25));
        tracker.send(msg).await.unwrap();
        assert_eq!(mapper.receive().await.unwrap(), Some(msg));

        mapper
            .acknowledge(Acknowledgement { sequence: 9 })
            .await
            .unwrap();
        assert_eq!(tracker.receive_ack().await.unwrap().sequence, 9);

        tracker.send(HandshakeMessage::shutdown()).await.unwrap();
        let last = mapper.receive().await.unwrap().unwrap();
        assert!(last.end);
        assert_eq!(last.video_index, None);
    }

    #[tokio::test]
    async fn test_json_exchange() {
        exchange(WireFormat::Json).await;
    }

    #[tokio::test]
    async fn test_bincode_exchange() {
        exchange(WireFormat::Bincode).await;
    }

    #[tokio::test]
    async fn test_tracker_hangup_ends_mapper_stream() {
        let (tracker, mut mapper) = loopback(WireFormat::Json).await;
        drop(tracker);
        assert_eq!(mapper.receive().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_mapper_hangup_fails_ack_wait() {
        let (mut tracker, mapper) = loopback(WireFormat::Json).await;
        drop(mapper);

        let err = tracker.receive_ack().await.unwrap_err();
        assert!(err.is_disconnect(), "got: {err}");
    }

    #[tokio::test]
    async fn test_connect_without_listener_fails() {
        let listener = MapperListener::bind("127.0.0.1:0", WireFormat::Json).await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = TcpHandshake::connect_with_retry(
            &addr.to_string(),
            WireFormat::Json,
            2,
            Duration::from_millis(10),
        )
        .await;
        assert!(result.is_err());
    }
}
