//! In-process duplex link built from two capacity-1 channels.

use contracts::{
    Acknowledgement, ContractError, HandshakeChannel, HandshakeMessage, MapperEndpoint,
};
use tokio::sync::mpsc;
use tracing::trace;

/// Create a connected tracker/mapper pair
pub fn pair() -> (TrackerLink, MapperLink) {
    let (request_tx, request_rx) = mpsc::channel(1);
    let (ack_tx, ack_rx) = mpsc::channel(1);
    (
        TrackerLink {
            requests: request_tx,
            acks: ack_rx,
        },
        MapperLink {
            requests: request_rx,
            acks: ack_tx,
        },
    )
}

/// Tracker end
#[derive(Debug)]
pub struct TrackerLink {
    requests: mpsc::Sender<HandshakeMessage>,
    acks: mpsc::Receiver<Acknowledgement>,
}

/// Mapper end
#[derive(Debug)]
pub struct MapperLink {
    requests: mpsc::Receiver<HandshakeMessage>,
    acks: mpsc::Sender<Acknowledgement>,
}

impl HandshakeChannel for TrackerLink {
    async fn send(&mut self, message: HandshakeMessage) -> Result<(), ContractError> {
        trace!(?message, "in-process send");
        self.requests
            .send(message)
            .await
            .map_err(|_| ContractError::channel_closed("mapper end dropped"))
    }

    async fn receive_ack(&mut self) -> Result<Acknowledgement, ContractError> {
        self.acks
            .recv()
            .await
            .ok_or_else(|| ContractError::channel_closed("mapper end dropped before acknowledging"))
    }
}

impl MapperEndpoint for MapperLink {
    async fn receive(&mut self) -> Result<Option<HandshakeMessage>, ContractError> {
        Ok(self.requests.recv().await)
    }

    async fn acknowledge(&mut self, ack: Acknowledgement) -> Result<(), ContractError> {
        self.acks
            .send(ack)
            .await
            .map_err(|_| ContractError::channel_closed("tracker end dropped"))
    }
}
