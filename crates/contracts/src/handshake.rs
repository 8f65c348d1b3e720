//! Handshake protocol between the tracker and the mapper process.
//!
//! Every non-terminal message is followed by exactly one acknowledgement.
//! The terminal `end = true` message is fire-and-forget.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ContractError, KeyframeEntry};

/// One message from the tracker to the mapper
///
/// Field names on the wire follow the mapper's expectations (`video_idx`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandshakeMessage {
    /// `true` for a confirmed keyframe, `false` for a gap-tracking request
    pub is_keyframe: bool,

    /// Video store index (absent only on the terminal message)
    #[serde(rename = "video_idx")]
    pub video_index: Option<u64>,

    /// Frame timestamp (absent only on the terminal message)
    pub timestamp: Option<f64>,

    /// Shutdown signal
    pub end: bool,
}

impl HandshakeMessage {
    /// Notification for a confirmed keyframe
    pub fn keyframe(entry: KeyframeEntry) -> Self {
        Self {
            is_keyframe: true,
            video_index: Some(entry.video_index),
            timestamp: Some(entry.timestamp),
            end: false,
        }
    }

    /// Retroactive mapping request for a buffered keyframe
    pub fn gap(entry: KeyframeEntry) -> Self {
        Self {
            is_keyframe: false,
            video_index: Some(entry.video_index),
            timestamp: Some(entry.timestamp),
            end: false,
        }
    }

    /// Terminal message, never acknowledged
    pub fn shutdown() -> Self {
        Self {
            is_keyframe: true,
            video_index: None,
            timestamp: None,
            end: true,
        }
    }

    /// Whether the sender waits for an acknowledgement after this message
    pub fn expects_ack(&self) -> bool {
        !self.end
    }

    pub fn kind(&self) -> HandshakeKind {
        if self.end {
            HandshakeKind::Shutdown
        } else if self.is_keyframe {
            HandshakeKind::Map
        } else {
            HandshakeKind::Gap
        }
    }

    /// Classify the message for the mapper side
    ///
    /// # Errors
    /// A non-terminal message without index or timestamp is malformed.
    pub fn request(&self) -> Result<MapperRequest, ContractError> {
        if self.end {
            return Ok(MapperRequest::Shutdown);
        }

        let (Some(video_index), Some(timestamp)) = (self.video_index, self.timestamp) else {
            return Err(ContractError::codec(format!(
                "non-terminal handshake without index/timestamp: {self:?}"
            )));
        };
        let entry = KeyframeEntry::new(video_index, timestamp);

        Ok(if self.is_keyframe {
            MapperRequest::Map(entry)
        } else {
            MapperRequest::GapTrack(entry)
        })
    }
}

/// Message category (used for logging/metrics labels)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeKind {
    Map,
    Gap,
    Shutdown,
}

impl HandshakeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            HandshakeKind::Map => "map",
            HandshakeKind::Gap => "gap",
            HandshakeKind::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for HandshakeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the mapper is asked to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapperRequest {
    /// Map a freshly confirmed keyframe
    Map(KeyframeEntry),
    /// Refine a keyframe that now has neighbours on both sides
    GapTrack(KeyframeEntry),
    /// Tracker finished the stream
    Shutdown,
}

/// Mapper reply; its content is opaque to the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Acknowledgement {
    /// Number of requests the mapper has completed so far
    pub sequence: u64,
}

/// Tracker end of the duplex link
#[trait_variant::make(HandshakeChannel: Send)]
pub trait LocalHandshakeChannel {
    /// Transmit one message without waiting for it to be processed
    async fn send(&mut self, message: HandshakeMessage) -> Result<(), ContractError>;

    /// Block until the mapper's reply arrives
    async fn receive_ack(&mut self) -> Result<Acknowledgement, ContractError>;
}

/// Mapper end of the duplex link
#[trait_variant::make(MapperEndpoint: Send)]
pub trait LocalMapperEndpoint {
    /// Next message, or `None` once the tracker hung up
    async fn receive(&mut self) -> Result<Option<HandshakeMessage>, ContractError>;

    /// Reply to the most recent non-terminal message
    async fn acknowledge(&mut self, ack: Acknowledgement) -> Result<(), ContractError>;
}
