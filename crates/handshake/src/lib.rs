//! # Handshake
//!
//! Transports for the tracker ⇄ mapper duplex link.
//!
//! - [`pair`]: in-process link (two capacity-1 channels), for running both
//!   sides inside one runtime
//! - [`TcpHandshake`] / [`MapperListener`]: length-prefixed frames over TCP,
//!   for separate tracker and mapper processes
//!
//! Both ends preserve send order and never duplicate a message.

mod codec;
mod in_process;
mod tcp;

pub use codec::{decode, encode, read_frame, write_frame, MAX_FRAME_LEN};
pub use in_process::{pair, MapperLink, TrackerLink};
pub use tcp::{MapperListener, TcpHandshake, TcpMapperEndpoint};

pub use contracts::{
    Acknowledgement, HandshakeChannel, HandshakeMessage, MapperEndpoint, WireFormat,
};
