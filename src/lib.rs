#![doc(html_root_url = "https://docs.rs/h4frame/latest")]
//! Public API for the `h4frame` library.
//!
//! This crate frames and de-frames HCI packets carried over a byte-oriented
//! serial link using the H4 convention: a one-byte type tag, a type-specific
//! header carrying the payload length, then the payload. It provides the
//! incremental reassembly state machine, the single-slot write gate, and the
//! transport lifecycle that binds both to an asynchronous serial driver.

pub mod buffer;
pub mod byte_order;
pub mod config;
pub mod driver;
pub mod error;
pub mod handler;
pub mod metrics;
pub mod packet;
pub mod reassembler;
pub mod transport;
pub mod write_gate;

pub use buffer::{BufferError, BufferLimits, OutgoingPacket, PacketBuffer};
pub use config::{ConfigError, FlowControl, TransportConfig, UartTransportConfig, UsbTransportConfig};
pub use driver::{Completion, CompletionSender, DriverError, SerialDriver, StreamDriver, UartConfig};
pub use error::{Result, TransportError};
pub use handler::{DiscardHandler, FnHandler, PacketHandler, ReceivedPacket, handler_fn};
pub use packet::{HeaderLayout, PacketType, TRANSPORT_PACKET_SENT};
pub use reassembler::{BlockOutcome, FramingError, ReadState, Reassembler};
pub use transport::{H4Transport, HciTransport};
pub use write_gate::WriteGate;
